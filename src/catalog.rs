// Copyright 2025 rillsql
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::types::LogicalType;
use std::ops::Deref;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnCatalog {
    pub name: String,
    pub nullable: bool,
    pub ty: LogicalType,
}

impl ColumnCatalog {
    pub fn new(name: String, nullable: bool, ty: LogicalType) -> Self {
        ColumnCatalog { name, nullable, ty }
    }
}

/// Shared column descriptor handle; schemas clone these cheaply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef(Arc<ColumnCatalog>);

impl ColumnRef {
    /// The padded side of an outer join produces NULLs for columns declared
    /// non-nullable; returns a relaxed copy when that applies.
    pub fn nullable_for_join(&self, force_nullable: bool) -> Option<ColumnRef> {
        if force_nullable && !self.nullable {
            let mut column = (*self.0).clone();
            column.nullable = true;
            return Some(ColumnRef::from(column));
        }
        None
    }
}

impl From<ColumnCatalog> for ColumnRef {
    fn from(column: ColumnCatalog) -> Self {
        ColumnRef(Arc::new(column))
    }
}

impl Deref for ColumnRef {
    type Target = ColumnCatalog;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_for_join() {
        let strict = ColumnRef::from(ColumnCatalog::new(
            "c1".to_string(),
            false,
            LogicalType::Integer,
        ));
        let relaxed = strict.nullable_for_join(true).unwrap();
        assert!(relaxed.nullable);
        assert_eq!(relaxed.name, "c1");
        assert!(relaxed.nullable_for_join(true).is_none());
        assert!(strict.nullable_for_join(false).is_none());
    }
}
