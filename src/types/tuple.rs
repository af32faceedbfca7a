use crate::catalog::ColumnRef;
use crate::types::value::DataValue;
use itertools::Itertools;
use std::fmt;
use std::fmt::Formatter;
use std::mem;
use std::sync::Arc;

pub type Schema = Vec<ColumnRef>;
pub type SchemaRef = Arc<Schema>;

/// An ordered sequence of typed, possibly-NULL column values. Immutable once
/// produced by a source; operators build new tuples rather than mutate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tuple {
    pub values: Vec<DataValue>,
}

impl Tuple {
    pub fn new(values: Vec<DataValue>) -> Self {
        Tuple { values }
    }

    /// Approximate heap footprint, used for memory accounting.
    #[inline]
    pub fn data_size(&self) -> usize {
        mem::size_of::<Tuple>()
            + self
                .values
                .iter()
                .map(DataValue::data_size)
                .sum::<usize>()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[{}]", self.values.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let tuple = Tuple::new(vec![
            DataValue::Int64(1),
            DataValue::Null,
            DataValue::Utf8("x".to_string()),
        ]);
        assert_eq!(format!("{tuple}"), "[1, NULL, x]");
    }

    #[test]
    fn test_data_size_counts_string_payload() {
        let short = Tuple::new(vec![DataValue::Utf8("a".to_string())]);
        let long = Tuple::new(vec![DataValue::Utf8("a".repeat(64))]);
        assert!(long.data_size() > short.data_size());
    }
}
