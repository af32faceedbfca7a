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
use chrono::{Datelike, NaiveDate};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::fmt::Formatter;
use std::mem;

pub const DATE_FMT: &str = "%Y-%m-%d";

/// Days from 0001-01-01 (CE) to the UNIX epoch, used to convert between
/// `chrono`'s day numbering and the `Date32` representation.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// A typed, possibly-NULL column value.
///
/// `PartialEq`/`Hash` are structural (NULL equals NULL) so values can live in
/// collections; SQL three-valued comparison semantics live in the expression
/// evaluator and the equality-key encoder, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataValue {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    Utf8(String),
    /// Date stored as a signed 32bit int days since UNIX epoch 1970-01-01
    Date32(i32),
    Decimal(Decimal),
}

impl DataValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    #[inline]
    pub fn logical_type(&self) -> LogicalType {
        match self {
            DataValue::Null => LogicalType::SqlNull,
            DataValue::Boolean(_) => LogicalType::Boolean,
            DataValue::Int8(_) => LogicalType::Tinyint,
            DataValue::Int16(_) => LogicalType::Smallint,
            DataValue::Int32(_) => LogicalType::Integer,
            DataValue::Int64(_) => LogicalType::Bigint,
            DataValue::Float32(_) => LogicalType::Float,
            DataValue::Float64(_) => LogicalType::Double,
            DataValue::Utf8(_) => LogicalType::Varchar,
            DataValue::Date32(_) => LogicalType::Date,
            DataValue::Decimal(_) => LogicalType::Decimal,
        }
    }

    /// Widens the value to the canonical representative of its type family:
    /// all signed integers become `Int64`, both float widths become
    /// `Float64`, decimals are normalized. Logically equal values with
    /// different physical encodings widen to the same value, which is what
    /// equality-key encoding and cross-width comparison rely on.
    #[inline]
    pub fn widened(&self) -> DataValue {
        match self {
            DataValue::Int8(v) => DataValue::Int64(*v as i64),
            DataValue::Int16(v) => DataValue::Int64(*v as i64),
            DataValue::Int32(v) => DataValue::Int64(*v as i64),
            DataValue::Float32(v) => DataValue::Float64(OrderedFloat(v.0 as f64)),
            DataValue::Decimal(v) => DataValue::Decimal(v.normalize()),
            other => other.clone(),
        }
    }

    /// Approximate heap footprint of the value, used for memory accounting
    /// and build-side sizing. Deliberately cheap, not exact.
    #[inline]
    pub fn data_size(&self) -> usize {
        let inline = mem::size_of::<DataValue>();
        match self {
            DataValue::Utf8(value) => inline + value.len(),
            _ => inline,
        }
    }

    /// Builds a `Date32` from a calendar date, `None` when out of range.
    pub fn date(year: i32, month: u32, day: u32) -> Option<DataValue> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(|date| DataValue::Date32(date.num_days_from_ce() - UNIX_EPOCH_FROM_CE))
    }
}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use DataValue::*;
        match (self, other) {
            (Boolean(v1), Boolean(v2)) => v1.partial_cmp(v2),
            (Boolean(_), _) => None,
            (Int8(v1), Int8(v2)) => v1.partial_cmp(v2),
            (Int8(_), _) => None,
            (Int16(v1), Int16(v2)) => v1.partial_cmp(v2),
            (Int16(_), _) => None,
            (Int32(v1), Int32(v2)) => v1.partial_cmp(v2),
            (Int32(_), _) => None,
            (Int64(v1), Int64(v2)) => v1.partial_cmp(v2),
            (Int64(_), _) => None,
            (Float32(v1), Float32(v2)) => v1.partial_cmp(v2),
            (Float32(_), _) => None,
            (Float64(v1), Float64(v2)) => v1.partial_cmp(v2),
            (Float64(_), _) => None,
            (Utf8(v1), Utf8(v2)) => v1.partial_cmp(v2),
            (Utf8(_), _) => None,
            (Date32(v1), Date32(v2)) => v1.partial_cmp(v2),
            (Date32(_), _) => None,
            (Decimal(v1), Decimal(v2)) => v1.partial_cmp(v2),
            (Decimal(_), _) => None,
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) => None,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Boolean(v) => write!(f, "{v}"),
            DataValue::Int8(v) => write!(f, "{v}"),
            DataValue::Int16(v) => write!(f, "{v}"),
            DataValue::Int32(v) => write!(f, "{v}"),
            DataValue::Int64(v) => write!(f, "{v}"),
            DataValue::Float32(v) => write!(f, "{v}"),
            DataValue::Float64(v) => write!(f, "{v}"),
            DataValue::Utf8(v) => write!(f, "{v}"),
            DataValue::Date32(days) => {
                match NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_FROM_CE) {
                    Some(date) => write!(f, "{}", date.format(DATE_FMT)),
                    None => write!(f, "Date32({days})"),
                }
            }
            DataValue::Decimal(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widened_unifies_type_families() {
        assert_eq!(DataValue::Int32(7).widened(), DataValue::Int64(7).widened());
        assert_eq!(DataValue::Int8(-3).widened(), DataValue::Int64(-3));
        assert_eq!(
            DataValue::Float32(OrderedFloat(1.5)).widened(),
            DataValue::Float64(OrderedFloat(1.5)),
        );
        assert_eq!(
            DataValue::Decimal(Decimal::new(1500, 3)).widened(),
            DataValue::Decimal(Decimal::new(15, 1)).widened(),
        );
    }

    #[test]
    fn test_partial_cmp_is_type_strict() {
        assert_eq!(
            DataValue::Int32(1).partial_cmp(&DataValue::Int32(2)),
            Some(Ordering::Less)
        );
        assert_eq!(DataValue::Int32(1).partial_cmp(&DataValue::Int64(1)), None);
        assert_eq!(DataValue::Null.partial_cmp(&DataValue::Int32(1)), None);
    }

    #[test]
    fn test_date_display() {
        let value = DataValue::date(2024, 3, 9).unwrap();
        assert_eq!(format!("{value}"), "2024-03-09");
        assert_eq!(DataValue::date(1970, 1, 1), Some(DataValue::Date32(0)));
    }
}
