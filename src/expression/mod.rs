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

//! Scalar expressions evaluated over a row. The join operator only invokes
//! these (ON filters arrive as already built trees); it never parses them.
//!
//! Comparison and boolean operators follow SQL three-valued logic: any
//! comparison touching NULL yields NULL, AND/OR are Kleene.

use crate::errors::EngineError;
use crate::types::value::DataValue;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpression {
    /// Positional reference into the row the expression is evaluated over.
    ColumnRef { index: usize },
    Constant(DataValue),
    Unary {
        op: UnaryOperator,
        expr: Box<ScalarExpression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<ScalarExpression>,
        right: Box<ScalarExpression>,
    },
    IsNull {
        negated: bool,
        expr: Box<ScalarExpression>,
    },
}

impl ScalarExpression {
    pub fn column(index: usize) -> ScalarExpression {
        ScalarExpression::ColumnRef { index }
    }

    pub fn binary(
        op: BinaryOperator,
        left: ScalarExpression,
        right: ScalarExpression,
    ) -> ScalarExpression {
        ScalarExpression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eval(&self, values: &[DataValue]) -> Result<DataValue, EngineError> {
        match self {
            ScalarExpression::ColumnRef { index } => values
                .get(*index)
                .cloned()
                .ok_or(EngineError::InvalidOutputColumn {
                    index: *index,
                    available: values.len(),
                }),
            ScalarExpression::Constant(value) => Ok(value.clone()),
            ScalarExpression::Unary { op, expr } => eval_unary(*op, &expr.eval(values)?),
            ScalarExpression::Binary { op, left, right } => {
                eval_binary(*op, &left.eval(values)?, &right.eval(values)?)
            }
            ScalarExpression::IsNull { negated, expr } => {
                Ok(DataValue::Boolean(expr.eval(values)?.is_null() ^ negated))
            }
        }
    }
}

fn eval_unary(op: UnaryOperator, value: &DataValue) -> Result<DataValue, EngineError> {
    match op {
        UnaryOperator::Not => match value {
            DataValue::Boolean(v) => Ok(DataValue::Boolean(!v)),
            DataValue::Null => Ok(DataValue::Null),
            _ => Err(EngineError::InvalidType),
        },
        UnaryOperator::Minus => match value {
            DataValue::Int8(v) => Ok(DataValue::Int8(v.checked_neg().ok_or(EngineError::OverFlow)?)),
            DataValue::Int16(v) => {
                Ok(DataValue::Int16(v.checked_neg().ok_or(EngineError::OverFlow)?))
            }
            DataValue::Int32(v) => {
                Ok(DataValue::Int32(v.checked_neg().ok_or(EngineError::OverFlow)?))
            }
            DataValue::Int64(v) => {
                Ok(DataValue::Int64(v.checked_neg().ok_or(EngineError::OverFlow)?))
            }
            DataValue::Float32(v) => Ok(DataValue::Float32(-*v)),
            DataValue::Float64(v) => Ok(DataValue::Float64(-*v)),
            DataValue::Decimal(v) => Ok(DataValue::Decimal(-v)),
            DataValue::Null => Ok(DataValue::Null),
            _ => Err(EngineError::InvalidType),
        },
    }
}

fn eval_binary(
    op: BinaryOperator,
    left: &DataValue,
    right: &DataValue,
) -> Result<DataValue, EngineError> {
    use BinaryOperator::*;
    match op {
        And => Ok(match (left, right) {
            (DataValue::Boolean(v1), DataValue::Boolean(v2)) => DataValue::Boolean(*v1 && *v2),
            (DataValue::Boolean(false), DataValue::Null)
            | (DataValue::Null, DataValue::Boolean(false)) => DataValue::Boolean(false),
            (DataValue::Null, DataValue::Null)
            | (DataValue::Boolean(true), DataValue::Null)
            | (DataValue::Null, DataValue::Boolean(true)) => DataValue::Null,
            _ => return Err(EngineError::InvalidType),
        }),
        Or => Ok(match (left, right) {
            (DataValue::Boolean(v1), DataValue::Boolean(v2)) => DataValue::Boolean(*v1 || *v2),
            (DataValue::Boolean(true), DataValue::Null)
            | (DataValue::Null, DataValue::Boolean(true)) => DataValue::Boolean(true),
            (DataValue::Null, DataValue::Null)
            | (DataValue::Boolean(false), DataValue::Null)
            | (DataValue::Null, DataValue::Boolean(false)) => DataValue::Null,
            _ => return Err(EngineError::InvalidType),
        }),
        Eq | NotEq | Gt | GtEq | Lt | LtEq => compare(op, left, right),
        Plus | Minus | Multiply => arithmetic(op, left, right),
    }
}

fn compare(
    op: BinaryOperator,
    left: &DataValue,
    right: &DataValue,
) -> Result<DataValue, EngineError> {
    if left.is_null() || right.is_null() {
        return Ok(DataValue::Null);
    }
    // Widening lets @1 = @3 hold across integer widths, matching the
    // equality-key canonicalization used for bucketing.
    let ordering = left
        .widened()
        .partial_cmp(&right.widened())
        .ok_or(EngineError::InvalidType)?;
    let result = match op {
        BinaryOperator::Eq => ordering == Ordering::Equal,
        BinaryOperator::NotEq => ordering != Ordering::Equal,
        BinaryOperator::Gt => ordering == Ordering::Greater,
        BinaryOperator::GtEq => ordering != Ordering::Less,
        BinaryOperator::Lt => ordering == Ordering::Less,
        BinaryOperator::LtEq => ordering != Ordering::Greater,
        _ => unreachable!(),
    };
    Ok(DataValue::Boolean(result))
}

macro_rules! checked_int {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let value = match $op {
            BinaryOperator::Plus => $a.checked_add(*$b),
            BinaryOperator::Minus => $a.checked_sub(*$b),
            BinaryOperator::Multiply => $a.checked_mul(*$b),
            _ => unreachable!(),
        };
        DataValue::$variant(value.ok_or(EngineError::OverFlow)?)
    }};
}

fn arithmetic(
    op: BinaryOperator,
    left: &DataValue,
    right: &DataValue,
) -> Result<DataValue, EngineError> {
    use DataValue::*;
    Ok(match (left, right) {
        (Null, _) | (_, Null) => Null,
        (Int8(a), Int8(b)) => checked_int!(op, a, b, Int8),
        (Int16(a), Int16(b)) => checked_int!(op, a, b, Int16),
        (Int32(a), Int32(b)) => checked_int!(op, a, b, Int32),
        (Int64(a), Int64(b)) => checked_int!(op, a, b, Int64),
        (Float32(a), Float32(b)) => Float32(OrderedFloat(match op {
            BinaryOperator::Plus => a.0 + b.0,
            BinaryOperator::Minus => a.0 - b.0,
            BinaryOperator::Multiply => a.0 * b.0,
            _ => unreachable!(),
        })),
        (Float64(a), Float64(b)) => Float64(OrderedFloat(match op {
            BinaryOperator::Plus => a.0 + b.0,
            BinaryOperator::Minus => a.0 - b.0,
            BinaryOperator::Multiply => a.0 * b.0,
            _ => unreachable!(),
        })),
        (Decimal(a), Decimal(b)) => {
            let value = match op {
                BinaryOperator::Plus => a.checked_add(*b),
                BinaryOperator::Minus => a.checked_sub(*b),
                BinaryOperator::Multiply => a.checked_mul(*b),
                _ => unreachable!(),
            };
            Decimal(value.ok_or(EngineError::OverFlow)?)
        }
        _ => return Err(EngineError::InvalidType),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(index: usize) -> ScalarExpression {
        ScalarExpression::column(index)
    }

    #[test]
    fn test_comparison_with_null_is_null() {
        let expr = ScalarExpression::binary(BinaryOperator::Eq, col(0), col(1));
        let result = expr
            .eval(&[DataValue::Null, DataValue::Int64(1)])
            .unwrap();
        assert_eq!(result, DataValue::Null);
    }

    #[test]
    fn test_comparison_widens_integers() {
        let expr = ScalarExpression::binary(BinaryOperator::Eq, col(0), col(1));
        let result = expr
            .eval(&[DataValue::Int32(7), DataValue::Int64(7)])
            .unwrap();
        assert_eq!(result, DataValue::Boolean(true));
    }

    #[test]
    fn test_kleene_and_or() {
        let and = ScalarExpression::binary(BinaryOperator::And, col(0), col(1));
        let or = ScalarExpression::binary(BinaryOperator::Or, col(0), col(1));

        assert_eq!(
            and.eval(&[DataValue::Boolean(false), DataValue::Null])
                .unwrap(),
            DataValue::Boolean(false)
        );
        assert_eq!(
            and.eval(&[DataValue::Boolean(true), DataValue::Null])
                .unwrap(),
            DataValue::Null
        );
        assert_eq!(
            or.eval(&[DataValue::Boolean(true), DataValue::Null])
                .unwrap(),
            DataValue::Boolean(true)
        );
        assert_eq!(
            or.eval(&[DataValue::Boolean(false), DataValue::Null])
                .unwrap(),
            DataValue::Null
        );
    }

    #[test]
    fn test_arithmetic_overflow() {
        let expr = ScalarExpression::binary(
            BinaryOperator::Plus,
            ScalarExpression::Constant(DataValue::Int64(i64::MAX)),
            ScalarExpression::Constant(DataValue::Int64(1)),
        );
        assert!(matches!(expr.eval(&[]), Err(EngineError::OverFlow)));
    }

    #[test]
    fn test_is_null() {
        let expr = ScalarExpression::IsNull {
            negated: false,
            expr: Box::new(col(0)),
        };
        assert_eq!(
            expr.eval(&[DataValue::Null]).unwrap(),
            DataValue::Boolean(true)
        );
        assert_eq!(
            expr.eval(&[DataValue::Int64(0)]).unwrap(),
            DataValue::Boolean(false)
        );
    }
}
