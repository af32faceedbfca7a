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

//! Per-join-type emission policies.
//!
//! The probe loop is the same for every join type; what differs is which
//! rows each join type emits and when. A policy reacts to three events:
//! a filtered match, the end of a probe (with or without matches), and a
//! sweep visit over the stored side. The policy never knows which physical
//! side was stored; `stored_is_left` orients it, and all output rows are
//! assembled in logical order (left columns then right columns).
//!
//! A streamed row whose equality key contains NULL, or whose bucket is
//! missing, goes straight to `on_probe_end` with `matched = false`.

use crate::errors::EngineError;
use crate::execution::join::JoinType;
use crate::expression::ScalarExpression;
use crate::types::tuple::Tuple;
use crate::types::value::DataValue;

pub(crate) mod full_join;
pub(crate) mod inner_join;
pub(crate) mod left_anti_join;
pub(crate) mod left_join;
pub(crate) mod left_semi_join;
pub(crate) mod right_join;

use full_join::FullJoinEmission;
use inner_join::InnerJoinEmission;
use left_anti_join::LeftAntiJoinEmission;
use left_join::LeftJoinEmission;
use left_semi_join::LeftSemiJoinEmission;
use right_join::RightJoinEmission;

/// Whether the probe should keep scanning the current bucket.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ScanControl {
    Continue,
    Stop,
}

pub(crate) trait JoinEmission {
    /// A stored row matched the streamed row and passed the ON filter.
    /// Match bookkeeping for the sweep is the caller's job; the policy
    /// only decides what to emit and whether the bucket scan may stop.
    fn on_match(&self, streamed: &Tuple, stored: &Tuple, out: &mut Vec<Tuple>) -> ScanControl;

    /// The probe of one streamed row finished. `matched` is false for
    /// unmatchable rows and empty or fully filtered buckets.
    fn on_probe_end(&self, streamed: &Tuple, matched: bool, out: &mut Vec<Tuple>);

    /// Whether unmatched-row accounting on the stored side requires a
    /// final pass over the container.
    fn needs_sweep(&self) -> bool {
        false
    }

    /// One stored row during the sweep.
    fn on_sweep(&self, stored: &Tuple, was_matched: bool, out: &mut Vec<Tuple>);
}

pub(crate) enum JoinEmissionImpl {
    Inner(InnerJoinEmission),
    LeftOuter(LeftJoinEmission),
    RightOuter(RightJoinEmission),
    Full(FullJoinEmission),
    LeftSemi(LeftSemiJoinEmission),
    LeftAnti(LeftAntiJoinEmission),
}

impl JoinEmissionImpl {
    pub(crate) fn new(
        join_type: JoinType,
        stored_is_left: bool,
        left_width: usize,
        right_width: usize,
    ) -> Self {
        match join_type {
            JoinType::Inner => JoinEmissionImpl::Inner(InnerJoinEmission { stored_is_left }),
            JoinType::LeftOuter => JoinEmissionImpl::LeftOuter(LeftJoinEmission {
                stored_is_left,
                right_width,
            }),
            JoinType::RightOuter => JoinEmissionImpl::RightOuter(RightJoinEmission {
                stored_is_left,
                left_width,
            }),
            JoinType::Full => JoinEmissionImpl::Full(FullJoinEmission {
                stored_is_left,
                left_width,
                right_width,
            }),
            JoinType::LeftSemi => {
                JoinEmissionImpl::LeftSemi(LeftSemiJoinEmission { stored_is_left })
            }
            JoinType::LeftAnti => {
                JoinEmissionImpl::LeftAnti(LeftAntiJoinEmission { stored_is_left })
            }
        }
    }
}

impl JoinEmission for JoinEmissionImpl {
    fn on_match(&self, streamed: &Tuple, stored: &Tuple, out: &mut Vec<Tuple>) -> ScanControl {
        match self {
            JoinEmissionImpl::Inner(e) => e.on_match(streamed, stored, out),
            JoinEmissionImpl::LeftOuter(e) => e.on_match(streamed, stored, out),
            JoinEmissionImpl::RightOuter(e) => e.on_match(streamed, stored, out),
            JoinEmissionImpl::Full(e) => e.on_match(streamed, stored, out),
            JoinEmissionImpl::LeftSemi(e) => e.on_match(streamed, stored, out),
            JoinEmissionImpl::LeftAnti(e) => e.on_match(streamed, stored, out),
        }
    }

    fn on_probe_end(&self, streamed: &Tuple, matched: bool, out: &mut Vec<Tuple>) {
        match self {
            JoinEmissionImpl::Inner(e) => e.on_probe_end(streamed, matched, out),
            JoinEmissionImpl::LeftOuter(e) => e.on_probe_end(streamed, matched, out),
            JoinEmissionImpl::RightOuter(e) => e.on_probe_end(streamed, matched, out),
            JoinEmissionImpl::Full(e) => e.on_probe_end(streamed, matched, out),
            JoinEmissionImpl::LeftSemi(e) => e.on_probe_end(streamed, matched, out),
            JoinEmissionImpl::LeftAnti(e) => e.on_probe_end(streamed, matched, out),
        }
    }

    fn needs_sweep(&self) -> bool {
        match self {
            JoinEmissionImpl::Inner(e) => e.needs_sweep(),
            JoinEmissionImpl::LeftOuter(e) => e.needs_sweep(),
            JoinEmissionImpl::RightOuter(e) => e.needs_sweep(),
            JoinEmissionImpl::Full(e) => e.needs_sweep(),
            JoinEmissionImpl::LeftSemi(e) => e.needs_sweep(),
            JoinEmissionImpl::LeftAnti(e) => e.needs_sweep(),
        }
    }

    fn on_sweep(&self, stored: &Tuple, was_matched: bool, out: &mut Vec<Tuple>) {
        match self {
            JoinEmissionImpl::Inner(e) => e.on_sweep(stored, was_matched, out),
            JoinEmissionImpl::LeftOuter(e) => e.on_sweep(stored, was_matched, out),
            JoinEmissionImpl::RightOuter(e) => e.on_sweep(stored, was_matched, out),
            JoinEmissionImpl::Full(e) => e.on_sweep(stored, was_matched, out),
            JoinEmissionImpl::LeftSemi(e) => e.on_sweep(stored, was_matched, out),
            JoinEmissionImpl::LeftAnti(e) => e.on_sweep(stored, was_matched, out),
        }
    }
}

/// Joins the streamed and stored rows in logical column order.
pub(crate) fn concat_rows(stored_is_left: bool, streamed: &Tuple, stored: &Tuple) -> Tuple {
    let (left, right) = orient(stored_is_left, streamed, stored);
    let mut values = Vec::with_capacity(left.values.len() + right.values.len());
    values.extend_from_slice(&left.values);
    values.extend_from_slice(&right.values);
    Tuple::new(values)
}

/// `row` followed by `nulls` NULL columns.
pub(crate) fn pad_after(row: &Tuple, nulls: usize) -> Tuple {
    let mut values = Vec::with_capacity(row.values.len() + nulls);
    values.extend_from_slice(&row.values);
    values.resize(values.len() + nulls, DataValue::Null);
    Tuple::new(values)
}

/// `nulls` NULL columns followed by `row`.
pub(crate) fn pad_before(nulls: usize, row: &Tuple) -> Tuple {
    let mut values = vec![DataValue::Null; nulls];
    values.reserve(row.values.len());
    values.extend_from_slice(&row.values);
    Tuple::new(values)
}

/// Evaluates the ON filter over the candidate pair in logical order.
/// NULL and false both reject, per SQL three-valued logic.
pub(crate) fn passes_filter(
    on: Option<&ScalarExpression>,
    stored_is_left: bool,
    streamed: &Tuple,
    stored: &Tuple,
    scratch: &mut Vec<DataValue>,
) -> Result<bool, EngineError> {
    let Some(expr) = on else {
        return Ok(true);
    };
    let (left, right) = orient(stored_is_left, streamed, stored);
    scratch.clear();
    scratch.extend_from_slice(&left.values);
    scratch.extend_from_slice(&right.values);
    Ok(matches!(expr.eval(scratch)?, DataValue::Boolean(true)))
}

fn orient<'a>(stored_is_left: bool, streamed: &'a Tuple, stored: &'a Tuple) -> (&'a Tuple, &'a Tuple) {
    if stored_is_left {
        (stored, streamed)
    } else {
        (streamed, stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{BinaryOperator, ScalarExpression};

    fn row(values: &[i64]) -> Tuple {
        Tuple::new(values.iter().map(|v| DataValue::Int64(*v)).collect())
    }

    #[test]
    fn test_concat_follows_logical_order() {
        let streamed = row(&[1, 2]);
        let stored = row(&[3]);
        assert_eq!(
            concat_rows(false, &streamed, &stored).values,
            row(&[1, 2, 3]).values
        );
        assert_eq!(
            concat_rows(true, &streamed, &stored).values,
            row(&[3, 1, 2]).values
        );
    }

    #[test]
    fn test_padding() {
        let r = row(&[7]);
        assert_eq!(
            pad_after(&r, 2).values,
            vec![DataValue::Int64(7), DataValue::Null, DataValue::Null]
        );
        assert_eq!(
            pad_before(1, &r).values,
            vec![DataValue::Null, DataValue::Int64(7)]
        );
    }

    #[test]
    fn test_filter_rejects_null_result() {
        // left.0 > right.0, with right.0 = NULL
        let expr = ScalarExpression::binary(
            BinaryOperator::Gt,
            ScalarExpression::column(0),
            ScalarExpression::column(1),
        );
        let streamed = Tuple::new(vec![DataValue::Int64(5)]);
        let stored = Tuple::new(vec![DataValue::Null]);
        let mut scratch = Vec::new();
        assert!(!passes_filter(Some(&expr), false, &streamed, &stored, &mut scratch).unwrap());
    }

    #[test]
    fn test_absent_filter_accepts() {
        let streamed = row(&[1]);
        let stored = row(&[2]);
        let mut scratch = Vec::new();
        assert!(passes_filter(None, false, &streamed, &stored, &mut scratch).unwrap());
    }

    #[test]
    fn test_filter_sees_stored_side_in_logical_position() {
        // left.0 < right.0
        let expr: ScalarExpression = ScalarExpression::binary(
            BinaryOperator::Lt,
            ScalarExpression::column(0),
            ScalarExpression::column(1),
        );
        let streamed = row(&[9]);
        let stored = row(&[1]);
        let mut scratch = Vec::new();
        // stored is left: pair is (1, 9), so 1 < 9 holds
        assert!(passes_filter(Some(&expr), true, &streamed, &stored, &mut scratch).unwrap());
        // streamed is left: pair is (9, 1)
        assert!(!passes_filter(Some(&expr), false, &streamed, &stored, &mut scratch).unwrap());
    }
}
