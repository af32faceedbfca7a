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

use super::{concat_rows, pad_after, JoinEmission, ScanControl};
use crate::types::tuple::Tuple;

/// LEFT OUTER: every left row appears at least once. Which hook pads
/// the unmatched left row depends on where the left side physically
/// lives. Streamed left rows pad inline at probe end; stored left rows
/// pad in the sweep. Unmatched right rows are dropped either way.
pub(crate) struct LeftJoinEmission {
    pub(crate) stored_is_left: bool,
    pub(crate) right_width: usize,
}

impl JoinEmission for LeftJoinEmission {
    fn on_match(&self, streamed: &Tuple, stored: &Tuple, out: &mut Vec<Tuple>) -> ScanControl {
        out.push(concat_rows(self.stored_is_left, streamed, stored));
        ScanControl::Continue
    }

    fn on_probe_end(&self, streamed: &Tuple, matched: bool, out: &mut Vec<Tuple>) {
        if !matched && !self.stored_is_left {
            out.push(pad_after(streamed, self.right_width));
        }
    }

    fn needs_sweep(&self) -> bool {
        self.stored_is_left
    }

    fn on_sweep(&self, stored: &Tuple, was_matched: bool, out: &mut Vec<Tuple>) {
        if !was_matched {
            out.push(pad_after(stored, self.right_width));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::DataValue;

    #[test]
    fn test_unmatched_streamed_left_pads_inline() {
        let emission = LeftJoinEmission {
            stored_is_left: false,
            right_width: 2,
        };
        let streamed = Tuple::new(vec![DataValue::Int64(1)]);
        let mut out = Vec::new();

        emission.on_probe_end(&streamed, false, &mut out);
        assert_eq!(
            out[0].values,
            vec![DataValue::Int64(1), DataValue::Null, DataValue::Null]
        );
        assert!(!emission.needs_sweep());
    }

    #[test]
    fn test_stored_left_pads_in_sweep() {
        let emission = LeftJoinEmission {
            stored_is_left: true,
            right_width: 1,
        };
        let stored = Tuple::new(vec![DataValue::Int64(3)]);
        let mut out = Vec::new();

        // probe end never pads when the left side is stored
        emission.on_probe_end(&Tuple::new(vec![DataValue::Int64(9)]), false, &mut out);
        assert!(out.is_empty());

        assert!(emission.needs_sweep());
        emission.on_sweep(&stored, true, &mut out);
        assert!(out.is_empty());
        emission.on_sweep(&stored, false, &mut out);
        assert_eq!(out[0].values, vec![DataValue::Int64(3), DataValue::Null]);
    }
}
