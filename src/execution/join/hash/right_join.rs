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

use super::{concat_rows, pad_before, JoinEmission, ScanControl};
use crate::types::tuple::Tuple;

/// RIGHT OUTER, the mirror of LEFT OUTER: every right row appears at
/// least once, left columns go NULL for the unmatched ones.
pub(crate) struct RightJoinEmission {
    pub(crate) stored_is_left: bool,
    pub(crate) left_width: usize,
}

impl JoinEmission for RightJoinEmission {
    fn on_match(&self, streamed: &Tuple, stored: &Tuple, out: &mut Vec<Tuple>) -> ScanControl {
        out.push(concat_rows(self.stored_is_left, streamed, stored));
        ScanControl::Continue
    }

    fn on_probe_end(&self, streamed: &Tuple, matched: bool, out: &mut Vec<Tuple>) {
        if !matched && self.stored_is_left {
            out.push(pad_before(self.left_width, streamed));
        }
    }

    fn needs_sweep(&self) -> bool {
        !self.stored_is_left
    }

    fn on_sweep(&self, stored: &Tuple, was_matched: bool, out: &mut Vec<Tuple>) {
        if !was_matched {
            out.push(pad_before(self.left_width, stored));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::DataValue;

    #[test]
    fn test_unmatched_streamed_right_pads_inline() {
        let emission = RightJoinEmission {
            stored_is_left: true,
            left_width: 1,
        };
        let streamed = Tuple::new(vec![DataValue::Int64(4)]);
        let mut out = Vec::new();

        emission.on_probe_end(&streamed, false, &mut out);
        assert_eq!(out[0].values, vec![DataValue::Null, DataValue::Int64(4)]);
        assert!(!emission.needs_sweep());
    }

    #[test]
    fn test_stored_right_pads_in_sweep() {
        let emission = RightJoinEmission {
            stored_is_left: false,
            left_width: 2,
        };
        let stored = Tuple::new(vec![DataValue::Utf8("r".to_string())]);
        let mut out = Vec::new();

        assert!(emission.needs_sweep());
        emission.on_sweep(&stored, false, &mut out);
        assert_eq!(
            out[0].values,
            vec![
                DataValue::Null,
                DataValue::Null,
                DataValue::Utf8("r".to_string())
            ]
        );
    }
}
