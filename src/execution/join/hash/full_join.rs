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

use super::{concat_rows, pad_after, pad_before, JoinEmission, ScanControl};
use crate::types::tuple::Tuple;

/// FULL OUTER: unmatched rows from both sides are padded. Streamed rows
/// pad inline, stored rows pad in the sweep, so the sweep always runs.
pub(crate) struct FullJoinEmission {
    pub(crate) stored_is_left: bool,
    pub(crate) left_width: usize,
    pub(crate) right_width: usize,
}

impl FullJoinEmission {
    fn pad_streamed(&self, streamed: &Tuple) -> Tuple {
        if self.stored_is_left {
            pad_before(self.left_width, streamed)
        } else {
            pad_after(streamed, self.right_width)
        }
    }

    fn pad_stored(&self, stored: &Tuple) -> Tuple {
        if self.stored_is_left {
            pad_after(stored, self.right_width)
        } else {
            pad_before(self.left_width, stored)
        }
    }
}

impl JoinEmission for FullJoinEmission {
    fn on_match(&self, streamed: &Tuple, stored: &Tuple, out: &mut Vec<Tuple>) -> ScanControl {
        out.push(concat_rows(self.stored_is_left, streamed, stored));
        ScanControl::Continue
    }

    fn on_probe_end(&self, streamed: &Tuple, matched: bool, out: &mut Vec<Tuple>) {
        if !matched {
            out.push(self.pad_streamed(streamed));
        }
    }

    fn needs_sweep(&self) -> bool {
        true
    }

    fn on_sweep(&self, stored: &Tuple, was_matched: bool, out: &mut Vec<Tuple>) {
        if !was_matched {
            out.push(self.pad_stored(stored));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::DataValue;

    #[test]
    fn test_pads_both_sides() {
        let emission = FullJoinEmission {
            stored_is_left: false,
            left_width: 1,
            right_width: 1,
        };
        let streamed = Tuple::new(vec![DataValue::Int64(1)]);
        let stored = Tuple::new(vec![DataValue::Int64(2)]);
        let mut out = Vec::new();

        emission.on_probe_end(&streamed, false, &mut out);
        emission.on_sweep(&stored, false, &mut out);

        assert_eq!(out[0].values, vec![DataValue::Int64(1), DataValue::Null]);
        assert_eq!(out[1].values, vec![DataValue::Null, DataValue::Int64(2)]);
    }

    #[test]
    fn test_orientation_flips_padding() {
        let emission = FullJoinEmission {
            stored_is_left: true,
            left_width: 1,
            right_width: 1,
        };
        let streamed = Tuple::new(vec![DataValue::Int64(1)]);
        let stored = Tuple::new(vec![DataValue::Int64(2)]);
        let mut out = Vec::new();

        emission.on_probe_end(&streamed, false, &mut out);
        emission.on_sweep(&stored, false, &mut out);

        // streamed is the right side here
        assert_eq!(out[0].values, vec![DataValue::Null, DataValue::Int64(1)]);
        assert_eq!(out[1].values, vec![DataValue::Int64(2), DataValue::Null]);
    }
}
