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

use super::{JoinEmission, ScanControl};
use crate::types::tuple::Tuple;

/// LEFT ANTI: each left row with no match appears once, left columns
/// only. A left row with a NULL equality key can never match, so it is
/// always emitted. When the left side is streamed the first match is
/// enough to disqualify the row and the bucket scan stops.
pub(crate) struct LeftAntiJoinEmission {
    pub(crate) stored_is_left: bool,
}

impl JoinEmission for LeftAntiJoinEmission {
    fn on_match(&self, _streamed: &Tuple, _stored: &Tuple, _out: &mut Vec<Tuple>) -> ScanControl {
        if self.stored_is_left {
            ScanControl::Continue
        } else {
            ScanControl::Stop
        }
    }

    fn on_probe_end(&self, streamed: &Tuple, matched: bool, out: &mut Vec<Tuple>) {
        if !matched && !self.stored_is_left {
            out.push(streamed.clone());
        }
    }

    fn needs_sweep(&self) -> bool {
        self.stored_is_left
    }

    fn on_sweep(&self, stored: &Tuple, was_matched: bool, out: &mut Vec<Tuple>) {
        if !was_matched {
            out.push(stored.clone());
        }
    }
}
