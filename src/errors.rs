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

use std::io;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("invalid output column {index} (only {available} available)")]
    InvalidOutputColumn { index: usize, available: usize },
    #[error("invalid equality column {index} (only {available} available)")]
    InvalidEqualityColumn { index: usize, available: usize },
    #[error("mismatched equality column counts ({left} left, {right} right)")]
    MismatchedEqualityColumns { left: usize, right: usize },
    #[error("{monitor} budget of {budget} bytes exhausted")]
    BudgetExhausted { monitor: &'static str, budget: u64 },
    #[error("invalid type in expression")]
    InvalidType,
    #[error("numeric overflow")]
    OverFlow,
    #[error("corrupted spill record")]
    CorruptedSpillRecord,
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    RowSource(String),
}
