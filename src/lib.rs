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

//! Streaming hash-join execution core for a row-at-a-time SQL pipeline.
//!
//! The entry point is [`execution::join::hash_join::HashJoiner`]: it pulls
//! rows from two [`execution::RowSource`]s, stores the smaller side in a
//! memory-or-disk row container keyed by the equality columns, probes the
//! other side against it, and pushes projected result rows into a
//! [`execution::RowSink`]. Early consumer termination and upstream errors
//! are handled through a cooperative drain protocol.

pub mod catalog;
pub mod errors;
pub mod execution;
pub mod expression;
pub mod runtime;
pub mod types;
