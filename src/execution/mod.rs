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

//! The row-stream contracts operators are wired together with.
//!
//! A [`RowSource`] multiplexes data rows, errors and end-of-stream on one
//! pull interface; [`RowSource::consumer_done`] is the cooperative drain
//! signal. A [`RowSink`] accepts rows and error metadata and reports through
//! [`SinkStatus`] whether the producer should keep going.

pub mod join;
pub mod source;

use crate::errors::EngineError;
use crate::types::tuple::{SchemaRef, Tuple};

pub trait RowSource {
    fn schema(&self) -> SchemaRef;

    /// Pulls the next row. `Some(Err(_))` carries an upstream error as
    /// out-of-band metadata; `None` is end of stream. After
    /// [`consumer_done`](Self::consumer_done) a source stops producing data
    /// rows but may still surface trailing errors.
    fn next_row(&mut self) -> Option<Result<Tuple, EngineError>>;

    /// Tells the source its consumer needs no more rows. Idempotent, and
    /// safe to call on an already finished source.
    fn consumer_done(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    NeedMoreRows,
    /// The consumer is done; the producer must stop emitting data rows and
    /// move to its drain path.
    DrainRequested,
}

pub trait RowSink {
    fn push(&mut self, tuple: Tuple) -> SinkStatus;

    fn push_error(&mut self, err: EngineError);

    /// Closes the sink. Called exactly once, on every producer exit path.
    fn close(&mut self);
}
