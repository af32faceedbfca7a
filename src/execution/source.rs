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

//! In-memory sources and sinks: scripted row buffers for wiring operators
//! in tests and small pipelines, and a collecting sink with a drain knob.

use crate::errors::EngineError;
use crate::execution::{RowSink, RowSource, SinkStatus};
use crate::types::tuple::{SchemaRef, Tuple};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A source backed by a scripted sequence of rows and errors. Once the
/// consumer signals done, buffered data rows are discarded and only trailing
/// errors are still surfaced, mirroring the drain contract.
pub struct RowBufferSource {
    schema: SchemaRef,
    entries: VecDeque<Result<Tuple, EngineError>>,
    draining: bool,
}

impl RowBufferSource {
    pub fn new(schema: SchemaRef, entries: Vec<Result<Tuple, EngineError>>) -> Self {
        RowBufferSource {
            schema,
            entries: entries.into(),
            draining: false,
        }
    }

    pub fn from_tuples(schema: SchemaRef, tuples: Vec<Tuple>) -> Self {
        Self::new(schema, tuples.into_iter().map(Ok).collect())
    }

    pub fn rows_left(&self) -> usize {
        self.entries.len()
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Shareable handle; lets a test keep inspecting the source after the
    /// operator has consumed it.
    pub fn shared(self) -> Rc<RefCell<RowBufferSource>> {
        Rc::new(RefCell::new(self))
    }
}

impl RowSource for RowBufferSource {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_row(&mut self) -> Option<Result<Tuple, EngineError>> {
        while let Some(entry) = self.entries.pop_front() {
            if self.draining && entry.is_ok() {
                continue;
            }
            return Some(entry);
        }
        None
    }

    fn consumer_done(&mut self) {
        self.draining = true;
    }
}

impl RowSource for Rc<RefCell<RowBufferSource>> {
    fn schema(&self) -> SchemaRef {
        self.borrow().schema.clone()
    }

    fn next_row(&mut self) -> Option<Result<Tuple, EngineError>> {
        self.borrow_mut().next_row()
    }

    fn consumer_done(&mut self) {
        self.borrow_mut().consumer_done();
    }
}

/// A sink that collects everything pushed into it. `drain_after(n)` makes it
/// request drain once `n` rows have arrived, for exercising early consumer
/// termination.
#[derive(Default)]
pub struct RowCollector {
    pub rows: Vec<Tuple>,
    pub errors: Vec<EngineError>,
    closed: bool,
    drain_after: Option<usize>,
}

impl RowCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain_after(n: usize) -> Self {
        RowCollector {
            drain_after: Some(n),
            ..Default::default()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Result rows as display strings, sorted, for order-independent
    /// multiset comparison.
    pub fn sorted_rows(&self) -> Vec<String> {
        let mut rows: Vec<String> = self.rows.iter().map(|t| t.to_string()).collect();
        rows.sort();
        rows
    }
}

impl RowSink for RowCollector {
    fn push(&mut self, tuple: Tuple) -> SinkStatus {
        debug_assert!(!self.closed, "push after close");
        self.rows.push(tuple);
        match self.drain_after {
            Some(n) if self.rows.len() >= n => SinkStatus::DrainRequested,
            _ => SinkStatus::NeedMoreRows,
        }
    }

    fn push_error(&mut self, err: EngineError) {
        debug_assert!(!self.closed, "push_error after close");
        self.errors.push(err);
    }

    fn close(&mut self) {
        debug_assert!(!self.closed, "sink closed twice");
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnCatalog, ColumnRef};
    use crate::types::value::DataValue;
    use crate::types::LogicalType;
    use std::sync::Arc;

    fn int_schema() -> SchemaRef {
        Arc::new(vec![ColumnRef::from(ColumnCatalog::new(
            "c1".to_string(),
            true,
            LogicalType::Bigint,
        ))])
    }

    #[test]
    fn test_drain_discards_rows_keeps_errors() {
        let mut source = RowBufferSource::new(
            int_schema(),
            vec![
                Ok(Tuple::new(vec![DataValue::Int64(1)])),
                Err(EngineError::RowSource("late failure".to_string())),
                Ok(Tuple::new(vec![DataValue::Int64(2)])),
            ],
        );
        source.consumer_done();
        source.consumer_done();

        let entry = source.next_row().unwrap();
        assert!(entry.is_err());
        assert!(source.next_row().is_none());
        assert_eq!(source.rows_left(), 0);
    }

    #[test]
    fn test_collector_requests_drain() {
        let mut sink = RowCollector::drain_after(1);
        assert_eq!(
            sink.push(Tuple::new(vec![DataValue::Int64(1)])),
            SinkStatus::DrainRequested
        );
        sink.close();
        assert!(sink.is_closed());
    }
}
