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

//! Streaming hash-join operator.
//!
//! Execution runs through a fixed sequence of phases: size both inputs
//! against a byte threshold to pick the smaller one as the stored side,
//! drain that side into a [`SpillableRowContainer`], stream the other side
//! against it, then sweep unmatched stored rows for the join types that
//! need them. Any upstream or resource error, and any drain request from
//! the sink, short-circuits into draining both inputs; the sink is closed
//! exactly once on every path.

use crate::catalog::ColumnRef;
use crate::errors::EngineError;
use crate::execution::join::container::SpillableRowContainer;
use crate::execution::join::hash::{
    passes_filter, JoinEmission, JoinEmissionImpl, ScanControl,
};
use crate::execution::join::key::{encode_equality_key, BumpBytes};
use crate::execution::join::{joins_nullable, JoinType, Side};
use crate::execution::{RowSink, RowSource, SinkStatus};
use crate::expression::ScalarExpression;
use crate::runtime::{BytesMonitor, TempStorage};
use crate::types::tuple::{SchemaRef, Tuple};
use bumpalo::Bump;
use fixedbitset::FixedBitSet;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sizing reads up to this many bytes from each input before committing
/// to a stored side.
pub const DEFAULT_INITIAL_BUFFER_SIZE: u64 = 4 * 1024 * 1024;

pub struct HashJoinerConfig {
    /// Equality column indices, positionally paired with `right_eq_columns`.
    pub left_eq_columns: Vec<usize>,
    pub right_eq_columns: Vec<usize>,
    pub join_type: JoinType,
    /// Optional ON filter over the concatenated (left then right) row.
    pub on_filter: Option<ScalarExpression>,
    /// Projection over the concatenated row, or over the left row alone for
    /// semi/anti joins. Empty means all retained columns.
    pub output_columns: Vec<usize>,
    pub initial_buffer_size: u64,
    /// Pins the stored side and skips sizing. A test knob.
    pub forced_stored_side: Option<Side>,
    pub mem_monitor: BytesMonitor,
    pub disk_monitor: BytesMonitor,
    pub temp_storage: TempStorage,
}

pub struct HashJoiner<L: RowSource, R: RowSource> {
    config: HashJoinerConfig,
    left: InputState<L>,
    right: InputState<R>,
    left_width: usize,
    right_width: usize,
    output_schema: SchemaRef,
}

impl<L: RowSource, R: RowSource> HashJoiner<L, R> {
    pub fn new(config: HashJoinerConfig, left: L, right: R) -> Result<Self, EngineError> {
        let left_schema = left.schema();
        let right_schema = right.schema();
        let (left_width, right_width) = (left_schema.len(), right_schema.len());

        if config.left_eq_columns.len() != config.right_eq_columns.len() {
            return Err(EngineError::MismatchedEqualityColumns {
                left: config.left_eq_columns.len(),
                right: config.right_eq_columns.len(),
            });
        }
        check_columns(&config.left_eq_columns, left_width)?;
        check_columns(&config.right_eq_columns, right_width)?;

        let available = if config.join_type.retains_left_only() {
            left_width
        } else {
            left_width + right_width
        };
        for &index in &config.output_columns {
            if index >= available {
                return Err(EngineError::InvalidOutputColumn { index, available });
            }
        }

        let output_schema = Arc::new(output_schema(
            &config,
            &left_schema,
            &right_schema,
        ));
        Ok(HashJoiner {
            config,
            left: InputState::new(left),
            right: InputState::new(right),
            left_width,
            right_width,
            output_schema,
        })
    }

    pub fn output_schema(&self) -> SchemaRef {
        self.output_schema.clone()
    }

    /// Runs the join to completion, pushing result rows into `sink`.
    /// Consumes the operator; the container, match flags, and all budget
    /// reservations are released before this returns, on every path.
    pub fn run<K: RowSink>(mut self, sink: &mut K) {
        if let Err(err) = self.join_loop(sink) {
            warn!(%err, "join aborted, draining inputs");
            sink.push_error(err);
        }
        self.drain_inputs(sink);
        sink.close();
    }

    /// `Ok(())` covers both completion and a sink drain request; the
    /// caller drains the inputs either way.
    fn join_loop<K: RowSink>(&mut self, sink: &mut K) -> Result<(), EngineError> {
        let stored_side = self.size_both_sides()?;
        debug!(join_type = %self.config.join_type, ?stored_side, "stored side selected");
        match stored_side {
            Side::Left => run_join(
                &self.config,
                &mut self.left,
                &mut self.right,
                true,
                self.left_width,
                self.right_width,
                sink,
            ),
            Side::Right => run_join(
                &self.config,
                &mut self.right,
                &mut self.left,
                false,
                self.left_width,
                self.right_width,
                sink,
            ),
        }
    }

    /// Reads bounded prefixes from both inputs and picks the side that
    /// looks smaller. A side that exhausts below the threshold has its
    /// exact size; the prefixes are kept and replayed into the build.
    /// Ties go to the right side.
    fn size_both_sides(&mut self) -> Result<Side, EngineError> {
        if let Some(side) = self.config.forced_stored_side {
            return Ok(side);
        }
        let threshold = self.config.initial_buffer_size;
        while self.left.still_sizing(threshold) || self.right.still_sizing(threshold) {
            // always advance the side that currently looks smaller
            let left_turn = self.left.still_sizing(threshold)
                && (!self.right.still_sizing(threshold)
                    || self.left.buffered_bytes <= self.right.buffered_bytes);
            if left_turn {
                self.left.buffer_one()?;
            } else {
                self.right.buffer_one()?;
            }
        }
        if self.left.buffered_bytes < self.right.buffered_bytes {
            Ok(Side::Left)
        } else {
            Ok(Side::Right)
        }
    }

    /// Sends consumer-done to both inputs, discards their buffered rows,
    /// and forwards any trailing errors downstream.
    fn drain_inputs<K: RowSink>(&mut self, sink: &mut K) {
        self.left.drain(sink);
        self.right.drain(sink);
    }
}

fn check_columns(columns: &[usize], width: usize) -> Result<(), EngineError> {
    for &index in columns {
        if index >= width {
            return Err(EngineError::InvalidEqualityColumn {
                index,
                available: width,
            });
        }
    }
    Ok(())
}

fn output_schema(
    config: &HashJoinerConfig,
    left_schema: &[ColumnRef],
    right_schema: &[ColumnRef],
) -> Vec<ColumnRef> {
    let force = |column: &ColumnRef, nullable: bool| {
        column
            .nullable_for_join(nullable)
            .unwrap_or_else(|| column.clone())
    };
    let mut columns: Vec<ColumnRef> = if config.join_type.retains_left_only() {
        left_schema.to_vec()
    } else {
        let (left_nullable, right_nullable) = joins_nullable(&config.join_type);
        left_schema
            .iter()
            .map(|c| force(c, left_nullable))
            .chain(right_schema.iter().map(|c| force(c, right_nullable)))
            .collect()
    };
    if !config.output_columns.is_empty() {
        columns = config
            .output_columns
            .iter()
            .map(|&i| columns[i].clone())
            .collect();
    }
    columns
}

/// One input of the join. Rows buffered during sizing are replayed ahead
/// of the remainder of the source.
struct InputState<S: RowSource> {
    source: S,
    buffered: VecDeque<Tuple>,
    buffered_bytes: u64,
    exhausted: bool,
}

impl<S: RowSource> InputState<S> {
    fn new(source: S) -> Self {
        InputState {
            source,
            buffered: VecDeque::new(),
            buffered_bytes: 0,
            exhausted: false,
        }
    }

    fn still_sizing(&self, threshold: u64) -> bool {
        !self.exhausted && self.buffered_bytes < threshold
    }

    fn buffer_one(&mut self) -> Result<(), EngineError> {
        match self.source.next_row() {
            Some(Ok(tuple)) => {
                self.buffered_bytes += tuple.data_size() as u64;
                self.buffered.push_back(tuple);
                Ok(())
            }
            Some(Err(err)) => Err(err),
            None => {
                self.exhausted = true;
                Ok(())
            }
        }
    }

    fn pull(&mut self) -> Option<Result<Tuple, EngineError>> {
        if let Some(tuple) = self.buffered.pop_front() {
            return Some(Ok(tuple));
        }
        if self.exhausted {
            return None;
        }
        self.source.next_row()
    }

    fn drain<K: RowSink>(&mut self, sink: &mut K) {
        self.buffered.clear();
        self.source.consumer_done();
        while let Some(entry) = self.source.next_row() {
            if let Err(err) = entry {
                sink.push_error(err);
            }
        }
    }
}

fn run_join<B: RowSource, P: RowSource, K: RowSink>(
    config: &HashJoinerConfig,
    build: &mut InputState<B>,
    probe: &mut InputState<P>,
    stored_is_left: bool,
    left_width: usize,
    right_width: usize,
    sink: &mut K,
) -> Result<(), EngineError> {
    let (build_eq, probe_eq) = if stored_is_left {
        (&config.left_eq_columns, &config.right_eq_columns)
    } else {
        (&config.right_eq_columns, &config.left_eq_columns)
    };

    let mut container = SpillableRowContainer::new(
        config.mem_monitor.clone(),
        config.disk_monitor.clone(),
        config.temp_storage.clone(),
    );
    // Match flags live outside the container, keyed by insertion id, so
    // they survive the rows moving to disk.
    let mut matched = FixedBitSet::new();
    let mut bump = Bump::new();

    let mut row_id = 0usize;
    while let Some(entry) = build.pull() {
        let tuple = entry?;
        bump.reset();
        let mut key = BumpBytes::new_in(&bump);
        if encode_equality_key(&tuple.values, build_eq, &mut key)? {
            container.put(Some(key.as_slice()), row_id, tuple)?;
        } else {
            container.put(None, row_id, tuple)?;
        }
        row_id += 1;
    }
    matched.grow(row_id);
    debug!(
        rows = row_id,
        spilled = container.is_spilled(),
        "build phase complete"
    );

    let emission = JoinEmissionImpl::new(config.join_type, stored_is_left, left_width, right_width);
    let mut out: Vec<Tuple> = Vec::new();
    let mut scratch = Vec::new();

    while let Some(entry) = probe.pull() {
        let streamed = entry?;
        bump.reset();
        let mut key = BumpBytes::new_in(&bump);
        let mut matched_any = false;
        // A NULL key probes nothing; the row goes straight to the
        // no-match hook.
        if encode_equality_key(&streamed.values, probe_eq, &mut key)? {
            for record in container.get(key.as_slice()) {
                let (rid, stored) = record?;
                if !passes_filter(
                    config.on_filter.as_ref(),
                    stored_is_left,
                    &streamed,
                    &stored,
                    &mut scratch,
                )? {
                    continue;
                }
                matched_any = true;
                matched.insert(rid);
                if emission.on_match(&streamed, &stored, &mut out) == ScanControl::Stop {
                    break;
                }
            }
        }
        emission.on_probe_end(&streamed, matched_any, &mut out);
        for tuple in out.drain(..) {
            if push_projected(&config.output_columns, sink, tuple) == SinkStatus::DrainRequested {
                return Ok(());
            }
        }
    }

    if emission.needs_sweep() {
        for record in container.scan() {
            let (rid, stored) = record?;
            emission.on_sweep(&stored, matched.contains(rid), &mut out);
            for tuple in out.drain(..) {
                if push_projected(&config.output_columns, sink, tuple) == SinkStatus::DrainRequested
                {
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

fn push_projected<K: RowSink>(output: &[usize], sink: &mut K, tuple: Tuple) -> SinkStatus {
    if output.is_empty() {
        return sink.push(tuple);
    }
    let values = output.iter().map(|&i| tuple.values[i].clone()).collect();
    sink.push(Tuple::new(values))
}
