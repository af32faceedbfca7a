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

//! Append-only multimap from equality key to stored rows, in memory until
//! the memory budget is exceeded, then transparently disk-backed.
//!
//! Rows whose equality key contains NULL are stored as *unmatchable*: they
//! never appear in a bucket but still show up in [`SpillableRowContainer::scan`]
//! so outer joins can emit them in the unmatched sweep. Insertion order
//! within a bucket is preserved across the spill. All budget reservations
//! are released in `Drop`, on every exit path.

use crate::errors::EngineError;
use crate::runtime::{BytesMonitor, TempStorage};
use crate::types::tuple::Tuple;
use crate::types::value::DataValue;
use ahash::{HashMap, HashMapExt};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use std::collections::hash_map;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::os::unix::fs::FileExt;
use tracing::debug;

// Rough per-insertion bookkeeping overhead charged on top of the tuple
// payload (bucket entry, key bytes, map slot).
const MEM_PUT_OVERHEAD: usize = 48;

pub(crate) struct SpillableRowContainer {
    state: ContainerState,
    disk_monitor: BytesMonitor,
    temp: TempStorage,
}

enum ContainerState {
    Mem(MemRowContainer),
    Disk(DiskRowContainer),
}

impl SpillableRowContainer {
    pub(crate) fn new(mem: BytesMonitor, disk: BytesMonitor, temp: TempStorage) -> Self {
        SpillableRowContainer {
            state: ContainerState::Mem(MemRowContainer {
                buckets: HashMap::new(),
                unmatchable: Vec::new(),
                mem,
                reserved: 0,
                rows: 0,
            }),
            disk_monitor: disk,
            temp,
        }
    }

    /// Inserts a row. `key = None` marks the row unmatchable (NULL in an
    /// equality column). The first insertion the memory budget rejects
    /// migrates everything to disk; later insertions go straight there.
    pub(crate) fn put(
        &mut self,
        key: Option<&[u8]>,
        row_id: usize,
        tuple: Tuple,
    ) -> Result<(), EngineError> {
        if let ContainerState::Mem(mem) = &mut self.state {
            let bytes = (tuple.data_size()
                + key.map_or(0, <[u8]>::len)
                + MEM_PUT_OVERHEAD) as u64;
            if mem.mem.reserve(bytes).is_ok() {
                mem.reserved += bytes;
                mem.rows += 1;
                match key {
                    Some(k) => mem
                        .buckets
                        .entry(k.to_vec())
                        .or_default()
                        .push((row_id, tuple)),
                    None => mem.unmatchable.push((row_id, tuple)),
                }
                return Ok(());
            }
            self.spill()?;
            return self.put(key, row_id, tuple);
        }
        let ContainerState::Disk(disk) = &mut self.state else {
            unreachable!()
        };
        disk.put(key, row_id, &tuple)
    }

    /// The bucket for `key`, empty if absent. Lazy in both residencies.
    pub(crate) fn get<'a>(&'a self, key: &[u8]) -> Bucket<'a> {
        match &self.state {
            ContainerState::Mem(mem) => match mem.buckets.get(key) {
                Some(bucket) => Bucket::Mem(bucket.iter()),
                None => Bucket::Empty,
            },
            ContainerState::Disk(disk) => match disk.index.get(key) {
                Some(offsets) => Bucket::Disk {
                    container: disk,
                    offsets: offsets.iter(),
                },
                None => Bucket::Empty,
            },
        }
    }

    /// Every stored row, buckets and unmatchable alike, with its row id.
    pub(crate) fn scan(&self) -> Scan<'_> {
        match &self.state {
            ContainerState::Mem(mem) => Scan::Mem {
                buckets: mem.buckets.values(),
                bucket: [].iter(),
                unmatchable: mem.unmatchable.iter(),
            },
            ContainerState::Disk(disk) => Scan::Disk {
                container: disk,
                offset: 0,
            },
        }
    }

    pub(crate) fn row_count(&self) -> usize {
        match &self.state {
            ContainerState::Mem(mem) => mem.rows,
            ContainerState::Disk(disk) => disk.rows,
        }
    }

    pub(crate) fn is_spilled(&self) -> bool {
        matches!(self.state, ContainerState::Disk(_))
    }

    fn spill(&mut self) -> Result<(), EngineError> {
        let ContainerState::Mem(mem) = &mut self.state else {
            return Ok(());
        };
        debug!(
            rows = mem.rows,
            reserved = mem.reserved,
            "row container exceeded its memory budget, migrating to disk"
        );
        let file = self.temp.spill_file()?;
        let mut disk = DiskRowContainer {
            file,
            index: HashMap::new(),
            write_pos: 0,
            disk: self.disk_monitor.clone(),
            reserved: 0,
            rows: 0,
        };
        for (key, bucket) in mem.buckets.drain() {
            for (row_id, tuple) in bucket {
                disk.put(Some(&key), row_id, &tuple)?;
            }
        }
        for (row_id, tuple) in mem.unmatchable.drain(..) {
            disk.put(None, row_id, &tuple)?;
        }
        mem.mem.release(mem.reserved);
        mem.reserved = 0;
        self.state = ContainerState::Disk(disk);
        Ok(())
    }
}

struct MemRowContainer {
    buckets: HashMap<Vec<u8>, Vec<(usize, Tuple)>>,
    unmatchable: Vec<(usize, Tuple)>,
    mem: BytesMonitor,
    reserved: u64,
    rows: usize,
}

impl Drop for MemRowContainer {
    fn drop(&mut self) {
        self.mem.release(self.reserved);
    }
}

/// Disk residency: length-prefixed records appended to an anonymous temp
/// file, with an in-memory offset index per key. Unmatchable rows carry no
/// index entry; the sequential scan still visits them.
pub(crate) struct DiskRowContainer {
    file: File,
    index: HashMap<Vec<u8>, Vec<u64>>,
    write_pos: u64,
    disk: BytesMonitor,
    reserved: u64,
    rows: usize,
}

impl DiskRowContainer {
    fn put(&mut self, key: Option<&[u8]>, row_id: usize, tuple: &Tuple) -> Result<(), EngineError> {
        let record = encode_record(row_id, tuple)?;
        let len = record.len() as u64;
        // Disk budget failure is fatal to the operator; there is no smaller
        // fallback to retry with.
        self.disk.reserve(len)?;
        self.reserved += len;
        self.file.write_all_at(&record, self.write_pos)?;
        if let Some(k) = key {
            self.index.entry(k.to_vec()).or_default().push(self.write_pos);
        }
        self.write_pos += len;
        self.rows += 1;
        Ok(())
    }

    /// Reads the record at `offset`, returning the row and the offset of
    /// the next record.
    fn read_record(&self, offset: u64) -> Result<(usize, Tuple, u64), EngineError> {
        let mut len_buf = [0u8; 4];
        self.file.read_exact_at(&mut len_buf, offset)?;
        let len = BigEndian::read_u32(&len_buf) as usize;
        let mut payload = vec![0u8; len];
        self.file.read_exact_at(&mut payload, offset + 4)?;
        let (row_id, tuple) = decode_record(&payload)?;
        Ok((row_id, tuple, offset + 4 + len as u64))
    }
}

impl Drop for DiskRowContainer {
    fn drop(&mut self) {
        self.disk.release(self.reserved);
    }
}

pub(crate) enum Bucket<'a> {
    Empty,
    Mem(std::slice::Iter<'a, (usize, Tuple)>),
    Disk {
        container: &'a DiskRowContainer,
        offsets: std::slice::Iter<'a, u64>,
    },
}

impl Iterator for Bucket<'_> {
    type Item = Result<(usize, Tuple), EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Bucket::Empty => None,
            Bucket::Mem(iter) => iter.next().map(|(row_id, tuple)| Ok((*row_id, tuple.clone()))),
            Bucket::Disk { container, offsets } => offsets.next().map(|&offset| {
                container
                    .read_record(offset)
                    .map(|(row_id, tuple, _)| (row_id, tuple))
            }),
        }
    }
}

pub(crate) enum Scan<'a> {
    Mem {
        buckets: hash_map::Values<'a, Vec<u8>, Vec<(usize, Tuple)>>,
        bucket: std::slice::Iter<'a, (usize, Tuple)>,
        unmatchable: std::slice::Iter<'a, (usize, Tuple)>,
    },
    Disk {
        container: &'a DiskRowContainer,
        offset: u64,
    },
}

impl Iterator for Scan<'_> {
    type Item = Result<(usize, Tuple), EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Scan::Mem {
                buckets,
                bucket,
                unmatchable,
            } => loop {
                if let Some((row_id, tuple)) = bucket.next() {
                    return Some(Ok((*row_id, tuple.clone())));
                }
                match buckets.next() {
                    Some(next_bucket) => *bucket = next_bucket.iter(),
                    None => {
                        return unmatchable
                            .next()
                            .map(|(row_id, tuple)| Ok((*row_id, tuple.clone())))
                    }
                }
            },
            Scan::Disk { container, offset } => {
                if *offset >= container.write_pos {
                    return None;
                }
                match container.read_record(*offset) {
                    Ok((row_id, tuple, next)) => {
                        *offset = next;
                        Some(Ok((row_id, tuple)))
                    }
                    Err(err) => {
                        // stop the scan; a second read would fail the same way
                        *offset = container.write_pos;
                        Some(Err(err))
                    }
                }
            }
        }
    }
}

// Record layout: [u32 payload len][u64 row_id][u16 n][tagged values...].
// Private on-disk format, never leaves the spill file.

const TAG_NULL: u8 = 0;
const TAG_BOOLEAN: u8 = 1;
const TAG_INT8: u8 = 2;
const TAG_INT16: u8 = 3;
const TAG_INT32: u8 = 4;
const TAG_INT64: u8 = 5;
const TAG_FLOAT32: u8 = 6;
const TAG_FLOAT64: u8 = 7;
const TAG_UTF8: u8 = 8;
const TAG_DATE32: u8 = 9;
const TAG_DECIMAL: u8 = 10;

fn encode_record(row_id: usize, tuple: &Tuple) -> Result<Vec<u8>, EngineError> {
    let mut payload = Vec::with_capacity(16 + tuple.values.len() * 9);
    payload.write_u64::<BigEndian>(row_id as u64)?;
    payload.write_u16::<BigEndian>(tuple.values.len() as u16)?;
    for value in &tuple.values {
        encode_value(value, &mut payload)?;
    }
    let mut record = Vec::with_capacity(4 + payload.len());
    record.write_u32::<BigEndian>(payload.len() as u32)?;
    record.extend_from_slice(&payload);
    Ok(record)
}

fn encode_value(value: &DataValue, out: &mut Vec<u8>) -> Result<(), EngineError> {
    match value {
        DataValue::Null => out.write_u8(TAG_NULL)?,
        DataValue::Boolean(v) => {
            out.write_u8(TAG_BOOLEAN)?;
            out.write_u8(*v as u8)?;
        }
        DataValue::Int8(v) => {
            out.write_u8(TAG_INT8)?;
            out.write_i8(*v)?;
        }
        DataValue::Int16(v) => {
            out.write_u8(TAG_INT16)?;
            out.write_i16::<BigEndian>(*v)?;
        }
        DataValue::Int32(v) => {
            out.write_u8(TAG_INT32)?;
            out.write_i32::<BigEndian>(*v)?;
        }
        DataValue::Int64(v) => {
            out.write_u8(TAG_INT64)?;
            out.write_i64::<BigEndian>(*v)?;
        }
        DataValue::Float32(v) => {
            out.write_u8(TAG_FLOAT32)?;
            out.write_u32::<BigEndian>(v.to_bits())?;
        }
        DataValue::Float64(v) => {
            out.write_u8(TAG_FLOAT64)?;
            out.write_u64::<BigEndian>(v.to_bits())?;
        }
        DataValue::Utf8(v) => {
            out.write_u8(TAG_UTF8)?;
            out.write_u32::<BigEndian>(v.len() as u32)?;
            out.write_all(v.as_bytes())?;
        }
        DataValue::Date32(v) => {
            out.write_u8(TAG_DATE32)?;
            out.write_i32::<BigEndian>(*v)?;
        }
        DataValue::Decimal(v) => {
            out.write_u8(TAG_DECIMAL)?;
            out.write_i128::<BigEndian>(v.mantissa())?;
            out.write_u32::<BigEndian>(v.scale())?;
        }
    }
    Ok(())
}

fn decode_record(payload: &[u8]) -> Result<(usize, Tuple), EngineError> {
    let mut cursor = Cursor::new(payload);
    let row_id = cursor.read_u64::<BigEndian>()? as usize;
    let n = cursor.read_u16::<BigEndian>()? as usize;
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(decode_value(&mut cursor)?);
    }
    Ok((row_id, Tuple::new(values)))
}

fn decode_value(cursor: &mut Cursor<&[u8]>) -> Result<DataValue, EngineError> {
    Ok(match cursor.read_u8()? {
        TAG_NULL => DataValue::Null,
        TAG_BOOLEAN => DataValue::Boolean(cursor.read_u8()? != 0),
        TAG_INT8 => DataValue::Int8(cursor.read_i8()?),
        TAG_INT16 => DataValue::Int16(cursor.read_i16::<BigEndian>()?),
        TAG_INT32 => DataValue::Int32(cursor.read_i32::<BigEndian>()?),
        TAG_INT64 => DataValue::Int64(cursor.read_i64::<BigEndian>()?),
        TAG_FLOAT32 => DataValue::Float32(OrderedFloat(f32::from_bits(
            cursor.read_u32::<BigEndian>()?,
        ))),
        TAG_FLOAT64 => DataValue::Float64(OrderedFloat(f64::from_bits(
            cursor.read_u64::<BigEndian>()?,
        ))),
        TAG_UTF8 => {
            let len = cursor.read_u32::<BigEndian>()? as usize;
            let mut bytes = vec![0u8; len];
            cursor.read_exact(&mut bytes)?;
            DataValue::Utf8(
                String::from_utf8(bytes).map_err(|_| EngineError::CorruptedSpillRecord)?,
            )
        }
        TAG_DATE32 => DataValue::Date32(cursor.read_i32::<BigEndian>()?),
        TAG_DECIMAL => {
            let mantissa = cursor.read_i128::<BigEndian>()?;
            let scale = cursor.read_u32::<BigEndian>()?;
            DataValue::Decimal(
                Decimal::try_from_i128_with_scale(mantissa, scale)
                    .map_err(|_| EngineError::CorruptedSpillRecord)?,
            )
        }
        _ => return Err(EngineError::CorruptedSpillRecord),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tuple(values: Vec<DataValue>) -> Tuple {
        Tuple::new(values)
    }

    fn collect_bucket(bucket: Bucket) -> Vec<(usize, Tuple)> {
        bucket.map(|r| r.unwrap()).collect()
    }

    fn fill(container: &mut SpillableRowContainer) {
        container
            .put(Some(b"a"), 0, tuple(vec![DataValue::Int64(1)]))
            .unwrap();
        container
            .put(Some(b"a"), 1, tuple(vec![DataValue::Int64(2)]))
            .unwrap();
        container
            .put(Some(b"b"), 2, tuple(vec![DataValue::Utf8("x".to_string())]))
            .unwrap();
        container
            .put(None, 3, tuple(vec![DataValue::Null]))
            .unwrap();
    }

    #[test]
    fn test_grouped_retrieval_in_memory() {
        let dir = TempDir::new().unwrap();
        let mut container = SpillableRowContainer::new(
            BytesMonitor::unlimited("mem"),
            BytesMonitor::unlimited("disk"),
            TempStorage::new(dir.path()),
        );
        fill(&mut container);

        assert!(!container.is_spilled());
        let bucket = collect_bucket(container.get(b"a"));
        assert_eq!(bucket.len(), 2);
        // insertion order preserved
        assert_eq!(bucket[0], (0, tuple(vec![DataValue::Int64(1)])));
        assert_eq!(bucket[1], (1, tuple(vec![DataValue::Int64(2)])));
        assert!(collect_bucket(container.get(b"missing")).is_empty());
        assert_eq!(container.scan().count(), 4);
        assert_eq!(container.row_count(), 4);
    }

    #[test]
    fn test_grouped_retrieval_after_spill() {
        let dir = TempDir::new().unwrap();
        let mem = BytesMonitor::with_budget("mem", 1);
        let mut container = SpillableRowContainer::new(
            mem.clone(),
            BytesMonitor::unlimited("disk"),
            TempStorage::new(dir.path()),
        );
        fill(&mut container);

        assert!(container.is_spilled());
        assert_eq!(mem.used(), 0);
        let bucket = collect_bucket(container.get(b"a"));
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0], (0, tuple(vec![DataValue::Int64(1)])));
        assert_eq!(bucket[1], (1, tuple(vec![DataValue::Int64(2)])));
        // the NULL-keyed row shows up in the scan but no bucket
        let mut ids: Vec<usize> = container.scan().map(|r| r.unwrap().0).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_spill_midway_keeps_earlier_rows() {
        let dir = TempDir::new().unwrap();
        let mut container = SpillableRowContainer::new(
            BytesMonitor::with_budget("mem", 256),
            BytesMonitor::unlimited("disk"),
            TempStorage::new(dir.path()),
        );
        for i in 0..64usize {
            container
                .put(Some(b"k"), i, tuple(vec![DataValue::Int64(i as i64)]))
                .unwrap();
        }
        assert!(container.is_spilled());
        let bucket = collect_bucket(container.get(b"k"));
        assert_eq!(bucket.len(), 64);
        assert_eq!(bucket[0].0, 0);
        assert_eq!(bucket[63].0, 63);
    }

    #[test]
    fn test_disk_budget_exhaustion_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut container = SpillableRowContainer::new(
            BytesMonitor::with_budget("mem", 1),
            BytesMonitor::with_budget("disk", 8),
            TempStorage::new(dir.path()),
        );
        let result = container.put(Some(b"a"), 0, tuple(vec![DataValue::Int64(1)]));
        assert!(matches!(
            result,
            Err(EngineError::BudgetExhausted { monitor: "disk", .. })
        ));
    }

    #[test]
    fn test_monitors_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let mem = BytesMonitor::unlimited("mem");
        let disk = BytesMonitor::unlimited("disk");
        {
            let mut container =
                SpillableRowContainer::new(mem.clone(), disk.clone(), TempStorage::new(dir.path()));
            fill(&mut container);
            assert!(mem.used() > 0);
        }
        assert_eq!(mem.used(), 0);
        assert_eq!(disk.used(), 0);
    }

    #[test]
    fn test_record_codec_round_trip() {
        let original = tuple(vec![
            DataValue::Null,
            DataValue::Boolean(true),
            DataValue::Int8(-5),
            DataValue::Int64(i64::MIN),
            DataValue::Float64(OrderedFloat(-0.25)),
            DataValue::Utf8("hash join".to_string()),
            DataValue::Date32(19_000),
            DataValue::Decimal(Decimal::new(-12345, 2)),
        ]);
        let record = encode_record(42, &original).unwrap();
        let (row_id, decoded) = decode_record(&record[4..]).unwrap();
        assert_eq!(row_id, 42);
        assert_eq!(decoded, original);
    }
}
