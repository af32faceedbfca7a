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

//! Resource handles shared between the engine and its operators: byte-budget
//! monitors for memory/disk accounting and the temp-storage handle that
//! hands out spill files.

use crate::errors::EngineError;
use parking_lot::Mutex;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

/// A named byte-budget tracker. Clones share the same budget, so a monitor
/// handed to several operators accounts for them jointly; every reservation
/// must be released on the owner's exit path.
#[derive(Clone)]
pub struct BytesMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    name: &'static str,
    budget: u64,
    used: Mutex<u64>,
}

impl BytesMonitor {
    pub fn with_budget(name: &'static str, budget: u64) -> Self {
        BytesMonitor {
            inner: Arc::new(MonitorInner {
                name,
                budget,
                used: Mutex::new(0),
            }),
        }
    }

    pub fn unlimited(name: &'static str) -> Self {
        Self::with_budget(name, u64::MAX)
    }

    pub fn reserve(&self, bytes: u64) -> Result<(), EngineError> {
        let mut used = self.inner.used.lock();
        if used.saturating_add(bytes) > self.inner.budget {
            return Err(EngineError::BudgetExhausted {
                monitor: self.inner.name,
                budget: self.inner.budget,
            });
        }
        *used += bytes;
        Ok(())
    }

    pub fn release(&self, bytes: u64) {
        let mut used = self.inner.used.lock();
        *used = used.saturating_sub(bytes);
    }

    pub fn used(&self) -> u64 {
        *self.inner.used.lock()
    }
}

/// Handle over a directory used for spill files. Files are anonymous: the
/// OS reclaims them as soon as the handle drops, whatever the exit path.
#[derive(Clone)]
pub struct TempStorage {
    dir: PathBuf,
}

impl TempStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TempStorage { dir: dir.into() }
    }

    pub fn spill_file(&self) -> Result<File, EngineError> {
        Ok(tempfile::tempfile_in(&self.dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_budget() {
        let monitor = BytesMonitor::with_budget("test-mem", 100);
        monitor.reserve(60).unwrap();
        assert!(monitor.reserve(60).is_err());
        assert_eq!(monitor.used(), 60);
        monitor.release(60);
        monitor.reserve(100).unwrap();
    }

    #[test]
    fn test_monitor_shared_between_clones() {
        let monitor = BytesMonitor::with_budget("test-mem", 10);
        let other = monitor.clone();
        monitor.reserve(8).unwrap();
        assert!(other.reserve(8).is_err());
        other.release(8);
        assert_eq!(monitor.used(), 0);
    }

    #[test]
    fn test_temp_storage_hands_out_files() {
        use std::io::{Read, Seek, SeekFrom, Write};

        let dir = tempfile::TempDir::new().unwrap();
        let temp = TempStorage::new(dir.path());
        let mut file = temp.spill_file().unwrap();
        file.write_all(b"spill").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = String::new();
        file.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "spill");
    }
}
