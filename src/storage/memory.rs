//! In-memory job store
//!
//! Used for dry runs and tests. Records live in a `BTreeMap` so scans come back in id order,
//! matching the SQLite store.

use crate::job::{JobRecord, StoredJob};
use crate::storage::traits::{finish_scan, next_updated_at, JobStore, ScanPage, StorageResult};
use chrono::Utc;
use std::collections::BTreeMap;
use std::ops::Bound;

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: BTreeMap<String, StoredJob>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored job, in id order
    pub fn jobs(&self) -> Vec<StoredJob> {
        self.jobs.values().cloned().collect()
    }
}

impl JobStore for MemoryJobStore {
    fn upsert(&mut self, record: &JobRecord) -> StorageResult<()> {
        let now = Utc::now();
        match self.jobs.get_mut(&record.id) {
            Some(existing) => {
                existing.updated_at = next_updated_at(now, Some(existing.updated_at));
                existing.record = record.clone();
            }
            None => {
                self.jobs.insert(
                    record.id.clone(),
                    StoredJob {
                        record: record.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    fn batch_upsert(&mut self, records: &[JobRecord], max_batch_size: usize) -> StorageResult<()> {
        for chunk in records.chunks(max_batch_size.max(1)) {
            for record in chunk {
                self.upsert(record)?;
            }
        }
        Ok(())
    }

    fn scan_page(&self, limit: usize, cursor: Option<&str>) -> StorageResult<ScanPage> {
        let limit = limit.max(1);
        let lower = match cursor {
            Some(c) => Bound::Excluded(c.to_string()),
            None => Bound::Unbounded,
        };
        let items: Vec<StoredJob> = self
            .jobs
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, job)| job.clone())
            .collect();
        Ok(finish_scan(items, limit))
    }

    fn get(&self, id: &str) -> StorageResult<Option<StoredJob>> {
        Ok(self.jobs.get(id).cloned())
    }

    fn count(&self) -> StorageResult<u64> {
        Ok(self.jobs.len() as u64)
    }
}
