//! Buffered persistence
//!
//! Extracted records collect in a FIFO buffer and are written to the store in chunks.
//! A chunk that cannot be written goes back to the front of the buffer; after too many
//! such requeues the session gives up.

use crate::config::FlushConfig;
use crate::job::JobRecord;
use crate::retry::RetryPolicy;
use crate::storage::JobStore;
use crate::{HunterError, Result};
use std::collections::{HashMap, VecDeque};
use std::future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Running totals of a flush pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Records acknowledged by the store
    pub records_flushed: usize,
    /// Successful chunk writes
    pub flush_calls: usize,
    /// Chunks put back after a failed write
    pub requeues: u32,
}

pub struct FlushPipeline {
    buffer: VecDeque<JobRecord>,
    threshold: usize,
    max_batch_size: usize,
    cooldown: Duration,
    max_requeues: u32,
    retry: RetryPolicy,
    stats: FlushStats,
}

impl FlushPipeline {
    pub fn new(config: &FlushConfig, retry: RetryPolicy) -> Self {
        Self {
            buffer: VecDeque::new(),
            threshold: config.threshold.max(1),
            max_batch_size: config.max_batch_size.max(1),
            cooldown: Duration::from_millis(config.cooldown_ms),
            max_requeues: config.max_requeues,
            retry,
            stats: FlushStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn stats(&self) -> FlushStats {
        self.stats
    }

    /// Buffers a record, flushing once if the buffer reached the threshold
    pub async fn push<S>(&mut self, record: JobRecord, store: &mut S) -> Result<()>
    where
        S: JobStore + ?Sized,
    {
        self.buffer.push_back(record);
        if self.buffer.len() >= self.threshold {
            self.flush(store).await?;
        }
        Ok(())
    }

    /// Writes up to `threshold` records from the front of the buffer
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Records written; 0 if the chunk was requeued
    /// * `Err(HunterError::PersistenceFailure)` - The requeue budget is spent
    pub async fn flush<S>(&mut self, store: &mut S) -> Result<usize>
    where
        S: JobStore + ?Sized,
    {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        let take = self.threshold.min(self.buffer.len());
        let chunk: Vec<JobRecord> = self.buffer.drain(..take).collect();
        let unique = dedupe_by_id(&chunk);
        let max_batch_size = self.max_batch_size;

        let written = self
            .retry
            .run("batch_upsert", || {
                future::ready(store.batch_upsert(&unique, max_batch_size))
            })
            .await;

        match written {
            Ok(()) => {
                self.stats.records_flushed += unique.len();
                self.stats.flush_calls += 1;
                info!(
                    records = unique.len(),
                    buffered = self.buffer.len(),
                    total_flushed = self.stats.records_flushed,
                    "Flushed records"
                );
                Ok(unique.len())
            }
            Err(e) => {
                // Put the chunk back in its original order
                for record in chunk.into_iter().rev() {
                    self.buffer.push_front(record);
                }
                self.stats.requeues += 1;

                if self.stats.requeues > self.max_requeues {
                    error!(
                        requeues = self.stats.requeues,
                        buffered = self.buffer.len(),
                        kind = "persistence",
                        error = %e,
                        "Requeue budget exhausted"
                    );
                    return Err(HunterError::PersistenceFailure {
                        requeues: self.stats.requeues,
                        message: e.to_string(),
                    });
                }

                warn!(
                    requeues = self.stats.requeues,
                    buffered = self.buffer.len(),
                    cooldown_ms = self.cooldown.as_millis() as u64,
                    error = %e,
                    "Flush failed, chunk requeued"
                );
                if !self.cooldown.is_zero() {
                    tokio::time::sleep(self.cooldown).await;
                }
                Ok(0)
            }
        }
    }

    /// Flushes until the buffer is empty
    pub async fn drain<S>(&mut self, store: &mut S) -> Result<()>
    where
        S: JobStore + ?Sized,
    {
        while !self.buffer.is_empty() {
            self.flush(store).await?;
        }
        debug!(stats = ?self.stats, "Flush pipeline drained");
        Ok(())
    }
}

/// Collapses records sharing an id, keeping the position of the first and the content
/// of the last
fn dedupe_by_id(records: &[JobRecord]) -> Vec<JobRecord> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<JobRecord> = Vec::with_capacity(records.len());

    for record in records {
        match position.get(record.id.as_str()) {
            Some(&idx) => unique[idx] = record.clone(),
            None => {
                position.insert(record.id.as_str(), unique.len());
                unique.push(record.clone());
            }
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::StoredJob;
    use crate::storage::{MemoryJobStore, ScanPage, StorageError, StorageResult};
    use chrono::Utc;

    fn record(n: usize) -> JobRecord {
        JobRecord {
            id: format!("weworkremotely-job-{:03}", n),
            title: format!("Job {}", n),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description: String::new(),
            description_preview: String::new(),
            apply_url: format!("https://weworkremotely.com/remote-jobs/job-{:03}", n),
            source: "weworkremotely".to_string(),
            remote_ok: true,
            posted_at: Utc::now(),
        }
    }

    fn config(max_requeues: u32) -> FlushConfig {
        FlushConfig {
            threshold: 20,
            max_batch_size: 25,
            cooldown_ms: 0,
            max_requeues,
        }
    }

    /// Store that records batch sizes and fails the first `failures` writes
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryJobStore,
        batches: Vec<usize>,
        failures: usize,
    }

    impl JobStore for RecordingStore {
        fn upsert(&mut self, record: &JobRecord) -> StorageResult<()> {
            self.inner.upsert(record)
        }

        fn batch_upsert(&mut self, records: &[JobRecord], max: usize) -> StorageResult<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(StorageError::Unavailable("throttled".to_string()));
            }
            self.batches.push(records.len());
            self.inner.batch_upsert(records, max)
        }

        fn scan_page(&self, limit: usize, cursor: Option<&str>) -> StorageResult<ScanPage> {
            self.inner.scan_page(limit, cursor)
        }

        fn get(&self, id: &str) -> StorageResult<Option<StoredJob>> {
            self.inner.get(id)
        }

        fn count(&self) -> StorageResult<u64> {
            self.inner.count()
        }
    }

    #[tokio::test]
    async fn test_chunked_flush() {
        let mut store = RecordingStore::default();
        let mut pipeline = FlushPipeline::new(&config(5), RetryPolicy::no_retry());

        for n in 0..45 {
            pipeline.push(record(n), &mut store).await.unwrap();
        }
        assert_eq!(store.batches, vec![20, 20]);
        assert_eq!(pipeline.len(), 5);

        pipeline.drain(&mut store).await.unwrap();
        assert_eq!(store.batches, vec![20, 20, 5]);
        assert_eq!(store.count().unwrap(), 45);

        let stats = pipeline.stats();
        assert_eq!(stats.records_flushed, 45);
        assert_eq!(stats.flush_calls, 3);
        assert_eq!(stats.requeues, 0);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_requeued_in_order() {
        let mut store = RecordingStore {
            failures: 1,
            ..Default::default()
        };
        let mut pipeline = FlushPipeline::new(&config(5), RetryPolicy::no_retry());

        for n in 0..20 {
            pipeline.push(record(n), &mut store).await.unwrap();
        }
        // the automatic flush failed and put everything back
        assert_eq!(pipeline.len(), 20);
        assert_eq!(pipeline.stats().requeues, 1);
        assert_eq!(pipeline.buffer.front().map(|r| r.id.as_str()), Some("weworkremotely-job-000"));
        assert_eq!(pipeline.buffer.back().map(|r| r.id.as_str()), Some("weworkremotely-job-019"));

        pipeline.drain(&mut store).await.unwrap();
        assert_eq!(store.count().unwrap(), 20);
        assert!(pipeline.is_empty());
    }

    #[tokio::test]
    async fn test_retry_absorbs_transient_failure() {
        let mut store = RecordingStore {
            failures: 2,
            ..Default::default()
        };
        let retry = RetryPolicy::new(4, Duration::ZERO, Duration::ZERO);
        let mut pipeline = FlushPipeline::new(&config(5), retry);

        for n in 0..3 {
            pipeline.push(record(n), &mut store).await.unwrap();
        }
        pipeline.drain(&mut store).await.unwrap();

        assert_eq!(pipeline.stats().requeues, 0);
        assert_eq!(store.batches, vec![3]);
    }

    #[tokio::test]
    async fn test_requeue_budget_exhausted() {
        let mut store = RecordingStore {
            failures: usize::MAX,
            ..Default::default()
        };
        let mut pipeline = FlushPipeline::new(&config(2), RetryPolicy::no_retry());
        pipeline.push(record(1), &mut store).await.unwrap();

        let result = pipeline.drain(&mut store).await;
        match result {
            Err(HunterError::PersistenceFailure { requeues, .. }) => assert_eq!(requeues, 3),
            other => panic!("expected persistence failure, got {:?}", other),
        }
        // nothing was lost from the buffer
        assert_eq!(pipeline.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ids_collapse_to_last() {
        let mut store = RecordingStore::default();
        let mut pipeline = FlushPipeline::new(&config(5), RetryPolicy::no_retry());

        let first = record(7);
        let mut second = record(7);
        second.title = "Updated".to_string();

        pipeline.push(first, &mut store).await.unwrap();
        pipeline.push(second, &mut store).await.unwrap();
        pipeline.drain(&mut store).await.unwrap();

        assert_eq!(store.batches, vec![1]);
        assert_eq!(store.get("weworkremotely-job-007").unwrap().unwrap().record.title, "Updated");
        assert_eq!(pipeline.stats().records_flushed, 1);
    }

    #[test]
    fn test_dedupe_keeps_first_position() {
        let mut later = record(1);
        later.title = "later".to_string();
        let unique = dedupe_by_id(&[record(1), record(2), later]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title, "later");
        assert_eq!(unique[1].id, "weworkremotely-job-002");
    }
}
