//! Storage traits and error types
//!
//! This module defines the trait interface for job store backends and
//! associated error types.

use crate::job::{JobRecord, StoredJob};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One page of a keyset scan
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Records in ascending id order
    pub items: Vec<StoredJob>,
    /// Pass back to continue; `None` on the final page
    pub next_cursor: Option<String>,
}

/// Trait for job store implementations
///
/// Writes are upserts keyed by [`JobRecord::id`]: the first write sets `created_at`, every
/// write refreshes `updated_at` and overwrites the remaining fields.
pub trait JobStore: Send {
    /// Inserts or replaces a single record
    fn upsert(&mut self, record: &JobRecord) -> StorageResult<()>;

    /// Upserts `records` in chunks of at most `max_batch_size`
    ///
    /// Each chunk is applied atomically. When a chunk fails, earlier chunks stay written
    /// and the error is returned; re-sending the same records is harmless.
    fn batch_upsert(&mut self, records: &[JobRecord], max_batch_size: usize) -> StorageResult<()>;

    /// Returns up to `limit` records with ids strictly greater than `cursor`
    ///
    /// # Arguments
    ///
    /// * `limit` - Page size (values below 1 are treated as 1)
    /// * `cursor` - `next_cursor` of the previous page, or `None` to start
    fn scan_page(&self, limit: usize, cursor: Option<&str>) -> StorageResult<ScanPage>;

    /// Gets a single record by id
    fn get(&self, id: &str) -> StorageResult<Option<StoredJob>>;

    /// Number of stored records
    fn count(&self) -> StorageResult<u64>;
}

/// Computes the next `updated_at` for a record
///
/// Never returns a value at or before `previous`, even when the clock stands still.
pub fn next_updated_at(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// Builds a [`ScanPage`] from the rows of one keyset query
pub(crate) fn finish_scan(items: Vec<StoredJob>, limit: usize) -> ScanPage {
    let next_cursor = if items.len() < limit {
        None
    } else {
        items.last().map(|job| job.record.id.clone())
    };
    ScanPage { items, next_cursor }
}
