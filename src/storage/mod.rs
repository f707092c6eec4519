//! Storage module for persisting job records
//!
//! This module handles all persistence for the harvester, including:
//! - SQLite database initialization and schema management
//! - Idempotent upsert-by-id with created/updated bookkeeping
//! - Keyset-paginated scans used to preload known ids
//! - An in-memory store for dry runs

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;
pub use traits::{next_updated_at, JobStore, ScanPage, StorageError, StorageResult};

use crate::HunterError;
use std::path::Path;

/// Initializes or opens the job database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteJobStore)` - Successfully initialized storage
/// * `Err(HunterError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteJobStore, HunterError> {
    Ok(SqliteJobStore::new(path)?)
}
