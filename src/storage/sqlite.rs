//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::job::{JobRecord, StoredJob};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    finish_scan, next_updated_at, JobStore, ScanPage, StorageError, StorageResult,
};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SELECT_COLUMNS: &str = "id, title, company, location, description, description_preview, \
     apply_url, source, remote_ok, posted_at, created_at, updated_at";

const UPSERT_SQL: &str = "INSERT INTO jobs (id, title, company, location, description, \
     description_preview, apply_url, source, remote_ok, posted_at, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
     ON CONFLICT(id) DO UPDATE SET \
       title = excluded.title, \
       company = excluded.company, \
       location = excluded.location, \
       description = excluded.description, \
       description_preview = excluded.description_preview, \
       apply_url = excluded.apply_url, \
       source = excluded.source, \
       remote_ok = excluded.remote_ok, \
       posted_at = excluded.posted_at, \
       updated_at = excluded.updated_at";

/// SQLite job store
pub struct SqliteJobStore {
    conn: Connection,
}

impl SqliteJobStore {
    /// Opens (or creates) the job database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteJobStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Current time at the precision stored in the database
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("bad timestamp '{}': {}", raw, e)))
}

/// Writes one record on `conn`, which may be a transaction
fn upsert_on(conn: &Connection, record: &JobRecord) -> StorageResult<()> {
    let existing: Option<(String, String)> = conn
        .query_row(
            "SELECT created_at, updated_at FROM jobs WHERE id = ?1",
            params![record.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let now = now_micros();
    let (created_at, updated_at) = match existing {
        Some((created, updated)) => {
            let previous = parse_timestamp(&updated)?;
            (created, next_updated_at(now, Some(previous)))
        }
        None => (format_timestamp(&now), now),
    };

    conn.execute(
        UPSERT_SQL,
        params![
            record.id,
            record.title,
            record.company,
            record.location,
            record.description,
            record.description_preview,
            record.apply_url,
            record.source,
            record.remote_ok,
            format_timestamp(&record.posted_at),
            created_at,
            format_timestamp(&updated_at),
        ],
    )?;
    Ok(())
}

struct RawRow {
    record: JobRecord,
    posted_at: String,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        record: JobRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            location: row.get(3)?,
            description: row.get(4)?,
            description_preview: row.get(5)?,
            apply_url: row.get(6)?,
            source: row.get(7)?,
            remote_ok: row.get(8)?,
            posted_at: DateTime::<Utc>::MIN_UTC,
        },
        posted_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl TryFrom<RawRow> for StoredJob {
    type Error = StorageError;

    fn try_from(raw: RawRow) -> StorageResult<Self> {
        let mut record = raw.record;
        record.posted_at = parse_timestamp(&raw.posted_at)?;
        Ok(StoredJob {
            record,
            created_at: parse_timestamp(&raw.created_at)?,
            updated_at: parse_timestamp(&raw.updated_at)?,
        })
    }
}

impl JobStore for SqliteJobStore {
    fn upsert(&mut self, record: &JobRecord) -> StorageResult<()> {
        upsert_on(&self.conn, record)
    }

    fn batch_upsert(&mut self, records: &[JobRecord], max_batch_size: usize) -> StorageResult<()> {
        for chunk in records.chunks(max_batch_size.max(1)) {
            let tx = self.conn.transaction()?;
            for record in chunk {
                upsert_on(&tx, record)?;
            }
            tx.commit()?;
        }
        Ok(())
    }

    fn scan_page(&self, limit: usize, cursor: Option<&str>) -> StorageResult<ScanPage> {
        let limit = limit.max(1);
        let sql = format!(
            "SELECT {} FROM jobs WHERE id > ?1 ORDER BY id ASC LIMIT ?2",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![cursor.unwrap_or(""), limit as i64], read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let items = rows
            .into_iter()
            .map(StoredJob::try_from)
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(finish_scan(items, limit))
    }

    fn get(&self, id: &str) -> StorageResult<Option<StoredJob>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?1", SELECT_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, params![id], read_row)
            .optional()?;
        raw.map(StoredJob::try_from).transpose()
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn record(slug: &str, title: &str) -> JobRecord {
        JobRecord {
            id: format!("weworkremotely-{}", slug),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description: "Build things.".to_string(),
            description_preview: "Build things.".to_string(),
            apply_url: format!("https://weworkremotely.com/remote-jobs/{}", slug),
            source: "weworkremotely".to_string(),
            remote_ok: true,
            posted_at: now_micros(),
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = SqliteJobStore::new_in_memory().unwrap();
        let job = record("acme-rust-dev", "Rust Dev");
        store.upsert(&job).unwrap();

        let stored = store.get(&job.id).unwrap().unwrap();
        assert_eq!(stored.record, job);
        assert_eq!(stored.created_at, stored.updated_at);
        assert!(store.get("weworkremotely-missing").unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = SqliteJobStore::new_in_memory().unwrap();
        let first = record("acme-rust-dev", "Rust Dev");
        store.upsert(&first).unwrap();
        let before = store.get(&first.id).unwrap().unwrap();

        let mut second = first.clone();
        second.title = "Senior Rust Dev".to_string();
        store.upsert(&second).unwrap();
        let after = store.get(&first.id).unwrap().unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.record.title, "Senior Rust Dev");
    }

    #[test]
    fn test_batch_upsert_chunks() {
        let mut store = SqliteJobStore::new_in_memory().unwrap();
        let records: Vec<_> = (0..60)
            .map(|i| record(&format!("job-{:03}", i), "Dev"))
            .collect();

        store.batch_upsert(&records, 25).unwrap();
        assert_eq!(store.count().unwrap(), 60);

        // replaying the batch changes nothing but timestamps
        store.batch_upsert(&records, 25).unwrap();
        assert_eq!(store.count().unwrap(), 60);
    }

    #[test]
    fn test_scan_pages_through_everything() {
        let mut store = SqliteJobStore::new_in_memory().unwrap();
        let records: Vec<_> = (0..1200)
            .map(|i| record(&format!("job-{:04}", i), "Dev"))
            .collect();
        store.batch_upsert(&records, 25).unwrap();

        let mut cursor: Option<String> = None;
        let mut pages = 0;
        let mut seen = 0;
        loop {
            let page = store.scan_page(500, cursor.as_deref()).unwrap();
            pages += 1;
            seen += page.items.len();
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen, 1200);
    }

    #[test]
    fn test_scan_empty_store() {
        let store = SqliteJobStore::new_in_memory().unwrap();
        let page = store.scan_page(10, None).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_file_database_persists() {
        let file = NamedTempFile::new().unwrap();
        let job = record("acme-rust-dev", "Rust Dev");
        {
            let mut store = SqliteJobStore::new(file.path()).unwrap();
            store.upsert(&job).unwrap();
        }

        let store = SqliteJobStore::new(file.path()).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get(&job.id).unwrap().unwrap().record.title, "Rust Dev");
    }
}
