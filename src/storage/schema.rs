//! Database schema definitions
//!
//! This module contains the SQL schema for the JobHunter job store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per job posting, keyed by the derived job id
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    location TEXT NOT NULL,
    description TEXT NOT NULL,
    description_preview TEXT NOT NULL,
    apply_url TEXT NOT NULL,
    source TEXT NOT NULL,
    remote_ok INTEGER NOT NULL,
    posted_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_source ON jobs(source);
CREATE INDEX IF NOT EXISTS idx_jobs_posted_at ON jobs(posted_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Schema version recorded in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;
