//! JobHunter: an incremental remote-jobs harvester
//!
//! This crate walks the paginated listing pages of a remote-jobs board, extracts each
//! new posting from its detail page, and upserts the resulting records into a store
//! while staying idempotent across runs.

pub mod config;
pub mod crawler;
pub mod job;
pub mod output;
pub mod render;
pub mod retry;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for JobHunter operations
#[derive(Debug, Error)]
pub enum HunterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawling disallowed by robots.txt for {origin}")]
    PolicyDenied { origin: String },

    #[error("Rendering engine failed to start: {0}")]
    LaunchFailure(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation timeout for {url}")]
    Timeout { url: String },

    #[error("Persistence failed after {requeues} requeue cycles: {message}")]
    PersistenceFailure { requeues: u32, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

impl HunterError {
    /// Short, stable label for structured log events
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::PolicyDenied { .. } => "policy_denied",
            Self::LaunchFailure(_) => "launch_failure",
            Self::Navigation { .. } | Self::Timeout { .. } | Self::Http(_) => "navigation",
            Self::PersistenceFailure { .. } | Self::Storage(_) => "persistence",
            Self::UrlParse(_) => "url",
            Self::Io(_) => "io",
            Self::Task(_) => "task",
        }
    }

    /// Returns true if the error ends the whole session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PolicyDenied { .. }
                | Self::LaunchFailure(_)
                | Self::PersistenceFailure { .. }
                | Self::Config(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for environment variable {key}: '{value}'")]
    Environment { key: String, value: String },
}

/// Result type alias for JobHunter operations
pub type Result<T> = std::result::Result<T, HunterError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlRequest};
pub use job::{JobRecord, StoredJob};
pub use output::CrawlSummary;
pub use storage::{JobStore, MemoryJobStore, SqliteJobStore};
pub use self::url::{derive_job_id, is_candidate};
