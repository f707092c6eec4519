//! Job records and field normalisation
//!
//! A [`JobRecord`] is what the detail extractor produces; a [`StoredJob`] is the same
//! record as it comes back from the store, with its persistence timestamps.

pub mod text;

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::url::derive_job_id;

static REMOTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)remote").expect("hardcoded regex pattern is valid"));

/// Returns true if `text` mentions remote work, case-insensitively
pub fn mentions_remote(text: &str) -> bool {
    REMOTE_PATTERN.is_match(text)
}

/// One extracted job posting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// `<source>-<slug>`, stable for a given detail URL
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    /// Normalised text, at most 1000 characters plus the truncation marker
    pub description: String,
    /// First 200 characters of `description`
    pub description_preview: String,
    /// The detail URL that was requested
    pub apply_url: String,
    pub source: String,
    pub remote_ok: bool,
    /// Extraction time
    pub posted_at: DateTime<Utc>,
}

/// Raw field values scraped from a detail page, before normalisation
#[derive(Debug, Clone, Default)]
pub struct ExtractedFields {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
}

impl JobRecord {
    /// Builds a record from raw scraped fields
    ///
    /// # Arguments
    ///
    /// * `source` - Site tag, also the id prefix
    /// * `url` - Detail URL that was requested
    /// * `fields` - Raw values scraped from the page
    /// * `posted_at` - Extraction time
    pub fn from_fields(
        source: &str,
        url: &Url,
        fields: ExtractedFields,
        posted_at: DateTime<Utc>,
    ) -> Self {
        let title = text::normalize(&fields.title);
        let company = text::normalize(&fields.company);
        let mut location = text::normalize(&fields.location);

        if location.is_empty() && (mentions_remote(&title) || mentions_remote(&company)) {
            location = "Remote".to_string();
        }

        let (description, description_preview) = text::description_and_preview(&fields.description);
        let remote_ok = mentions_remote(&format!("{} {}", location, title));

        Self {
            id: derive_job_id(source, url),
            title,
            company,
            location,
            description,
            description_preview,
            apply_url: url.to_string(),
            source: source.to_string(),
            remote_ok,
            posted_at,
        }
    }
}

/// A job record as persisted, with its bookkeeping timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJob {
    pub record: JobRecord,
    /// Set once, at the first successful write
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful write
    pub updated_at: DateTime<Utc>,
}

impl StoredJob {
    pub fn id(&self) -> &str {
        &self.record.id
    }
}
