//! Statistics over the job store
//!
//! Walks the store with keyset scans and prints an overview of what has been
//! collected so far.

use crate::storage::JobStore;
use crate::HunterError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Job store statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStatistics {
    /// Number of stored records
    pub total_jobs: u64,

    /// Count of records per source tag
    pub jobs_by_source: BTreeMap<String, u64>,

    /// Records flagged as remote
    pub remote_jobs: u64,

    /// Records seen on more than one run
    pub updated_jobs: u64,

    /// Most recent `posted_at` across all records
    pub newest_posted_at: Option<DateTime<Utc>>,
    pub newest_created_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The job store to scan
/// * `page_limit` - Records per scan page
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(HunterError)` - A scan page could not be read
pub fn load_statistics<S>(store: &S, page_limit: usize) -> Result<StoreStatistics, HunterError>
where
    S: JobStore + ?Sized,
{
    let mut stats = StoreStatistics::default();
    let mut cursor: Option<String> = None;

    loop {
        let page = store.scan_page(page_limit, cursor.as_deref())?;

        for job in &page.items {
            stats.total_jobs += 1;
            *stats
                .jobs_by_source
                .entry(job.record.source.clone())
                .or_insert(0) += 1;
            if job.record.remote_ok {
                stats.remote_jobs += 1;
            }
            if job.updated_at > job.created_at {
                stats.updated_jobs += 1;
            }
            stats.newest_posted_at = stats.newest_posted_at.max(Some(job.record.posted_at));
            stats.newest_created_at = stats.newest_created_at.max(Some(job.created_at));
            stats.last_updated_at = stats.last_updated_at.max(Some(job.updated_at));
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Job Store Statistics ===\n");

    println!("Overview:");
    println!("  Total jobs: {}", stats.total_jobs);
    println!("  Seen on more than one run: {}", stats.updated_jobs);
    if let Some(posted) = stats.newest_posted_at {
        println!("  Newest posting: {}", posted.to_rfc3339());
    }
    if let Some(created) = stats.newest_created_at {
        println!("  Newest in store: {}", created.to_rfc3339());
    }
    if let Some(updated) = stats.last_updated_at {
        println!("  Last update: {}", updated.to_rfc3339());
    }
    println!();

    if !stats.jobs_by_source.is_empty() {
        println!("Jobs by Source:");
        let mut source_counts: Vec<_> = stats.jobs_by_source.iter().collect();
        source_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (source, count) in source_counts {
            println!("  {}: {}", source, count);
        }
        println!();
    }

    let remote_rate = if stats.total_jobs > 0 {
        (stats.remote_jobs as f64 / stats.total_jobs as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Remote: {:.1}% ({} / {} jobs)",
        remote_rate, stats.remote_jobs, stats.total_jobs
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{ExtractedFields, JobRecord};
    use crate::storage::MemoryJobStore;
    use url::Url;

    fn record(source: &str, slug: &str, location: &str) -> JobRecord {
        let url = Url::parse(&format!("https://example.com/remote-jobs/{}", slug)).unwrap();
        JobRecord::from_fields(
            source,
            &url,
            ExtractedFields {
                title: "Engineer".to_string(),
                company: "Acme".to_string(),
                location: location.to_string(),
                description: String::new(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_statistics_span_scan_pages() {
        let mut store = MemoryJobStore::new();
        for n in 0..7 {
            store
                .upsert(&record("weworkremotely", &format!("acme-{}", n), "Remote"))
                .unwrap();
        }
        store.upsert(&record("remoteok", "globex-1", "Berlin")).unwrap();
        // second sighting of an existing job
        store
            .upsert(&record("weworkremotely", "acme-0", "Remote"))
            .unwrap();

        let stats = load_statistics(&store, 3).unwrap();
        assert_eq!(stats.total_jobs, 8);
        assert_eq!(stats.jobs_by_source.get("weworkremotely"), Some(&7));
        assert_eq!(stats.jobs_by_source.get("remoteok"), Some(&1));
        assert_eq!(stats.updated_jobs, 1);
        assert_eq!(stats.remote_jobs, 7);
        assert!(stats.newest_posted_at.is_some());
        assert!(stats.newest_created_at.is_some());
    }

    #[test]
    fn test_statistics_of_empty_store() {
        let stats = load_statistics(&MemoryJobStore::new(), 10).unwrap();
        assert_eq!(stats.total_jobs, 0);
        assert!(stats.jobs_by_source.is_empty());
        assert!(stats.last_updated_at.is_none());
    }

    #[test]
    fn test_statistics_as_json() {
        let mut store = MemoryJobStore::new();
        store.upsert(&record("weworkremotely", "acme-1", "Remote")).unwrap();
        store.upsert(&record("remoteok", "globex-1", "Berlin")).unwrap();

        let stats = load_statistics(&store, 10).unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_jobs"], 2);
        assert_eq!(json["jobs_by_source"]["weworkremotely"], 1);
        assert_eq!(json["jobs_by_source"]["remoteok"], 1);
        assert_eq!(json["remote_jobs"], 1);
        assert!(json["newest_posted_at"].is_string());
    }
}
