//! End-of-session summary

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `max_pages` listing pages were visited
    PageLimit,
    /// Too many listing pages in a row produced no new candidate
    NoNewPages,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageLimit => write!(f, "page limit reached"),
            Self::NoNewPages => write!(f, "no new jobs on consecutive pages"),
        }
    }
}

/// Counters collected over one crawl session
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlSummary {
    pub pages_visited: u32,
    /// Resolvable links seen on listing pages
    pub links_found: usize,
    /// Links that passed the filter and were not known
    pub new_candidates: usize,
    pub records_extracted: usize,
    /// Pages that turned out not to be job postings
    pub skipped_not_detail: usize,
    /// URLs whose extraction failed after retries
    pub skipped_failed: usize,
    pub records_flushed: usize,
    pub flush_calls: usize,
    pub requeues: u32,
    pub known_ids_at_start: usize,
    pub stop_reason: Option<StopReason>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub config_hash: Option<String>,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

impl CrawlSummary {
    /// Extraction rate in records per minute
    pub fn records_per_minute(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.records_extracted as f64 * 60.0 / secs
        } else {
            0.0
        }
    }
}

/// Prints a session summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Session:");
    println!("  Listing pages visited: {}", summary.pages_visited);
    if let Some(reason) = summary.stop_reason {
        println!("  Stopped because: {}", reason);
    }
    println!("  Duration: {:.1}s", summary.duration.as_secs_f64());
    if let Some(hash) = &summary.config_hash {
        println!("  Config hash: {}", hash);
    }
    println!();

    println!("Discovery:");
    println!("  Known jobs at start: {}", summary.known_ids_at_start);
    println!("  Links found: {}", summary.links_found);
    println!("  New candidates: {}", summary.new_candidates);
    println!();

    println!("Extraction:");
    println!(
        "  Records extracted: {} ({:.1}/min)",
        summary.records_extracted,
        summary.records_per_minute()
    );
    println!("  Not a job page: {}", summary.skipped_not_detail);
    println!("  Failed: {}", summary.skipped_failed);
    println!();

    println!("Persistence:");
    println!("  Records flushed: {}", summary.records_flushed);
    println!("  Flush calls: {}", summary.flush_calls);
    println!("  Requeues: {}", summary.requeues);
}
