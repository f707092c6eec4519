//! Output module for crawl summaries and store reports
//!
//! This module handles:
//! - The per-session summary returned by a crawl
//! - Statistics over everything the job store holds

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
pub use summary::{print_summary, CrawlSummary, StopReason};
