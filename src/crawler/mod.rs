//! Crawler module for listing walks and detail extraction
//!
//! This module contains the core crawling logic, including:
//! - Listing page pagination and candidate link collection
//! - Detail page extraction into job records
//! - Batched concurrent extraction with politeness pacing
//! - Buffered, requeueing persistence
//! - Overall session coordination

mod coordinator;
mod detail;
mod flush;
mod listing;
mod scheduler;

pub use coordinator::{crawl, Coordinator, CrawlRequest};
pub use detail::{has_container, has_title, parse_detail, DetailExtractor};
pub use flush::{FlushPipeline, FlushStats};
pub use listing::{extract_listing_links, listing_url, ListingPage, ListingWalker};
pub use scheduler::{effective_range, sample_delay, DetailOutcome, Pacing, Scheduler};
