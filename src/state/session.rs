//! Per-session dedup and termination bookkeeping
//!
//! Only the coordinator's control flow touches this state; extraction tasks hand their
//! results back instead of mutating it.

use crate::job::JobRecord;
use crate::retry::RetryPolicy;
use crate::storage::{JobStore, StorageError};
use crate::url::derive_job_id;
use std::collections::HashSet;
use std::future;
use tracing::{debug, info};
use url::Url;

/// What the coordinator should do after a listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageVerdict {
    /// Visit the next listing page
    Continue,
    /// Too many pages in a row produced nothing new
    Exhausted,
    /// `max_pages` listing pages have been visited
    PageLimit,
}

/// Dedup state for one crawl session
#[derive(Debug)]
pub struct SessionState {
    source: String,
    max_pages: u32,
    max_consecutive_no_new_pages: u32,
    page_index: u32,
    consecutive_no_new: u32,
    seen_urls: HashSet<String>,
    known_ids: HashSet<String>,
}

impl SessionState {
    /// Creates session state seeded with the ids already in the store
    ///
    /// # Arguments
    ///
    /// * `source` - Site tag used to derive ids
    /// * `max_pages` - Hard bound on listing pages
    /// * `max_consecutive_no_new_pages` - Streak length that ends the session
    /// * `known_ids` - Ids preloaded from the store
    pub fn new(
        source: impl Into<String>,
        max_pages: u32,
        max_consecutive_no_new_pages: u32,
        known_ids: HashSet<String>,
    ) -> Self {
        Self {
            source: source.into(),
            max_pages,
            max_consecutive_no_new_pages,
            page_index: 0,
            consecutive_no_new: 0,
            seen_urls: HashSet::new(),
            known_ids,
        }
    }

    /// Index of the listing page about to be visited
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn consecutive_no_new(&self) -> u32 {
        self.consecutive_no_new
    }

    pub fn known_id_count(&self) -> usize {
        self.known_ids.len()
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known_ids.contains(id)
    }

    /// Keeps the URLs that lead to jobs not yet stored or queued
    ///
    /// A URL is new when its id is not known, the URL itself has not been seen this session,
    /// and no earlier URL in `urls` mapped to the same id. New URLs are marked seen.
    pub fn classify(&mut self, urls: Vec<Url>) -> Vec<Url> {
        let mut ids_this_call = HashSet::new();
        let mut fresh = Vec::new();

        for url in urls {
            let id = derive_job_id(&self.source, &url);

            if self.known_ids.contains(&id) {
                debug!(url = %url, id = %id, "Skipping known job");
                continue;
            }
            if self.seen_urls.contains(url.as_str()) {
                debug!(url = %url, "Skipping URL already seen this session");
                continue;
            }
            if !ids_this_call.insert(id) {
                debug!(url = %url, "Skipping duplicate id on page");
                continue;
            }

            self.seen_urls.insert(url.to_string());
            fresh.push(url);
        }

        fresh
    }

    /// Records a produced job so later pages treat it as known
    pub fn record_produced(&mut self, record: &JobRecord) {
        self.known_ids.insert(record.id.clone());
    }

    /// Closes the current listing page
    ///
    /// # Arguments
    ///
    /// * `new_count` - Number of new candidates the page yielded
    pub fn finish_page(&mut self, new_count: usize) -> PageVerdict {
        self.page_index += 1;

        if new_count == 0 {
            self.consecutive_no_new += 1;
        } else {
            self.consecutive_no_new = 0;
        }

        if self.consecutive_no_new >= self.max_consecutive_no_new_pages {
            PageVerdict::Exhausted
        } else if self.page_index >= self.max_pages {
            PageVerdict::PageLimit
        } else {
            PageVerdict::Continue
        }
    }
}

/// Loads every stored id by walking the store's keyset pages
///
/// Each page request runs under `retry`. Returns the ids and the number of pages read.
pub async fn preload_known_ids<S>(
    store: &S,
    page_limit: usize,
    retry: &RetryPolicy,
) -> Result<(HashSet<String>, usize), StorageError>
where
    S: JobStore + ?Sized,
{
    let mut ids = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;

    loop {
        let page = retry
            .run("scan_page", || {
                future::ready(store.scan_page(page_limit, cursor.as_deref()))
            })
            .await?;
        pages += 1;
        ids.extend(page.items.into_iter().map(|job| job.record.id));

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(known_ids = ids.len(), pages, "Preloaded known job ids");
    Ok((ids, pages))
}
