//! Batch scheduler and politeness pacing
//!
//! This module handles:
//! - Running one batch of detail extractions as a task group, one tab per URL
//! - Randomized pauses between batches and between listing pages
//! - Integrating robots.txt crawl delays

use crate::config::{DelayRange, PacingConfig};
use crate::crawler::detail::DetailExtractor;
use crate::job::JobRecord;
use crate::render::Renderer;
use crate::retry::RetryPolicy;
use crate::{HunterError, Result};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error};
use url::Url;

/// Result of extracting one detail URL
#[derive(Debug)]
pub struct DetailOutcome {
    pub url: Url,
    pub result: Result<Option<JobRecord>>,
}

/// Runs batches of detail extractions against a shared renderer
pub struct Scheduler {
    renderer: Arc<dyn Renderer>,
    extractor: Arc<DetailExtractor>,
    retry: RetryPolicy,
}

impl Scheduler {
    pub fn new(renderer: Arc<dyn Renderer>, extractor: DetailExtractor, retry: RetryPolicy) -> Self {
        Self {
            renderer,
            extractor: Arc::new(extractor),
            retry,
        }
    }

    /// Extracts every URL of one batch concurrently
    ///
    /// Each URL gets its own task and its own tab; the tab is closed on every path. The
    /// call returns once every task has finished, with outcomes in completion order.
    pub async fn run_batch(&self, urls: Vec<Url>) -> Vec<DetailOutcome> {
        let mut tasks = JoinSet::new();
        let mut pending: HashSet<Url> = HashSet::new();

        for url in urls {
            if !pending.insert(url.clone()) {
                continue;
            }
            let renderer = Arc::clone(&self.renderer);
            let extractor = Arc::clone(&self.extractor);
            let retry = self.retry;

            tasks.spawn(async move {
                let result = extract_in_new_tab(renderer, extractor, retry, &url).await;
                DetailOutcome { url, result }
            });
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    pending.remove(&outcome.url);
                    outcomes.push(outcome);
                }
                Err(e) => error!(error = %e, "Extraction task did not complete"),
            }
        }

        // Whatever is left belongs to a task that panicked or was cancelled
        for url in pending {
            outcomes.push(DetailOutcome {
                url,
                result: Err(HunterError::Task("extraction task aborted".to_string())),
            });
        }

        outcomes
    }
}

async fn extract_in_new_tab(
    renderer: Arc<dyn Renderer>,
    extractor: Arc<DetailExtractor>,
    retry: RetryPolicy,
    url: &Url,
) -> Result<Option<JobRecord>> {
    let tab = renderer.open_tab().await?;
    let result = retry
        .run("detail", || extractor.extract(tab.as_ref(), url))
        .await;
    tab.close().await;
    result
}

/// Randomized politeness delays
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    batch_delay: DelayRange,
    page_delay: DelayRange,
}

impl Pacing {
    /// Builds the pacing ranges, raising both floors to the robots.txt crawl delay
    ///
    /// # Arguments
    ///
    /// * `config` - Configured delay ranges
    /// * `crawl_delay` - Crawl-delay from robots.txt, ignored unless honoured in config
    pub fn new(config: &PacingConfig, crawl_delay: Option<Duration>) -> Self {
        let floor = if config.honor_crawl_delay {
            crawl_delay.unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        Self {
            batch_delay: effective_range(config.batch_delay, floor),
            page_delay: effective_range(config.page_delay, floor),
        }
    }

    pub fn batch_delay(&self) -> DelayRange {
        self.batch_delay
    }

    pub fn page_delay(&self) -> DelayRange {
        self.page_delay
    }

    /// Sleeps a random duration between two batches of the same page
    pub async fn pause_between_batches(&self) {
        pause(self.batch_delay, "batch").await;
    }

    /// Sleeps a random duration between two listing pages
    pub async fn pause_between_pages(&self) {
        pause(self.page_delay, "page").await;
    }
}

/// Raises the lower bound of `range` to `floor`, keeping the range non-empty
pub fn effective_range(range: DelayRange, floor: Duration) -> DelayRange {
    let floor_ms = floor.as_millis() as u64;
    let min_ms = range.min_ms.max(floor_ms);
    DelayRange::new(min_ms, range.max_ms.max(min_ms))
}

/// Draws a delay uniformly from `range`
pub fn sample_delay(range: DelayRange) -> Duration {
    if range.max_ms <= range.min_ms {
        return Duration::from_millis(range.min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(range.min_ms..=range.max_ms))
}

async fn pause(range: DelayRange, label: &str) {
    let delay = sample_delay(range);
    if delay.is_zero() {
        return;
    }
    debug!(label, delay_ms = delay.as_millis() as u64, "Pacing");
    tokio::time::sleep(delay).await;
}
