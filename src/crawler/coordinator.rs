//! Crawler coordinator - main session orchestration logic
//!
//! This module contains the session loop that ties the crawl together:
//! - Checking robots.txt before anything is rendered
//! - Preloading known ids from the store
//! - Walking listing pages and batching new detail URLs
//! - Buffering extracted records and draining them at the end

use crate::config::{validate_start_url, Config};
use crate::crawler::detail::DetailExtractor;
use crate::crawler::flush::{FlushPipeline, FlushStats};
use crate::crawler::listing::ListingWalker;
use crate::crawler::scheduler::{Pacing, Scheduler};
use crate::output::{CrawlSummary, StopReason};
use crate::render::{build_http_client, build_renderer, Renderer};
use crate::retry::RetryPolicy;
use crate::robots::check_policy;
use crate::state::{preload_known_ids, PageVerdict, SessionState};
use crate::storage::JobStore;
use crate::url::LinkFilter;
use crate::{ConfigError, HunterError, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Bounds of one crawl session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub start_url: Url,
    pub max_pages: u32,
    pub max_consecutive_no_new_pages: u32,
    pub concurrency: usize,
}

impl CrawlRequest {
    /// Builds a request from the `[crawler]` section of the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        validate_start_url(&config.crawler.start_url)?;
        let request = Self {
            start_url: Url::parse(&config.crawler.start_url)?,
            max_pages: config.crawler.max_pages,
            max_consecutive_no_new_pages: config.crawler.max_consecutive_no_new_pages,
            concurrency: config.crawler.concurrency as usize,
        };
        request.validate()?;
        Ok(request)
    }

    /// Checks that every bound is at least 1
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str| {
            Err(HunterError::Config(ConfigError::Validation(format!(
                "{} must be at least 1",
                field
            ))))
        };

        if self.max_pages < 1 {
            return invalid("max_pages");
        }
        if self.max_consecutive_no_new_pages < 1 {
            return invalid("max_consecutive_no_new_pages");
        }
        if self.concurrency < 1 {
            return invalid("concurrency");
        }
        Ok(())
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<S: JobStore> {
    config: Config,
    request: CrawlRequest,
    store: S,
    renderer: Arc<dyn Renderer>,
    config_hash: Option<String>,
}

impl<S: JobStore> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `request` - Session bounds
    /// * `store` - Store that receives extracted records
    /// * `renderer` - Rendering engine shared by every tab of the session
    pub fn new(config: Config, request: CrawlRequest, store: S, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            config,
            request,
            store,
            renderer,
            config_hash: None,
        }
    }

    /// Attaches the configuration hash reported in the summary
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs one crawl session to completion
    ///
    /// The renderer is shut down on every path.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The session ended on its page bound or its no-new streak
    /// * `Err(HunterError)` - A fatal error ended the session early
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let started = Instant::now();
        let mut summary = CrawlSummary {
            config_hash: self.config_hash.clone(),
            ..Default::default()
        };

        info!(
            start_url = %self.request.start_url,
            max_pages = self.request.max_pages,
            max_no_new_pages = self.request.max_consecutive_no_new_pages,
            concurrency = self.request.concurrency,
            renderer = self.renderer.name(),
            "Starting crawl session"
        );

        let result = self.run_session(&mut summary).await;
        self.renderer.shutdown().await;
        summary.duration = started.elapsed();

        match result {
            Ok(()) => {
                info!(
                    pages = summary.pages_visited,
                    extracted = summary.records_extracted,
                    flushed = summary.records_flushed,
                    failed = summary.skipped_failed,
                    stop_reason = ?summary.stop_reason,
                    duration_ms = summary.duration.as_millis() as u64,
                    "Crawl session finished"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(
                    kind = e.kind(),
                    error = %e,
                    pages = summary.pages_visited,
                    flushed = summary.records_flushed,
                    "Crawl session aborted"
                );
                Err(e)
            }
        }
    }

    async fn run_session(&mut self, summary: &mut CrawlSummary) -> Result<()> {
        let start_url = self.request.start_url.clone();
        let source = self.config.source.tag.clone();

        // Policy gate
        let client = build_http_client(&self.config)?;
        let decision = check_policy(&client, &start_url, &self.config.user_agent.product_token()).await;
        if !decision.allowed {
            return Err(HunterError::PolicyDenied {
                origin: start_url.origin().ascii_serialization(),
            });
        }
        let pacing = Pacing::new(&self.config.pacing, decision.crawl_delay);

        let navigation_retry = RetryPolicy::from(self.config.retry.navigation);
        let persistence_retry = RetryPolicy::from(self.config.retry.persistence);

        let (known_ids, _) = preload_known_ids(
            &self.store,
            self.config.storage.scan_page_limit,
            &persistence_retry,
        )
        .await?;

        let mut session = SessionState::new(
            source.clone(),
            self.request.max_pages,
            self.request.max_consecutive_no_new_pages,
            known_ids,
        );
        summary.known_ids_at_start = session.known_id_count();
        let walker = ListingWalker::new(
            start_url,
            LinkFilter::from_source(&self.config.source),
            navigation_retry,
            self.config.crawler.navigation_timeout(),
        );
        let scheduler = Scheduler::new(
            Arc::clone(&self.renderer),
            DetailExtractor::new(
                source,
                self.config.crawler.navigation_timeout(),
                self.config.crawler.title_wait(),
            ),
            navigation_retry,
        );
        let mut flush = FlushPipeline::new(&self.config.flush, persistence_retry);
        let concurrency = self.request.concurrency.max(1);

        let tab = self.renderer.open_tab().await.map_err(|e| match e {
            HunterError::LaunchFailure(_) => e,
            other => HunterError::LaunchFailure(other.to_string()),
        })?;

        let store = &mut self.store;
        let walked: Result<StopReason> = async {
            loop {
                let page_index = session.page_index();
                let page = walker.next_page(tab.as_ref(), page_index).await;
                summary.pages_visited += 1;
                summary.links_found += page.links_found;

                let fresh = session.classify(page.candidates);
                let new_count = fresh.len();
                summary.new_candidates += new_count;
                info!(
                    page = page_index,
                    url = %walker.page_url(page_index),
                    links_found = page.links_found,
                    new_candidates = new_count,
                    "Listing page visited"
                );

                let batches: Vec<Vec<Url>> = fresh.chunks(concurrency).map(<[Url]>::to_vec).collect();
                let batch_count = batches.len();

                for (batch_index, batch) in batches.into_iter().enumerate() {
                    for outcome in scheduler.run_batch(batch).await {
                        match outcome.result {
                            Ok(Some(record)) => {
                                session.record_produced(&record);
                                summary.records_extracted += 1;
                                flush.push(record, &mut *store).await?;
                            }
                            Ok(None) => {
                                summary.skipped_not_detail += 1;
                                debug!(url = %outcome.url, "Not a job detail page");
                            }
                            Err(e) => {
                                summary.skipped_failed += 1;
                                warn!(
                                    url = %outcome.url,
                                    kind = e.kind(),
                                    error = %e,
                                    "Detail extraction failed, skipping"
                                );
                            }
                        }
                    }

                    if batch_index + 1 < batch_count {
                        pacing.pause_between_batches().await;
                    }
                }

                match session.finish_page(new_count) {
                    PageVerdict::Continue => pacing.pause_between_pages().await,
                    PageVerdict::Exhausted => break Ok::<_, HunterError>(StopReason::NoNewPages),
                    PageVerdict::PageLimit => break Ok::<_, HunterError>(StopReason::PageLimit),
                }
            }
        }
        .await;
        tab.close().await;

        let stop_reason = match walked {
            Ok(reason) => reason,
            Err(e) => {
                record_flush_stats(summary, flush.stats());
                return Err(e);
            }
        };
        summary.stop_reason = Some(stop_reason);
        info!(reason = %stop_reason, pages = session.page_index(), "Listing walk finished");

        let drained = flush.drain(&mut *store).await;
        record_flush_stats(summary, flush.stats());
        drained
    }
}

fn record_flush_stats(summary: &mut CrawlSummary, stats: FlushStats) {
    summary.records_flushed = stats.records_flushed;
    summary.flush_calls = stats.flush_calls;
    summary.requeues = stats.requeues;
}

/// Runs a complete crawl session with the configured renderer
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `request` - Session bounds
/// * `store` - Store that receives extracted records
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Session completed
/// * `Err(HunterError)` - Renderer launch or a fatal session error
pub async fn crawl<S: JobStore>(config: Config, request: CrawlRequest, store: S) -> Result<CrawlSummary> {
    request.validate()?;
    let renderer = build_renderer(&config).await?;
    Coordinator::new(config, request, store, renderer).run().await
}
