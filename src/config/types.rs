use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_START_URL: &str = "https://weworkremotely.com/remote-jobs/search?term=rust";
pub const DEFAULT_MAX_PAGES: u32 = 2;
pub const DEFAULT_MAX_CONSECUTIVE_NO_NEW_PAGES: u32 = 3;
pub const DEFAULT_CONCURRENCY: u32 = 3;
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_TITLE_WAIT_MS: u64 = 1_500;

pub const DEFAULT_CRAWLER_NAME: &str = "JobHunterBot";
pub const DEFAULT_CRAWLER_VERSION: &str = "1.0";
pub const DEFAULT_CONTACT_EMAIL: &str = "you@example.com";

pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

pub const DEFAULT_BATCH_DELAY_MS: (u64, u64) = (700, 1_500);
pub const DEFAULT_PAGE_DELAY_MS: (u64, u64) = (1_500, 3_000);

pub const DEFAULT_NAV_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_NAV_RETRY_BASE_MS: u64 = 500;
pub const DEFAULT_NAV_RETRY_JITTER_MS: u64 = 250;
pub const DEFAULT_STORE_RETRY_ATTEMPTS: u32 = 4;
pub const DEFAULT_STORE_RETRY_BASE_MS: u64 = 300;
pub const DEFAULT_STORE_RETRY_JITTER_MS: u64 = 200;

pub const DEFAULT_FLUSH_THRESHOLD: usize = 20;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;
pub const DEFAULT_FLUSH_COOLDOWN_MS: u64 = 5_000;
pub const DEFAULT_MAX_REQUEUES: u32 = 5;

pub const DEFAULT_DATABASE_PATH: &str = "./jobhunter.db";
pub const DEFAULT_SCAN_PAGE_LIMIT: usize = 1_000;

pub const DEFAULT_SOURCE_TAG: &str = "weworkremotely";
pub const DEFAULT_LISTING_SEGMENT: &str = "remote-jobs";
pub const DEFAULT_EXCLUDED_SEGMENTS: &[&str] = &["new", "all-jobs", "search"];

/// Main configuration structure for JobHunter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub render: RenderConfig,
    pub pacing: PacingConfig,
    pub retry: RetryConfig,
    pub flush: FlushConfig,
    pub storage: StorageConfig,
    pub source: SourceConfig,
}

/// Crawl session defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Listing URL of the first page
    pub start_url: String,

    /// Hard upper bound on listing pages per session
    pub max_pages: u32,

    /// Listing pages in a row without a new candidate before the session stops
    pub max_consecutive_no_new_pages: u32,

    /// Detail pages extracted concurrently per batch
    pub concurrency: u32,

    /// Per-attempt navigation timeout (milliseconds)
    pub navigation_timeout_ms: u64,

    /// Extra wait for a title element when no detail container is found (milliseconds)
    pub title_wait_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            max_consecutive_no_new_pages: DEFAULT_MAX_CONSECUTIVE_NO_NEW_PAGES,
            concurrency: DEFAULT_CONCURRENCY,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            title_wait_ms: DEFAULT_TITLE_WAIT_MS,
        }
    }
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn title_wait(&self) -> Duration {
        Duration::from_millis(self.title_wait_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler, also used as the robots.txt product token
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// Email address for crawler-related contact
    pub contact_email: String,

    /// Complete User-Agent header, replacing the formatted one when set
    #[serde(rename = "override")]
    pub override_value: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: DEFAULT_CRAWLER_NAME.to_string(),
            crawler_version: DEFAULT_CRAWLER_VERSION.to_string(),
            contact_email: DEFAULT_CONTACT_EMAIL.to_string(),
            override_value: None,
        }
    }
}

impl UserAgentConfig {
    /// Full header value, formatted as `Name/Version (+contact)`
    pub fn header_value(&self) -> String {
        match &self.override_value {
            Some(value) => value.clone(),
            None => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, self.contact_email
            ),
        }
    }

    /// Product token matched against robots.txt `User-agent` lines
    pub fn product_token(&self) -> String {
        let header = self.header_value();
        header
            .split(|c: char| c == '/' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Which rendering engine drives navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderEngine {
    /// Plain HTTP fetch, DOM built from the returned HTML
    Http,
    /// Headless Chromium (requires the `browser` feature)
    Browser,
}

/// Rendering engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderConfig {
    pub engine: RenderEngine,

    /// Run the browser without a window
    pub headless: bool,

    /// Accept-Language header sent with every navigation
    pub accept_language: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            engine: RenderEngine::Http,
            headless: true,
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
        }
    }
}

/// Inclusive millisecond range for randomized pauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }
}

/// Politeness pacing between batches and listing pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PacingConfig {
    pub batch_delay: DelayRange,
    pub page_delay: DelayRange,

    /// Raise the pacing floor to the robots.txt Crawl-delay when one is declared
    pub honor_crawl_delay: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            batch_delay: DelayRange::new(DEFAULT_BATCH_DELAY_MS.0, DEFAULT_BATCH_DELAY_MS.1),
            page_delay: DelayRange::new(DEFAULT_PAGE_DELAY_MS.0, DEFAULT_PAGE_DELAY_MS.1),
            honor_crawl_delay: true,
        }
    }
}

/// Parameters of one retry policy
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

/// Retry policies for navigation and persistence
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub navigation: RetrySettings,
    pub persistence: RetrySettings,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            navigation: RetrySettings {
                max_attempts: DEFAULT_NAV_RETRY_ATTEMPTS,
                base_delay_ms: DEFAULT_NAV_RETRY_BASE_MS,
                max_jitter_ms: DEFAULT_NAV_RETRY_JITTER_MS,
            },
            persistence: RetrySettings {
                max_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
                base_delay_ms: DEFAULT_STORE_RETRY_BASE_MS,
                max_jitter_ms: DEFAULT_STORE_RETRY_JITTER_MS,
            },
        }
    }
}

/// Buffered persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FlushConfig {
    /// Buffer size that triggers an automatic flush
    pub threshold: usize,

    /// Largest batch the store accepts in one write
    pub max_batch_size: usize,

    /// Pause after a chunk is requeued (milliseconds)
    pub cooldown_ms: u64,

    /// Requeue cycles allowed per session before it fails
    pub max_requeues: u32,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FLUSH_THRESHOLD,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            cooldown_ms: DEFAULT_FLUSH_COOLDOWN_MS,
            max_requeues: DEFAULT_MAX_REQUEUES,
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Page size used when scanning the store for known ids
    pub scan_page_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            scan_page_limit: DEFAULT_SCAN_PAGE_LIMIT,
        }
    }
}

/// Site-specific constants
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceConfig {
    /// Tag stored on every record and used as the id prefix
    pub tag: String,

    /// Path segment shared by all detail pages
    pub listing_segment: String,

    /// Path segments that never lead to a detail page
    pub excluded_segments: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_SOURCE_TAG.to_string(),
            listing_segment: DEFAULT_LISTING_SEGMENT.to_string(),
            excluded_segments: DEFAULT_EXCLUDED_SEGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
