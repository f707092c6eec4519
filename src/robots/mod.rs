//! Robots.txt handling module
//!
//! The policy gate runs once per session, before any listing page is requested. It is
//! fail-open: a robots.txt that cannot be fetched never blocks the crawl.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Upper bound on the robots.txt request
pub const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of the policy gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDecision {
    /// Whether the origin may be crawled at all
    pub allowed: bool,
    /// Declared `Crawl-delay` for this crawler, if any
    pub crawl_delay: Option<Duration>,
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            crawl_delay: None,
        }
    }
}

/// Fetches robots.txt for an origin
///
/// # Returns
///
/// * `Some(ParsedRobots)` - robots.txt was served with a 2xx status
/// * `None` - Fetch failed or the status was not 2xx
pub async fn fetch_robots(client: &Client, origin: &Url) -> Option<ParsedRobots> {
    let robots_url = origin.join("/robots.txt").ok()?;

    let response = match client
        .get(robots_url.clone())
        .timeout(ROBOTS_FETCH_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %robots_url, error = %e, "robots.txt fetch failed, allowing crawl");
            return None;
        }
    };

    if !response.status().is_success() {
        debug!(url = %robots_url, status = response.status().as_u16(), "No robots.txt");
        return None;
    }

    match response.text().await {
        Ok(body) => Some(ParsedRobots::from_content(&body)),
        Err(e) => {
            warn!(url = %robots_url, error = %e, "robots.txt body unreadable, allowing crawl");
            None
        }
    }
}

/// Decides whether the crawler may visit `origin`
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's User-Agent
/// * `origin` - Any URL on the site; only its scheme, host and port are used
/// * `product_token` - Name matched against `User-agent` lines
pub async fn check_policy(client: &Client, origin: &Url, product_token: &str) -> PolicyDecision {
    let robots = match fetch_robots(client, origin).await {
        Some(robots) => robots,
        None => return PolicyDecision::allow(),
    };

    let root = match origin.join("/") {
        Ok(root) => root,
        Err(_) => return PolicyDecision::allow(),
    };

    let decision = PolicyDecision {
        allowed: robots.is_allowed(root.as_str(), product_token),
        crawl_delay: robots.crawl_delay(product_token),
    };

    info!(
        origin = %root,
        allowed = decision.allowed,
        crawl_delay_ms = decision.crawl_delay.map(|d| d.as_millis() as u64),
        "robots.txt evaluated"
    );
    decision
}
