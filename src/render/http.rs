//! HTTP rendering engine
//!
//! Fetches documents with a single shared `reqwest` client. The client keeps a cookie
//! store, so every tab sees the cookies set by earlier navigations, the way tabs of one
//! browser context would.

use crate::config::Config;
use crate::render::{Renderer, Snapshot, Tab};
use crate::{HunterError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

/// Static renderer over plain HTTP
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// Builds the shared client from the user agent and render settings
    ///
    /// # Returns
    ///
    /// * `Ok(HttpRenderer)` - Client ready
    /// * `Err(HunterError::LaunchFailure)` - The client could not be built
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(config)
            .map_err(|e| HunterError::LaunchFailure(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

/// Builds an HTTP client with proper configuration
///
/// The User-Agent is `Name/Version (+contact)` unless overridden.
pub fn build_http_client(config: &Config) -> std::result::Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    if let Ok(value) = HeaderValue::from_str(&config.render.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }

    Client::builder()
        .user_agent(config.user_agent.header_value())
        .default_headers(headers)
        .cookie_store(true)
        .timeout(config.crawler.navigation_timeout())
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open_tab(&self) -> Result<Box<dyn Tab>> {
        Ok(Box::new(HttpTab {
            client: self.client.clone(),
            current: Mutex::new(None),
        }))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Tab of the HTTP engine; remembers the last document it loaded
struct HttpTab {
    client: Client,
    current: Mutex<Option<Snapshot>>,
}

impl HttpTab {
    async fn fetch(&self, url: &Url) -> Result<Snapshot> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        let final_url = response.url().clone();

        // Transient server-side failures are worth another attempt
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(HunterError::Navigation {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let html = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(Snapshot {
            url: final_url,
            status: Some(status.as_u16()),
            html,
        })
    }
}

fn classify_error(url: &Url, error: reqwest::Error) -> HunterError {
    if error.is_timeout() {
        HunterError::Timeout {
            url: url.to_string(),
        }
    } else {
        HunterError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl Tab for HttpTab {
    async fn navigate(&self, url: &Url, timeout: Duration) -> Result<Snapshot> {
        let snapshot = tokio::time::timeout(timeout, self.fetch(url))
            .await
            .map_err(|_| HunterError::Timeout {
                url: url.to_string(),
            })??;

        debug!(url = %url, status = ?snapshot.status, bytes = snapshot.html.len(), "Fetched document");

        if let Ok(mut current) = self.current.lock() {
            *current = Some(snapshot.clone());
        }
        Ok(snapshot)
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let current = self
            .current
            .lock()
            .map_err(|_| HunterError::Task("tab state poisoned".to_string()))?;
        current.clone().ok_or_else(|| HunterError::Navigation {
            url: "about:blank".to_string(),
            message: "tab has not navigated yet".to_string(),
        })
    }

    async fn close(self: Box<Self>) {}
}
