//! Headless Chromium rendering engine
//!
//! One browser process per session; every tab is a CDP page. The CDP handler stream is
//! drained on its own task for as long as the browser lives.

use crate::config::Config;
use crate::render::{Renderer, Snapshot, Tab};
use crate::{HunterError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

pub struct BrowserRenderer {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    user_agent: String,
    accept_language: String,
}

impl BrowserRenderer {
    /// Launches Chromium with the configured window mode
    ///
    /// # Returns
    ///
    /// * `Ok(BrowserRenderer)` - Browser is running
    /// * `Err(HunterError::LaunchFailure)` - Chromium could not be found or started
    pub async fn launch(config: &Config) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if !config.render.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(HunterError::LaunchFailure)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| HunterError::LaunchFailure(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            user_agent: config.user_agent.header_value(),
            accept_language: config.render.accept_language.clone(),
        })
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn open_tab(&self) -> Result<Box<dyn Tab>> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| HunterError::LaunchFailure(format!("new page: {}", e)))?
        };

        let params = SetUserAgentOverrideParams::builder()
            .user_agent(self.user_agent.clone())
            .accept_language(self.accept_language.clone())
            .build()
            .map_err(HunterError::LaunchFailure)?;
        if let Err(e) = page.set_user_agent(params).await {
            warn!(error = %e, "Failed to override user agent on new tab");
        }

        Ok(Box::new(BrowserTab { page }))
    }

    async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!(error = %e, "Browser did not close cleanly");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "Browser process wait failed");
        }
        self.handler.abort();
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

struct BrowserTab {
    page: Page,
}

impl BrowserTab {
    async fn read(&self, requested: &Url) -> Result<Snapshot> {
        let html = self.page.content().await.map_err(|e| HunterError::Navigation {
            url: requested.to_string(),
            message: e.to_string(),
        })?;

        let url = match self.page.url().await {
            Ok(Some(current)) => Url::parse(&current).unwrap_or_else(|_| requested.clone()),
            _ => requested.clone(),
        };

        Ok(Snapshot {
            url,
            status: None,
            html,
        })
    }
}

#[async_trait]
impl Tab for BrowserTab {
    async fn navigate(&self, url: &Url, timeout: Duration) -> Result<Snapshot> {
        match tokio::time::timeout(timeout, self.page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(HunterError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(HunterError::Timeout {
                    url: url.to_string(),
                })
            }
        }
        self.read(url).await
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let current = match self.page.url().await {
            Ok(Some(current)) => Url::parse(&current).ok(),
            _ => None,
        };
        match current {
            Some(url) => self.read(&url).await,
            None => Err(HunterError::Navigation {
                url: "about:blank".to_string(),
                message: "tab has no document".to_string(),
            }),
        }
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            warn!(error = %e, "Failed to close tab");
        }
    }
}
