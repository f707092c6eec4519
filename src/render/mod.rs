//! Rendering capability
//!
//! A [`Renderer`] hands out [`Tab`]s; a tab navigates to a URL and returns a [`Snapshot`] of
//! the rendered document. Everything downstream queries the snapshot HTML with `scraper`, so
//! the engine behind the trait is interchangeable:
//!
//! - [`HttpRenderer`]: plain HTTP fetch over one cookie-carrying `reqwest` client
//! - `BrowserRenderer`: headless Chromium (cargo feature `browser`)

#[cfg(feature = "browser")]
mod browser;
mod http;

#[cfg(feature = "browser")]
pub use browser::BrowserRenderer;
pub use http::{build_http_client, HttpRenderer};

use crate::config::{Config, RenderEngine};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Rendered document as seen by a tab after navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status of the main document, when the engine reports one
    pub status: Option<u16>,
    /// Serialised DOM
    pub html: String,
}

/// A rendering context that can open independent tabs
///
/// Implementations are shared across concurrent extraction tasks.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Opens a fresh tab; fails with `HunterError::LaunchFailure` if the engine is gone
    async fn open_tab(&self) -> Result<Box<dyn Tab>>;

    /// Releases engine resources at the end of a session
    async fn shutdown(&self) {}

    /// Engine name for log events
    fn name(&self) -> &'static str;
}

/// One navigation context
#[async_trait]
pub trait Tab: Send + Sync {
    /// Navigates to `url`, failing if it does not finish within `timeout`
    async fn navigate(&self, url: &Url, timeout: Duration) -> Result<Snapshot>;

    /// Re-reads the current document without navigating
    async fn snapshot(&self) -> Result<Snapshot>;

    /// Closes the tab; errors are logged, never returned
    async fn close(self: Box<Self>);
}

/// Builds the renderer selected by `[render] engine`
///
/// # Returns
///
/// * `Ok(Arc<dyn Renderer>)` - Engine ready to open tabs
/// * `Err(HunterError::LaunchFailure)` - Engine could not be started
pub async fn build_renderer(config: &Config) -> Result<Arc<dyn Renderer>> {
    match config.render.engine {
        RenderEngine::Http => Ok(Arc::new(HttpRenderer::new(config)?)),
        #[cfg(feature = "browser")]
        RenderEngine::Browser => Ok(Arc::new(BrowserRenderer::launch(config).await?)),
        #[cfg(not(feature = "browser"))]
        RenderEngine::Browser => Err(crate::HunterError::LaunchFailure(
            "browser engine requested but jobhunter was built without the `browser` feature"
                .to_string(),
        )),
    }
}
