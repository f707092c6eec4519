//! URL handling module for JobHunter
//!
//! This module provides link resolution, the detail-page link filter and the
//! mapping from a detail URL to a stable job id.

mod filter;

use url::Url;

pub use filter::{is_candidate, LinkFilter};

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links (same page anchors)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url)
        }
        _ => None,
    }
}

/// Returns the last non-empty path segment of a URL, if any
pub fn last_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.filter(|s| !s.is_empty()).last()
}

/// Derives the job id for a detail URL
///
/// The id is `<source>-<last non-empty path segment>`; when the URL has no path segment
/// the whole URL string is used as the suffix. Identical URLs always give identical ids.
///
/// # Examples
///
/// ```
/// use jobhunter::url::derive_job_id;
/// use url::Url;
///
/// let url = Url::parse("https://weworkremotely.com/remote-jobs/acme-rust-engineer").unwrap();
/// assert_eq!(derive_job_id("weworkremotely", &url), "weworkremotely-acme-rust-engineer");
/// ```
pub fn derive_job_id(source: &str, url: &Url) -> String {
    match last_path_segment(url) {
        Some(segment) => format!("{}-{}", source, segment),
        None => format!("{}-{}", source, url.as_str()),
    }
}
