//! Listing page walker
//!
//! Builds the URL of each listing page, renders it, and pulls out the links that look
//! like job detail pages.

use crate::render::Tab;
use crate::retry::RetryPolicy;
use crate::url::{resolve_link, LinkFilter};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const PAGE_PARAM: &str = "page";

static LINK_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("a[href]").ok());

/// URL of listing page `page_index` (0-based)
///
/// Page 0 is the start URL verbatim. Later pages set the `page` query parameter to
/// `first_page + page_index`, where `first_page` is the start URL's own `page` value
/// (1 when absent). Every other query pair is kept in order.
///
/// # Examples
///
/// ```
/// use jobhunter::crawler::listing_url;
/// use url::Url;
///
/// let start = Url::parse("https://weworkremotely.com/remote-jobs/search?term=rust").unwrap();
/// assert_eq!(
///     listing_url(&start, 1).as_str(),
///     "https://weworkremotely.com/remote-jobs/search?term=rust&page=2"
/// );
/// ```
pub fn listing_url(start_url: &Url, page_index: u32) -> Url {
    if page_index == 0 {
        return start_url.clone();
    }

    let mut first_page: u32 = 1;
    let mut kept: Vec<(String, String)> = Vec::new();
    for (key, value) in start_url.query_pairs() {
        if key == PAGE_PARAM {
            first_page = value.parse().unwrap_or(1);
        } else {
            kept.push((key.into_owned(), value.into_owned()));
        }
    }

    let mut url = start_url.clone();
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(PAGE_PARAM, &first_page.saturating_add(page_index).to_string());
    }
    url
}

/// Extracts candidate detail links from a rendered listing page
///
/// Links are resolved against `page_url`, deduplicated in first-seen order, and kept
/// only when `filter` accepts them.
pub fn extract_listing_links(html: &str, page_url: &Url, filter: &LinkFilter) -> (usize, Vec<Url>) {
    let Some(selector) = LINK_SELECTOR.as_ref() else {
        return (0, Vec::new());
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut total = 0;
    let mut candidates = Vec::new();

    for element in document.select(selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, page_url) else {
            continue;
        };
        total += 1;

        if !seen.insert(url.to_string()) {
            continue;
        }
        if filter.accepts(&url) {
            candidates.push(url);
        } else {
            debug!(url = %url, "Link rejected by filter");
        }
    }

    (total, candidates)
}

/// Links found on one listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Every resolvable link on the page
    pub links_found: usize,
    /// Candidates that passed the filter, first-seen order
    pub candidates: Vec<Url>,
}

/// Walks the paginated listing of one start URL
#[derive(Debug, Clone)]
pub struct ListingWalker {
    start_url: Url,
    filter: LinkFilter,
    retry: RetryPolicy,
    timeout: Duration,
}

impl ListingWalker {
    pub fn new(start_url: Url, filter: LinkFilter, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            start_url,
            filter,
            retry,
            timeout,
        }
    }

    pub fn page_url(&self, page_index: u32) -> Url {
        listing_url(&self.start_url, page_index)
    }

    /// Renders listing page `page_index` in `tab` and returns its candidates
    ///
    /// Navigation runs under the retry policy. When every attempt fails the page is
    /// logged and treated as empty.
    pub async fn next_page(&self, tab: &dyn Tab, page_index: u32) -> ListingPage {
        let url = self.page_url(page_index);

        let snapshot = match self
            .retry
            .run("listing", || tab.navigate(&url, self.timeout))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(url = %url, kind = e.kind(), error = %e, "Listing page failed, treating as empty");
                return ListingPage::default();
            }
        };

        let (links_found, candidates) =
            extract_listing_links(&snapshot.html, &snapshot.url, &self.filter);
        debug!(
            url = %url,
            links_found,
            candidates = candidates.len(),
            "Listing page parsed"
        );

        ListingPage {
            links_found,
            candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> Url {
        Url::parse("https://weworkremotely.com/remote-jobs/search?term=rust").unwrap()
    }

    #[test]
    fn test_first_page_is_start_url() {
        assert_eq!(listing_url(&start(), 0), start());
    }

    #[test]
    fn test_later_pages_append_page_param() {
        assert_eq!(
            listing_url(&start(), 2).as_str(),
            "https://weworkremotely.com/remote-jobs/search?term=rust&page=3"
        );
    }

    #[test]
    fn test_existing_page_offset_respected() {
        let start = Url::parse("https://weworkremotely.com/remote-jobs/search?page=4&term=go").unwrap();
        assert_eq!(
            listing_url(&start, 1).as_str(),
            "https://weworkremotely.com/remote-jobs/search?term=go&page=5"
        );
    }

    #[test]
    fn test_start_without_query() {
        let start = Url::parse("https://weworkremotely.com/remote-jobs").unwrap();
        assert_eq!(
            listing_url(&start, 1).as_str(),
            "https://weworkremotely.com/remote-jobs?page=2"
        );
    }

    #[test]
    fn test_extract_listing_links() {
        let html = r##"
            <html><body>
              <a href="/remote-jobs/acme-rust-engineer">Rust Engineer</a>
              <a href="/remote-jobs/acme-rust-engineer">Rust Engineer (again)</a>
              <a href="https://weworkremotely.com/remote-jobs/globex-go-developer">Go</a>
              <a href="/remote-jobs/new">Post a job</a>
              <a href="/remote-jobs/search?term=rust&page=2">Next</a>
              <a href="/categories/remote-programming-jobs">Programming</a>
              <a href="#top">Top</a>
              <a href="mailto:hi@weworkremotely.com">Mail</a>
            </body></html>
        "##;

        let (total, links) = extract_listing_links(html, &start(), &LinkFilter::default());
        assert_eq!(total, 6);
        assert_eq!(
            links,
            vec![
                Url::parse("https://weworkremotely.com/remote-jobs/acme-rust-engineer").unwrap(),
                Url::parse("https://weworkremotely.com/remote-jobs/globex-go-developer").unwrap(),
            ]
        );
    }

    #[test]
    fn test_extract_from_empty_page() {
        let (total, links) = extract_listing_links("", &start(), &LinkFilter::default());
        assert_eq!(total, 0);
        assert!(links.is_empty());
    }
}
