//! Detail page extraction
//!
//! Turns one rendered job page into a [`JobRecord`]. All DOM work happens in plain
//! functions over the snapshot HTML, so no parsed document lives across an await.

use crate::job::{text, ExtractedFields, JobRecord};
use crate::render::Tab;
use crate::Result;
use chrono::Utc;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const CONTAINER_SELECTORS: &[&str] = &[
    ".listing-container",
    ".listing-body",
    ".lis-container",
    ".content",
    "article",
    "main",
];

const TITLE_SELECTORS: &[&str] = &[
    "h1",
    ".listing-header h1",
    ".listing-header-container h1",
    ".job-title",
];

const COMPANY_SELECTORS: &[&str] = &[".company", ".company a", ".listing-header .company"];

const LOCATION_SELECTORS: &[&str] = &[".region", ".location", ".listing-header .location"];

const HEADER_ANCHOR_SELECTORS: &[&str] = &[
    ".listing-header a",
    ".listing-header-container a",
    "header a",
];

const NOISE_TAGS: &[&str] = &["svg", "i", "img", "button"];

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

const HEADER_ANCHOR_MIN_CHARS: usize = 2;
const HEADER_ANCHOR_MAX_CHARS: usize = 80;

fn compile(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(CONTAINER_SELECTORS));
static TITLES: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(TITLE_SELECTORS));
static COMPANIES: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(COMPANY_SELECTORS));
static LOCATIONS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(LOCATION_SELECTORS));
static HEADER_ANCHORS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| compile(HEADER_ANCHOR_SELECTORS));
static COMPANY_LINKS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| compile(&[r#"a[href*="/company/"]"#]));

/// Settings for [`DetailExtractor`]
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    source: String,
    navigation_timeout: Duration,
    title_wait: Duration,
}

impl DetailExtractor {
    pub fn new(source: impl Into<String>, navigation_timeout: Duration, title_wait: Duration) -> Self {
        Self {
            source: source.into(),
            navigation_timeout,
            title_wait,
        }
    }

    /// Extracts one job from its detail page
    ///
    /// # Returns
    ///
    /// * `Ok(Some(JobRecord))` - The page is a job posting
    /// * `Ok(None)` - The page has neither a detail container nor a title
    /// * `Err(HunterError)` - Navigation failed; worth retrying
    ///
    /// A failed re-read after the title wait falls back to the first render.
    pub async fn extract(&self, tab: &dyn Tab, url: &Url) -> Result<Option<JobRecord>> {
        let mut snapshot = tab.navigate(url, self.navigation_timeout).await?;

        if !has_container(&snapshot.html) {
            // Content may still be rendering; give the title a moment to appear
            if !self.title_wait.is_zero() {
                tokio::time::sleep(self.title_wait).await;
            }
            match tab.snapshot().await {
                Ok(later) => snapshot = later,
                Err(e) => {
                    warn!(url = %url, error = %e, "Re-reading the page failed, using first render");
                }
            }
            if !has_container(&snapshot.html) && !has_title(&snapshot.html) {
                debug!(url = %url, "No detail container or title, not a detail page");
                return Ok(None);
            }
        }

        let fields = parse_detail(&snapshot.html);
        Ok(Some(JobRecord::from_fields(
            &self.source,
            url,
            fields,
            Utc::now(),
        )))
    }
}

/// Returns true if any detail container is present
pub fn has_container(html: &str) -> bool {
    let document = Html::parse_document(html);
    CONTAINERS
        .iter()
        .any(|selector| document.select(selector).next().is_some())
}

/// Returns true if any title element with text is present
pub fn has_title(html: &str) -> bool {
    let document = Html::parse_document(html);
    !first_text(&document, &TITLES).is_empty()
}

/// Scrapes raw field values from a detail page
pub fn parse_detail(html: &str) -> ExtractedFields {
    let document = Html::parse_document(html);

    let title = first_text(&document, &TITLES);
    let company = extract_company(&document);
    let location = first_text(&document, &LOCATIONS);
    let description = extract_description(&document);

    ExtractedFields {
        title,
        company,
        location,
        description,
    }
}

/// First non-empty normalised text matched by the selectors, in selector order
fn first_text(document: &Html, selectors: &[Selector]) -> String {
    selectors
        .iter()
        .flat_map(|selector| document.select(selector))
        .map(|element| text::normalize(&element.text().collect::<Vec<_>>().join(" ")))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn extract_company(document: &Html) -> String {
    let from_selectors = COMPANIES
        .iter()
        .flat_map(|selector| document.select(selector))
        .map(|element| {
            let mut parts = Vec::new();
            collect_text(element, &mut parts, is_noise);
            text::normalize(&parts.join(" "))
        })
        .find(|text| !text.is_empty());
    if let Some(company) = from_selectors {
        return company;
    }

    let from_profile_link = COMPANY_LINKS
        .iter()
        .flat_map(|selector| document.select(selector))
        .filter_map(|element| element.value().attr("href"))
        .filter_map(company_slug)
        .map(|slug| text::title_case_slug(&slug))
        .find(|name| !name.is_empty());
    if let Some(company) = from_profile_link {
        return company;
    }

    HEADER_ANCHORS
        .iter()
        .flat_map(|selector| document.select(selector))
        .map(|element| text::normalize(&element.text().collect::<Vec<_>>().join(" ")))
        .find(|text| {
            let len = text.chars().count();
            (HEADER_ANCHOR_MIN_CHARS..=HEADER_ANCHOR_MAX_CHARS).contains(&len)
                && !text.to_lowercase().contains("apply")
        })
        .unwrap_or_default()
}

/// Slug following `/company/` in an href
fn company_slug(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next()?;
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == "company")?;
    segments.next().map(str::to_string)
}

fn is_hidden(element: &ElementRef<'_>) -> bool {
    HIDDEN_TAGS.contains(&element.value().name())
}

fn is_noise(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if is_hidden(element) || NOISE_TAGS.contains(&value.name()) {
        return true;
    }
    value
        .classes()
        .any(|class| class == "icon" || class.to_ascii_lowercase().contains("apply"))
}

/// Collects text under `element`, leaving out every subtree `skip` matches
fn collect_text(
    element: ElementRef<'_>,
    parts: &mut Vec<String>,
    skip: fn(&ElementRef<'_>) -> bool,
) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => parts.push(text.to_string()),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if !skip(&child_element) {
                        collect_text(child_element, parts, skip);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Visible text of the first non-empty container; scripts and styles are left out
fn extract_description(document: &Html) -> String {
    CONTAINERS
        .iter()
        .flat_map(|selector| document.select(selector))
        .map(|element| {
            let mut parts = Vec::new();
            collect_text(element, &mut parts, is_hidden);
            parts.join(" ")
        })
        .find(|text| !text.trim().is_empty())
        .unwrap_or_default()
}
