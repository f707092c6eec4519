use crate::config::SourceConfig;
use url::Url;

/// Decides which discovered links point at job detail pages
///
/// # Rules
///
/// A link is a candidate when all of the following hold:
///
/// 1. It resolves to an absolute URL against the base
/// 2. Its path contains the listings segment (`/remote-jobs/`)
/// 3. It has no query string and no fragment
/// 4. No path segment is one of the excluded segments (`new`, `all-jobs`, `search`)
/// 5. At least one segment follows the listings segment
/// 6. Its last non-empty path segment contains a hyphen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFilter {
    listing_segment: String,
    excluded_segments: Vec<String>,
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::from_source(&SourceConfig::default())
    }
}

impl LinkFilter {
    pub fn new(listing_segment: impl Into<String>, excluded_segments: Vec<String>) -> Self {
        Self {
            listing_segment: listing_segment.into(),
            excluded_segments,
        }
    }

    pub fn from_source(source: &SourceConfig) -> Self {
        Self::new(
            source.listing_segment.clone(),
            source.excluded_segments.clone(),
        )
    }

    /// Returns true if `raw` looks like a job detail page
    ///
    /// # Arguments
    ///
    /// * `raw` - The link as found on the page, absolute or relative
    /// * `base` - URL the relative form is resolved against
    pub fn is_candidate(&self, raw: &str, base: &Url) -> bool {
        match base.join(raw.trim()) {
            Ok(url) => self.accepts(&url),
            Err(_) => false,
        }
    }

    /// Applies the rules to an already-resolved URL
    pub fn accepts(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let marker = format!("/{}/", self.listing_segment);
        if !url.path().contains(&marker) {
            return false;
        }

        // "?" with nothing after it counts as no query
        if url.query().map_or(false, |q| !q.is_empty()) || url.fragment().is_some() {
            return false;
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        if segments
            .iter()
            .any(|seg| self.excluded_segments.iter().any(|ex| ex == seg))
        {
            return false;
        }

        // the listings index itself ends on the listings segment
        match segments.last() {
            Some(last) if *last != self.listing_segment => last.contains('-'),
            _ => false,
        }
    }
}

/// Checks a link against the default filter
///
/// # Examples
///
/// ```
/// use jobhunter::url::is_candidate;
/// use url::Url;
///
/// let base = Url::parse("https://weworkremotely.com/").unwrap();
/// assert!(is_candidate("/remote-jobs/acme-rust-engineer", &base));
/// assert!(!is_candidate("/remote-jobs/search?term=rust", &base));
/// ```
pub fn is_candidate(raw: &str, base: &Url) -> bool {
    LinkFilter::default().is_candidate(raw, base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://weworkremotely.com/").unwrap()
    }

    #[test]
    fn test_detail_page_accepted() {
        assert!(is_candidate("/remote-jobs/123-a-job-title", &base()));
        assert!(is_candidate(
            "https://weworkremotely.com/remote-jobs/acme-senior-rust-engineer",
            &base()
        ));
    }

    #[test]
    fn test_trailing_slash_uses_last_non_empty_segment() {
        assert!(is_candidate("/remote-jobs/acme-backend-dev/", &base()));
    }

    #[test]
    fn test_search_with_query_rejected() {
        assert!(!is_candidate("/remote-jobs/search?term=rust", &base()));
    }

    #[test]
    fn test_excluded_segments_rejected() {
        assert!(!is_candidate("/remote-jobs/new", &base()));
        assert!(!is_candidate("/remote-jobs/all-jobs", &base()));
        assert!(!is_candidate("/remote-jobs/new/some-job-title", &base()));
    }

    #[test]
    fn test_excluded_segment_matched_exactly() {
        // "new" inside a slug is not the excluded segment
        assert!(is_candidate("/remote-jobs/brand-new-role", &base()));
    }

    #[test]
    fn test_fragment_rejected() {
        assert!(!is_candidate("/remote-jobs/acme-engineer#apply", &base()));
    }

    #[test]
    fn test_empty_query_is_not_a_query() {
        assert!(is_candidate("/remote-jobs/acme-engineer?", &base()));
    }

    #[test]
    fn test_last_segment_requires_hyphen() {
        assert!(!is_candidate("/remote-jobs/12345", &base()));
        assert!(!is_candidate("/remote-jobs/", &base()));
    }

    #[test]
    fn test_listing_index_rejected() {
        assert!(!is_candidate("/remote-jobs", &base()));
        assert!(!is_candidate("/remote-jobs/", &base()));
        assert!(!is_candidate("https://weworkremotely.com/remote-jobs/", &base()));
        assert!(!is_candidate("/remote-jobs/?", &base()));
        // a job page under the index still passes with its trailing slash
        assert!(is_candidate("/remote-jobs/acme-dev/", &base()));
    }

    #[test]
    fn test_custom_listing_index_rejected() {
        let filter = LinkFilter::new("remote-roles", Vec::new());
        assert!(!filter.is_candidate("/remote-roles/", &base()));
        assert!(filter.is_candidate("/remote-roles/acme-dev", &base()));
    }

    #[test]
    fn test_other_paths_rejected() {
        assert!(!is_candidate("/categories/remote-programming-jobs", &base()));
        assert!(!is_candidate("/company/acme-corp", &base()));
        assert!(!is_candidate("mailto:jobs@acme-corp.com", &base()));
    }

    #[test]
    fn test_custom_filter() {
        let filter = LinkFilter::new("jobs", vec!["archive".to_string()]);
        assert!(filter.is_candidate("/jobs/rust-engineer", &base()));
        assert!(!filter.is_candidate("/jobs/archive/rust-engineer", &base()));
        assert!(!filter.is_candidate("/remote-jobs/rust-engineer", &base()));
    }
}
