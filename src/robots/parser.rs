//! Robots.txt evaluation
//!
//! Allow/disallow decisions go through the robotstxt crate's matcher; `Crawl-delay`, which
//! that matcher ignores, is read with a small group-aware scanner.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Parsed robots.txt data
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt content; empty means allow all
    content: String,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Checks if a URL is allowed for the given product token
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to check
    /// * `product_token` - The crawler's robots.txt product token (e.g. `JobHunterBot`)
    pub fn is_allowed(&self, url: &str, product_token: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product_token, url)
    }

    /// Gets the crawl delay that applies to `product_token`
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, product_token: &str) -> Option<Duration> {
        let agent = product_token.to_ascii_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut for_agent: Option<f64> = None;
        let mut for_wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // A user-agent line after any rule starts a new group
                if !in_agent_lines {
                    group.clear();
                }
                group.push(value.to_ascii_lowercase());
                in_agent_lines = true;
                continue;
            }
            in_agent_lines = false;

            if key != "crawl-delay" {
                continue;
            }
            let Ok(seconds) = value.parse::<f64>() else {
                continue;
            };
            if !seconds.is_finite() || seconds < 0.0 {
                continue;
            }

            if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                for_agent = Some(seconds);
            } else if group.iter().any(|ua| ua == "*") {
                for_wildcard = for_wildcard.or(Some(seconds));
            }
        }

        for_agent.or(for_wildcard).map(Duration::from_secs_f64)
    }
}
