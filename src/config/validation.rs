use crate::config::types::{
    Config, CrawlerConfig, DelayRange, FlushConfig, RetrySettings, SourceConfig, StorageConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

const MAX_CONCURRENCY: u32 = 32;
const MIN_NAVIGATION_TIMEOUT_MS: u64 = 1_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_delay_range("pacing.batch-delay", &config.pacing.batch_delay)?;
    validate_delay_range("pacing.page-delay", &config.pacing.page_delay)?;
    validate_retry_settings("retry.navigation", &config.retry.navigation)?;
    validate_retry_settings("retry.persistence", &config.retry.persistence)?;
    validate_flush_config(&config.flush)?;
    validate_storage_config(&config.storage)?;
    validate_source_config(&config.source)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_start_url(&config.start_url)?;

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_consecutive_no_new_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_consecutive_no_new_pages must be >= 1, got {}",
            config.max_consecutive_no_new_pages
        )));
    }

    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.navigation_timeout_ms < MIN_NAVIGATION_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= {}ms, got {}ms",
            MIN_NAVIGATION_TIMEOUT_MS, config.navigation_timeout_ms
        )));
    }

    Ok(())
}

/// Validates a listing start URL: absolute and HTTP(S)
pub fn validate_start_url(start_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start_url '{}': {}", start_url, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "start_url '{}' must use HTTP or HTTPS",
            start_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' has no host",
            start_url
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if let Some(value) = &config.override_value {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user agent override cannot be empty".to_string(),
            ));
        }
        return Ok(());
    }

    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_delay_range(name: &str, range: &DelayRange) -> Result<(), ConfigError> {
    if range.min_ms > range.max_ms {
        return Err(ConfigError::Validation(format!(
            "{}: min-ms ({}) must not exceed max-ms ({})",
            name, range.min_ms, range.max_ms
        )));
    }
    Ok(())
}

fn validate_retry_settings(name: &str, settings: &RetrySettings) -> Result<(), ConfigError> {
    if settings.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "{}: max-attempts must be >= 1, got {}",
            name, settings.max_attempts
        )));
    }
    Ok(())
}

fn validate_flush_config(config: &FlushConfig) -> Result<(), ConfigError> {
    if config.threshold < 1 {
        return Err(ConfigError::Validation(
            "flush threshold must be >= 1".to_string(),
        ));
    }

    if config.max_batch_size < 1 {
        return Err(ConfigError::Validation(
            "flush max_batch_size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.scan_page_limit < 1 {
        return Err(ConfigError::Validation(
            "scan_page_limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.tag.is_empty() || config.tag.contains(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "source tag must be a non-empty word, got '{}'",
            config.tag
        )));
    }

    if config.listing_segment.is_empty() || config.listing_segment.contains('/') {
        return Err(ConfigError::Validation(format!(
            "listing_segment must be a single path segment, got '{}'",
            config.listing_segment
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
