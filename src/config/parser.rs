use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

pub const ENV_START_URL: &str = "CRAWL_START_URL";
pub const ENV_USER_AGENT: &str = "CRAWL_USER_AGENT";
pub const ENV_MAX_PAGES: &str = "CRAWL_MAX_PAGES";
pub const ENV_MAX_NO_NEW_PAGES: &str = "CRAWL_MAX_NO_NEW_PAGES";
pub const ENV_CONCURRENCY: &str = "CRAWL_CONCURRENCY";
pub const ENV_HEADLESS: &str = "CRAWL_HEADLESS";
pub const ENV_NAV_TIMEOUT_MS: &str = "CRAWL_NAV_TIMEOUT_MS";
pub const ENV_DATABASE_PATH: &str = "CRAWL_DATABASE_PATH";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use jobhunter::config::load_config;
///
/// let config = load_config(Path::new("jobhunter.toml")).unwrap();
/// println!("Max pages: {}", config.crawler.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = read_config(path)?;
    validate(&config)?;
    Ok(config)
}

/// Reads and parses a configuration file without validating it
///
/// Used when environment or command-line overrides are applied before validation.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses TOML configuration content; missing sections fall back to their defaults
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at startup and reported in the crawl summary, so two runs can be
/// told apart when their settings differ.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Applies `CRAWL_*` environment overrides on top of a parsed configuration
///
/// Variables that are not recognized are ignored. A recognized variable with a value that
/// does not parse is reported as [`ConfigError::Environment`].
///
/// # Example
///
/// ```
/// use jobhunter::config::{apply_env_overrides, Config};
///
/// let mut config = Config::default();
/// apply_env_overrides(&mut config, std::env::vars()).unwrap();
/// ```
pub fn apply_env_overrides<I>(config: &mut Config, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        match key.as_str() {
            ENV_START_URL => config.crawler.start_url = value,
            ENV_USER_AGENT => config.user_agent.override_value = Some(value),
            ENV_MAX_PAGES => config.crawler.max_pages = parse_env(&key, &value)?,
            ENV_MAX_NO_NEW_PAGES => {
                config.crawler.max_consecutive_no_new_pages = parse_env(&key, &value)?
            }
            ENV_CONCURRENCY => config.crawler.concurrency = parse_env(&key, &value)?,
            ENV_HEADLESS => config.render.headless = parse_bool_env(&key, &value)?,
            ENV_NAV_TIMEOUT_MS => config.crawler.navigation_timeout_ms = parse_env(&key, &value)?,
            ENV_DATABASE_PATH => config.storage.database_path = value,
            _ => {}
        }
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Environment {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool_env(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Environment {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
