//! Configuration module for JobHunter
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! layered with `CRAWL_*` environment overrides. Every section is optional; missing
//! values fall back to the named defaults in [`types`].
//!
//! # Example
//!
//! ```no_run
//! use jobhunter::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("jobhunter.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.crawler.max_pages);
//! ```

mod parser;
pub mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DelayRange, FlushConfig, PacingConfig, RenderConfig, RenderEngine,
    RetryConfig, RetrySettings, SourceConfig, StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
    read_config,
};
pub use validation::{validate, validate_start_url};
