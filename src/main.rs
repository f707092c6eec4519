//! JobHunter main entry point
//!
//! This is the command-line interface for the JobHunter remote-jobs harvester.

use anyhow::Context;
use clap::Parser;
use jobhunter::config::{apply_env_overrides, compute_config_hash, read_config, validate, Config};
use jobhunter::crawler::{crawl, CrawlRequest};
use jobhunter::output::{load_statistics, print_statistics, print_summary};
use jobhunter::storage::{open_storage, MemoryJobStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// JobHunter: an incremental remote-jobs harvester
///
/// JobHunter walks the paginated listing of a remote-jobs board, extracts every
/// posting it has not stored yet, and upserts the records into a SQLite database.
/// Runs are idempotent: re-running only visits jobs that are new.
#[derive(Parser, Debug)]
#[command(name = "jobhunter")]
#[command(version)]
#[command(about = "An incremental remote-jobs harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Listing URL to start from
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,

    /// Maximum number of listing pages to visit
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Stop after this many consecutive listing pages without new jobs
    #[arg(long, value_name = "N")]
    max_no_new_pages: Option<u32>,

    /// Detail pages extracted concurrently per batch
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Path to the SQLite job database
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl into an in-memory store instead of the database
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Print the summary or statistics as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_configuration(&cli)?;

    if cli.stats {
        handle_stats(&config, cli.json)
    } else {
        handle_crawl(config, config_hash, cli.dry_run, cli.json).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("jobhunter=info,warn"),
            1 => EnvFilter::new("jobhunter=debug,info"),
            2 => EnvFilter::new("jobhunter=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the effective configuration: file or defaults, then environment, then flags
fn load_configuration(cli: &Cli) -> anyhow::Result<(Config, Option<String>)> {
    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let config = read_config(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            let hash = compute_config_hash(path)?;
            tracing::info!("Configuration loaded (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (Config::default(), None)
        }
    };

    apply_env_overrides(&mut config, std::env::vars())?;

    if let Some(start_url) = &cli.start_url {
        config.crawler.start_url = start_url.clone();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(max_no_new) = cli.max_no_new_pages {
        config.crawler.max_consecutive_no_new_pages = max_no_new;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }
    if let Some(database) = &cli.database {
        config.storage.database_path = database.display().to_string();
    }

    validate(&config).context("invalid configuration")?;
    Ok((config, config_hash))
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&store, config.storage.scan_page_limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Database: {}\n", config.storage.database_path);
        print_statistics(&stats);
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: Option<String>,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let request = CrawlRequest::from_config(&config)?;

    let result = if dry_run {
        tracing::info!("Dry run: records are kept in memory only");
        crawl(config, request, MemoryJobStore::new()).await
    } else {
        let store = open_storage(Path::new(&config.storage.database_path))?;
        tracing::info!("Database: {}", config.storage.database_path);
        crawl(config, request, store).await
    };

    match result {
        Ok(mut summary) => {
            summary.config_hash = config_hash;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!();
                print_summary(&summary);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(kind = e.kind(), fatal = e.is_fatal(), "Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
