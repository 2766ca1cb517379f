//! Smart Crawler main entry point
//!
//! This is the command-line interface for the priority-driven crawler.

use anyhow::Context;
use clap::Parser;
use smart_crawler::config::{load_config_with_hash, Config};
use smart_crawler::crawler::{crawl, CrawlOptions};
use smart_crawler::output::{load_report, print_report};
use smart_crawler::storage::open_storage;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Smart Crawler: a priority-driven web crawler
///
/// Crawls from a seed URL, scoring each page and fetching the most promising
/// links first. The frontier lives in SQLite, so an interrupted crawl picks up
/// where it stopped.
#[derive(Parser, Debug)]
#[command(name = "smart-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A priority-driven web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL to start crawling from
    #[arg(short, long, required_unless_present = "stats")]
    url: Option<String>,

    /// Maximum crawl depth (overrides config)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Number of workers (overrides config)
    #[arg(short, long)]
    workers: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Clear the frontier and page ledger before crawling
    #[arg(long, conflicts_with = "stats")]
    fresh: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    if let Some(depth) = cli.depth {
        config.crawler.max_depth = depth;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    // Overrides go through the same checks as the file
    smart_crawler::config::validate(&config).context("Invalid command-line override")?;

    let seed = cli.url.context("--url is required to crawl")?;
    handle_crawl(config, seed, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("smart_crawler=info,warn"),
            1 => EnvFilter::new("smart_crawler=debug,info"),
            2 => EnvFilter::new("smart_crawler=trace,debug"),
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

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let report = load_report(&storage)?;
    print_report(&report);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, seed: String, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume from the stored frontier)");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, draining workers");
            on_signal.cancel();
        }
    });

    let options = CrawlOptions::from_config(seed, &config);
    let stats = crawl(config, options, fresh, cancel)
        .await
        .context("Crawl failed")?;

    stats.print_summary();
    Ok(())
}
