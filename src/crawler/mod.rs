//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML parsing and link extraction
//! - Shared rate limiting
//! - The worker pipeline and overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod rate_limiter;
mod worker;

pub use coordinator::{Coordinator, CrawlOptions};
pub use fetcher::{
    build_http_client, is_relevant_content_type, FetchError, FetchResponse, Fetcher, HttpFetcher,
    ACCEPT_HEADER,
};
pub use parser::{parse_document, DiscoveredLink, ParsedPage};
pub use rate_limiter::RateLimiter;
pub use worker::{CrawledPage, SkipReason, WorkOutcome, WorkResult};

use crate::config::Config;
use crate::output::CrawlStats;
use crate::CrawlError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl from a seed URL
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open (and optionally clear) the frontier store
/// 2. Build the HTTP fetcher
/// 3. Seed the frontier and run the worker pool until `cancel` fires
///    or the frontier stays idle
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Crawl ran and stopped
/// * `Err(CrawlError)` - Crawl could not start
pub async fn crawl(
    config: Config,
    options: CrawlOptions,
    fresh: bool,
    cancel: CancellationToken,
) -> Result<CrawlStats, CrawlError> {
    let coordinator = Coordinator::from_config(config, fresh)?;
    coordinator.crawl(options, cancel).await
}
