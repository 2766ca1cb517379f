//! Output module for crawl statistics and reports
//!
//! This module handles:
//! - The running counters the aggregator maintains during a crawl
//! - Reading persistent statistics back from the frontier store

pub mod stats;

pub use stats::{load_report, print_report, CrawlStats, StoreReport};
