//! Crawl statistics
//!
//! `CrawlStats` holds the running counters of one crawl. It is owned by the
//! aggregator task and updated only there. `StoreReport` is the persistent
//! view read back from the frontier store for `--stats`.

use crate::crawler::SkipReason;
use crate::state::FrontierStatus;
use crate::storage::{FrontierStore, StorageResult};
use std::collections::HashMap;
use std::time::Duration;

/// Running counters for a single crawl
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStats {
    pub pages_processed: u64,
    pub pages_skipped: u64,
    pub errors: u64,
    pub total_size_bytes: u64,
    /// Sum of per-page fetch latency
    pub total_load_time: Duration,
    /// Running mean of per-page fetch latency
    pub average_load_time: Duration,
    /// Skips broken down by reason
    pub skipped_by_reason: HashMap<SkipReason, u64>,
    /// Wall time of the crawl, set when it finishes
    pub duration: Duration,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for a persisted page
    pub fn record_page(&mut self, size_bytes: u64, load_time: Duration) {
        self.pages_processed += 1;
        self.total_size_bytes += size_bytes;
        self.total_load_time += load_time;
        let mean_nanos = self.total_load_time.as_nanos() / u128::from(self.pages_processed);
        self.average_load_time =
            Duration::from_nanos(u64::try_from(mean_nanos).unwrap_or(u64::MAX));
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        self.pages_skipped += 1;
        *self.skipped_by_reason.entry(reason).or_insert(0) += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Pages processed per second of elapsed time
    pub fn pages_per_second(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages_processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Prints a final summary to stdout
    pub fn print_summary(&self) {
        println!("=== Crawl Summary ===\n");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Pages processed: {}", self.pages_processed);
        println!("  Pages skipped: {}", self.pages_skipped);

        let mut reasons: Vec<_> = self.skipped_by_reason.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1));
        for (reason, count) in reasons {
            println!("    {}: {}", reason, count);
        }

        println!("  Errors: {}", self.errors);
        println!("  Total size: {} bytes", self.total_size_bytes);
        println!(
            "  Average load time: {}ms",
            self.average_load_time.as_millis()
        );
        println!(
            "  Throughput: {:.2} pages/sec",
            self.pages_per_second(self.duration)
        );
    }
}

/// Persistent crawl statistics read from the store
#[derive(Debug, Clone)]
pub struct StoreReport {
    /// Frontier entries by status
    pub queue_by_status: HashMap<FrontierStatus, u64>,

    /// Total number of stored pages
    pub total_pages: u64,

    /// Total number of stored link edges
    pub total_links: u64,

    /// Mean importance over stored pages
    pub average_importance: f64,

    /// Mean content quality over stored pages
    pub average_quality: f64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The frontier store to query
///
/// # Returns
///
/// * `Ok(StoreReport)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_report(store: &dyn FrontierStore) -> StorageResult<StoreReport> {
    let mut queue_by_status = HashMap::new();
    for status in FrontierStatus::all_states() {
        let count = store.count_by_status(status)?;
        if count > 0 {
            queue_by_status.insert(status, count);
        }
    }

    let (average_importance, average_quality) = store.average_scores()?;

    Ok(StoreReport {
        queue_by_status,
        total_pages: store.count_pages()?,
        total_links: store.count_links()?,
        average_importance,
        average_quality,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_report(report: &StoreReport) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages stored: {}", report.total_pages);
    println!("  Links recorded: {}", report.total_links);
    println!("  Average importance: {:.2}", report.average_importance);
    println!("  Average content quality: {:.2}", report.average_quality);
    println!();

    let queued: u64 = report.queue_by_status.values().sum();
    println!("Frontier by Status:");
    // Sort states by count (descending)
    let mut state_counts: Vec<_> = report.queue_by_status.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (status, count) in state_counts {
        let percentage = if queued > 0 {
            (*count as f64 / queued as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
}
