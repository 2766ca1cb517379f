//! Crawler coordinator - main crawl orchestration logic
//!
//! Three concurrent roles make up a crawl:
//! - the refill loop (this task), which claims batches from the frontier
//!   store on a fixed tick and feeds the bounded work channel
//! - a fixed pool of workers, each running the per-entry pipeline
//! - a single aggregator, which persists results and owns `CrawlStats`
//!
//! Cancellation stops the refill loop, closes the work channel, waits for
//! every worker to return, and only then lets the aggregator finish.

use crate::analysis::{ContentAnalyzer, DuplicateDetector, LinkPrioritizer};
use crate::config::Config;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::parser::DiscoveredLink;
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::worker::{CrawledPage, WorkOutcome, WorkResult, Worker};
use crate::output::CrawlStats;
use crate::storage::{
    lock_store, open_storage, share, FrontierEntry, FrontierStore, LinkEdge, SharedStore,
    StorageResult,
};
use crate::url::normalize_url;
use crate::CrawlError;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Capacity of the worker -> aggregator channel
const RESULT_CHANNEL_CAPACITY: usize = 100;

/// Aggregator logs progress every this many processed pages
const PROGRESS_INTERVAL: u64 = 10;

/// Per-crawl parameters that the CLI may override
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOptions {
    pub seed_url: String,
    pub max_depth: u32,
    pub workers: usize,
}

impl CrawlOptions {
    /// Takes depth and pool size from the config
    pub fn from_config(seed_url: impl Into<String>, config: &Config) -> Self {
        Self {
            seed_url: seed_url.into(),
            max_depth: config.crawler.max_depth,
            workers: config.crawler.workers as usize,
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    store: SharedStore,
    fetcher: Arc<dyn Fetcher>,
    detector: Arc<DuplicateDetector>,
    limiter: Arc<RateLimiter>,
}

impl Coordinator {
    /// Creates a coordinator over an existing store and fetcher
    pub fn new(config: Config, store: SharedStore, fetcher: Arc<dyn Fetcher>) -> Self {
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));

        Self {
            config: Arc::new(config),
            store,
            fetcher,
            detector: Arc::new(DuplicateDetector::new()),
            limiter,
        }
    }

    /// Opens the configured database and builds the HTTP fetcher
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Whether to clear the frontier and page ledger first
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - Store unreachable or client could not be built
    pub fn from_config(config: Config, fresh: bool) -> Result<Self, CrawlError> {
        let mut storage = open_storage(Path::new(&config.output.database_path))?;

        if fresh {
            tracing::info!("Clearing frontier and page ledger");
            storage.clear()?;
        }

        let fetcher = HttpFetcher::new(&config.user_agent)?;

        Ok(Self::new(config, share(storage), Arc::new(fetcher)))
    }

    /// Shared handle to the frontier store
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    /// Crawls from `options.seed_url` until cancelled
    ///
    /// Returns the statistics snapshot; a cancelled crawl is a normal exit.
    /// Only startup failures (bad seed URL, unreachable store) are errors.
    pub async fn crawl(
        &self,
        options: CrawlOptions,
        cancel: CancellationToken,
    ) -> Result<CrawlStats, CrawlError> {
        let started = Instant::now();
        let seed = normalize_url(&options.seed_url)?;
        let workers = options.workers.max(1);

        {
            let mut store = lock_store(&self.store)?;
            let lease = Duration::from_secs(self.config.crawler.in_flight_lease_secs);
            let recovered = store.recover_in_flight(lease)?;
            if recovered > 0 {
                tracing::info!("Recovered {} stale in-flight entries", recovered);
            }
            let reopened = store.reopen_depth_exceeded(options.max_depth)?;
            if reopened > 0 {
                tracing::info!(
                    "Reopened {} entries now within max depth {}",
                    reopened,
                    options.max_depth
                );
            }
            store.enqueue(&[FrontierEntry::seed(seed.as_str())])?;
        }

        tracing::info!(
            "Starting crawl of {} (max depth {}, {} workers)",
            seed,
            options.max_depth,
            workers
        );

        // Internal token so an idle stop does not cancel the caller's token
        let cancel = cancel.child_token();
        let outstanding = Arc::new(AtomicUsize::new(0));

        let (work_tx, work_rx) = mpsc::channel(self.config.crawler.channel_capacity.max(1));
        let (result_tx, result_rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let aggregator = tokio::spawn(aggregate(
            result_rx,
            Arc::clone(&self.store),
            Arc::clone(&outstanding),
            self.config.output.persist_links,
            started,
        ));

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|id| {
                let worker = self.worker(id);
                tokio::spawn(worker.run(
                    Arc::clone(&work_rx),
                    result_tx.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        // Workers hold the only senders; the aggregator ends when they do
        drop(result_tx);

        self.refill(&options, workers, work_tx, &outstanding, &cancel)
            .await;

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        let mut stats = match aggregator.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("Aggregator task failed: {}", e);
                CrawlStats::new()
            }
        };
        stats.duration = started.elapsed();

        tracing::info!(
            "Crawl finished in {:.2}s: {} processed, {} skipped, {} errors",
            stats.duration.as_secs_f64(),
            stats.pages_processed,
            stats.pages_skipped,
            stats.errors
        );

        Ok(stats)
    }

    fn worker(&self, id: usize) -> Worker {
        Worker {
            id,
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            detector: Arc::clone(&self.detector),
            limiter: Arc::clone(&self.limiter),
            analyzer: ContentAnalyzer::new(),
            prioritizer: LinkPrioritizer::new(),
            max_attempts: self.config.crawler.max_attempts,
        }
    }

    /// Polls the frontier on a fixed tick and feeds the work channel
    ///
    /// Returns when cancelled, or when the idle-stop threshold is reached (in
    /// which case it cancels `cancel` itself). Dropping `work_tx` on return
    /// closes the channel for the workers.
    async fn refill(
        &self,
        options: &CrawlOptions,
        workers: usize,
        work_tx: mpsc::Sender<FrontierEntry>,
        outstanding: &AtomicUsize,
        cancel: &CancellationToken,
    ) {
        let crawler = &self.config.crawler;
        let batch_size = workers * 2;
        let idle_backoff = Duration::from_millis(crawler.idle_backoff_ms);

        let mut ticker = tokio::time::interval(Duration::from_millis(crawler.refill_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut idle_polls = 0u32;

        'refill: loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let batch =
                match lock_store(&self.store).and_then(|mut store| store.next_batch(batch_size)) {
                    Ok(batch) => batch,
                    Err(e) => {
                        tracing::warn!("Failed to pull frontier batch: {}", e);
                        continue;
                    }
                };

            if batch.is_empty() {
                if crawler.idle_polls_before_stop > 0 && outstanding.load(Ordering::SeqCst) == 0 {
                    idle_polls += 1;
                    if idle_polls >= crawler.idle_polls_before_stop {
                        tracing::info!("Frontier exhausted after {} idle polls, stopping", idle_polls);
                        cancel.cancel();
                        break;
                    }
                } else {
                    idle_polls = 0;
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(idle_backoff) => {}
                }
                continue;
            }

            idle_polls = 0;
            tracing::debug!("Refill claimed {} entries", batch.len());

            for entry in batch {
                if entry.depth > options.max_depth {
                    tracing::debug!(
                        "Dropping {}: depth {} exceeds {}",
                        entry.url,
                        entry.depth,
                        options.max_depth
                    );
                    self.mark_depth_exceeded(&entry.url);
                    continue;
                }

                outstanding.fetch_add(1, Ordering::SeqCst);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        // Stays in flight until its lease expires
                        outstanding.fetch_sub(1, Ordering::SeqCst);
                        break 'refill;
                    }
                    sent = work_tx.send(entry) => {
                        if sent.is_err() {
                            tracing::warn!("Work channel closed, stopping refill");
                            break 'refill;
                        }
                    }
                }
            }
        }

        tracing::debug!("Refill loop stopped");
    }

    fn mark_depth_exceeded(&self, url: &str) {
        if let Err(e) = lock_store(&self.store).and_then(|mut store| store.mark_depth_exceeded(url))
        {
            tracing::warn!("Failed to mark {} depth-exceeded: {}", url, e);
        }
    }
}

/// Consumes worker results serially; the only writer of `CrawlStats`
async fn aggregate(
    mut results: mpsc::Receiver<WorkResult>,
    store: SharedStore,
    outstanding: Arc<AtomicUsize>,
    persist_links: bool,
    started: Instant,
) -> CrawlStats {
    let mut stats = CrawlStats::new();

    while let Some(result) = results.recv().await {
        match result.outcome {
            WorkOutcome::Page(page) => match persist(&store, &page, persist_links) {
                Ok(()) => {
                    stats.record_page(
                        page.record.size_bytes,
                        Duration::from_millis(page.record.load_time_millis),
                    );

                    if stats.pages_processed % PROGRESS_INTERVAL == 0 {
                        tracing::info!(
                            "Progress: {} processed, {} skipped, {} errors, {:.2} pages/sec",
                            stats.pages_processed,
                            stats.pages_skipped,
                            stats.errors,
                            stats.pages_per_second(started.elapsed())
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to persist {}: {}", result.entry.url, e);
                    stats.record_error();
                }
            },
            WorkOutcome::Skipped(reason) => stats.record_skip(reason),
            WorkOutcome::Failed(message) => {
                tracing::debug!("Fetch of {} failed: {}", result.entry.url, message);
                stats.record_error();
            }
        }

        // Discovered links are already in the store by now
        outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    stats
}

/// Saves the page, enqueues its children and optionally records its links
fn persist(store: &SharedStore, page: &CrawledPage, persist_links: bool) -> StorageResult<()> {
    let mut store = lock_store(store)?;

    let page_id = store.save_page(&page.record)?;
    store.enqueue(&page.discovered)?;

    if persist_links {
        store.save_links(page_id, &link_edges(page_id, &page.links))?;
    }

    Ok(())
}

fn link_edges(source_id: i64, links: &[DiscoveredLink]) -> Vec<LinkEdge> {
    links
        .iter()
        .map(|link| LinkEdge {
            source_id,
            target_id: None,
            url: link.url.clone(),
            anchor_text: link.anchor_text.clone(),
            rel: link.rel.clone(),
        })
        .collect()
}
