//! Per-entry crawl pipeline run by each pool worker
//!
//! rate limit -> ledger check -> fetch -> content-type filter -> fingerprint
//! dedup -> analysis -> link prioritization -> result

use crate::analysis::{fingerprint, ContentAnalyzer, DuplicateDetector, LinkPrioritizer};
use crate::crawler::fetcher::{is_relevant_content_type, FetchResponse, Fetcher};
use crate::crawler::parser::{parse_document, DiscoveredLink, ParsedPage};
use crate::crawler::rate_limiter::RateLimiter;
use crate::storage::{lock_store, FrontierEntry, PageRecord, SharedStore};
use crate::url::guess_content_type;
use crate::CrawlError;
use scraper::Html;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Why an entry was dropped without producing a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// A page row already exists for the URL
    AlreadyCrawled,
    /// The response's Content-Type is not analyzed
    IrrelevantContentType,
    /// The body's fingerprint was seen earlier in this process
    DuplicateContent,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyCrawled => "already_crawled",
            SkipReason::IrrelevantContentType => "irrelevant_content_type",
            SkipReason::DuplicateContent => "duplicate_content",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetched, relevant, non-duplicate page and what it leads to
#[derive(Debug, Clone)]
pub struct CrawledPage {
    pub record: PageRecord,
    /// Child entries to put back into the frontier
    pub discovered: Vec<FrontierEntry>,
    /// Outbound links as found on the page, for the link graph
    pub links: Vec<DiscoveredLink>,
}

#[derive(Debug, Clone)]
pub enum WorkOutcome {
    Page(Box<CrawledPage>),
    Skipped(SkipReason),
    Failed(String),
}

/// What a worker sends to the aggregator for one entry
#[derive(Debug, Clone)]
pub struct WorkResult {
    pub entry: FrontierEntry,
    pub outcome: WorkOutcome,
}

/// Receiving half of the work channel, shared by the whole pool
pub(crate) type WorkQueue = Arc<Mutex<mpsc::Receiver<FrontierEntry>>>;

pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) store: SharedStore,
    pub(crate) detector: Arc<DuplicateDetector>,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) analyzer: ContentAnalyzer,
    pub(crate) prioritizer: LinkPrioritizer,
    pub(crate) max_attempts: u32,
}

impl Worker {
    /// Pulls entries until the channel closes or the crawl is cancelled
    ///
    /// A fetch already under way is finished; cancellation is only observed
    /// while waiting for work or for a rate-limit token.
    pub(crate) async fn run(
        self,
        work: WorkQueue,
        results: mpsc::Sender<WorkResult>,
        cancel: CancellationToken,
    ) {
        tracing::debug!("Worker {} started", self.id);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                entry = async { work.lock().await.recv().await } => entry,
            };

            let Some(entry) = next else {
                break;
            };

            let outcome = match self.process(&entry, &cancel).await {
                Ok(outcome) => outcome,
                Err(CrawlError::Cancelled) => {
                    tracing::debug!("Worker {} cancelled before fetching {}", self.id, entry.url);
                    break;
                }
                Err(e) => WorkOutcome::Failed(e.to_string()),
            };

            let url = entry.url.clone();
            let failed = matches!(outcome, WorkOutcome::Failed(_));

            // A retry must be visible in the store before the aggregator
            // accounts for this entry
            if failed {
                self.record_failure(&url);
            }

            if results.send(WorkResult { entry, outcome }).await.is_err() {
                tracing::warn!("Worker {}: result channel closed", self.id);
                break;
            }

            if !failed {
                self.record_completion(&url);
            }
        }

        tracing::debug!("Worker {} stopped", self.id);
    }

    /// Runs the pipeline for one entry
    pub(crate) async fn process(
        &self,
        entry: &FrontierEntry,
        cancel: &CancellationToken,
    ) -> Result<WorkOutcome, CrawlError> {
        self.limiter.acquire(cancel).await?;

        if self.already_crawled(&entry.url) {
            tracing::debug!("Skipping {}: already crawled", entry.url);
            return Ok(WorkOutcome::Skipped(SkipReason::AlreadyCrawled));
        }

        let response = self.fetcher.fetch(&entry.url).await?;

        if !is_relevant_content_type(&response.content_type) {
            tracing::debug!(
                "Skipping {}: irrelevant content type '{}'",
                entry.url,
                response.content_type
            );
            return Ok(WorkOutcome::Skipped(SkipReason::IrrelevantContentType));
        }

        let content_hash = fingerprint(&response.body);
        if self.detector.seen(&content_hash) {
            tracing::debug!("Skipping {}: duplicate content {}", entry.url, content_hash);
            return Ok(WorkOutcome::Skipped(SkipReason::DuplicateContent));
        }

        let page = self.build_page(entry, response, content_hash);
        tracing::debug!(
            "Fetched {} ({} bytes, {} links)",
            entry.url,
            page.record.size_bytes,
            page.discovered.len()
        );

        Ok(WorkOutcome::Page(Box::new(page)))
    }

    // The parsed document is not Send, so all DOM work stays in this
    // synchronous helper
    fn build_page(
        &self,
        entry: &FrontierEntry,
        response: FetchResponse,
        content_hash: String,
    ) -> CrawledPage {
        let content = String::from_utf8_lossy(&response.body).into_owned();
        let document = Html::parse_document(&content);

        let mut context = self.analyzer.analyze(&document);
        context.content_type = guess_content_type(&entry.url).to_string();

        // Relative links resolve against where redirects actually landed
        let parsed = Url::parse(&response.final_url)
            .or_else(|_| Url::parse(&entry.url))
            .map(|base| parse_document(&document, &base))
            .unwrap_or_default();
        let ParsedPage { title, links } = parsed;

        let discovered = links
            .iter()
            .filter(|link| link.url != entry.url)
            .map(|link| {
                let priority = self.prioritizer.priority_of(
                    &link.anchor_text,
                    link.rel.as_deref(),
                    link.class.as_deref(),
                    &context,
                );
                tracing::trace!("{} -> {} priority {}", entry.url, link.url, priority);

                FrontierEntry {
                    url: link.url.clone(),
                    priority,
                    depth: entry.depth + 1,
                    parent_url: Some(entry.url.clone()),
                    context: self.prioritizer.child_context(&link.url, priority, &context),
                }
            })
            .collect();

        let record = PageRecord {
            id: None,
            url: entry.url.clone(),
            title,
            size_bytes: response.body.len() as u64,
            content,
            status_code: response.status_code,
            content_type: response.content_type,
            load_time_millis: response.elapsed.as_millis() as u64,
            depth: entry.depth,
            parent_url: entry.parent_url.clone(),
            content_hash,
            importance: context.importance,
            content_quality: context.content_quality,
            link_density: context.link_density,
        };

        CrawledPage {
            record,
            discovered,
            links,
        }
    }

    fn already_crawled(&self, url: &str) -> bool {
        match lock_store(&self.store).and_then(|store| store.is_already_crawled(url)) {
            Ok(crawled) => crawled,
            Err(e) => {
                // Fetching again is cheaper than losing the page
                tracing::warn!("Ledger check failed for {}: {}", url, e);
                false
            }
        }
    }

    fn record_completion(&self, url: &str) {
        if let Err(e) = lock_store(&self.store).and_then(|mut store| store.mark_completed(url)) {
            tracing::warn!("Failed to mark {} completed: {}", url, e);
        }
    }

    fn record_failure(&self, url: &str) {
        match lock_store(&self.store).and_then(|mut store| store.mark_failed(url, self.max_attempts))
        {
            Ok(status) => tracing::debug!("{} is now {}", url, status),
            Err(e) => tracing::warn!("Failed to record failure for {}: {}", url, e),
        }
    }
}
