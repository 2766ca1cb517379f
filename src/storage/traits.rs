//! Storage traits and error types
//!
//! This module defines the frontier store contract consumed by the crawl
//! coordinator and the associated error types.

use crate::state::FrontierStatus;
use crate::storage::{FrontierEntry, LinkEdge, PageRecord, QueueRecord};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue entry not found: {0}")]
    EntryNotFound(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable priority queue of pending URLs plus the crawled-page ledger
///
/// Status transitions are store-side compare-and-set operations, so the same
/// database can be shared by several crawler processes without handing a URL
/// to two workers while it is in flight.
pub trait FrontierStore {
    // ===== Frontier =====

    /// Upserts entries by URL
    ///
    /// On conflict the stored priority becomes `max(existing, new)`; depth,
    /// parent and status are never changed by a re-discovery.
    fn enqueue(&mut self, entries: &[FrontierEntry]) -> StorageResult<()>;

    /// Claims up to `limit` pending entries, highest priority first
    ///
    /// Ties go to the entry scheduled earliest. Every returned entry has been
    /// moved to `in_flight` by this call.
    fn next_batch(&mut self, limit: usize) -> StorageResult<Vec<FrontierEntry>>;

    /// Moves a pending entry to `in_flight`; returns false if it was not pending
    fn mark_in_flight(&mut self, url: &str) -> StorageResult<bool>;

    /// Marks an entry as done
    fn mark_completed(&mut self, url: &str) -> StorageResult<()>;

    /// Records a failed attempt
    ///
    /// The entry goes back to `pending` until `max_attempts` is reached, then
    /// becomes `failed`. Returns the resulting status.
    fn mark_failed(&mut self, url: &str, max_attempts: u32) -> StorageResult<FrontierStatus>;

    /// Marks an entry that was claimed but is deeper than the crawl allows
    fn mark_depth_exceeded(&mut self, url: &str) -> StorageResult<()>;

    /// Returns stale `in_flight` entries to `pending`
    ///
    /// Only claims older than `stale_after` are reset; younger ones may be
    /// held by another live process sharing the store.
    fn recover_in_flight(&mut self, stale_after: Duration) -> StorageResult<usize>;

    /// Returns `depth_exceeded` entries no deeper than `max_depth` to `pending`
    fn reopen_depth_exceeded(&mut self, max_depth: u32) -> StorageResult<usize>;

    /// Looks up an entry and its bookkeeping
    fn get_entry(&self, url: &str) -> StorageResult<Option<QueueRecord>>;

    // ===== Page Ledger =====

    /// Returns true if a page row exists for the URL
    fn is_already_crawled(&self, url: &str) -> StorageResult<bool>;

    /// Upserts a page by URL and returns its id
    fn save_page(&mut self, page: &PageRecord) -> StorageResult<i64>;

    /// Replaces the outbound links recorded for `source_id`
    fn save_links(&mut self, source_id: i64, links: &[LinkEdge]) -> StorageResult<()>;

    /// Gets a page by URL
    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Lists stored pages whose content hash matches exactly
    fn pages_with_hash(&self, content_hash: &str) -> StorageResult<Vec<PageRecord>>;

    /// Gets the outbound links recorded for a page
    fn get_outgoing_links(&self, source_id: i64) -> StorageResult<Vec<LinkEdge>>;

    // ===== Statistics =====

    /// Counts queue entries in a status
    fn count_by_status(&self, status: FrontierStatus) -> StorageResult<u64>;

    /// Counts stored pages
    fn count_pages(&self) -> StorageResult<u64>;

    /// Counts stored link edges
    fn count_links(&self) -> StorageResult<u64>;

    /// Average (importance, content quality) over stored pages
    fn average_scores(&self) -> StorageResult<(f64, f64)>;

    // ===== Maintenance =====

    /// Removes all frontier, page and link rows
    fn clear(&mut self) -> StorageResult<()>;
}
