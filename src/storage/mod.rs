//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - The durable, priority-ordered crawl frontier (`crawl_queue`)
//! - The page ledger used to short-circuit already-crawled URLs
//! - Link edge persistence

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{FrontierStore, StorageError, StorageResult};

use crate::state::FrontierStatus;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lowest priority a frontier entry can carry
pub const MIN_PRIORITY: u32 = 1;

/// Highest priority a frontier entry can carry
pub const MAX_PRIORITY: u32 = 100;

/// Initializes or opens a storage database
///
/// A failure here is fatal for a crawl: nothing starts without a frontier.
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Frontier store shared between the refill loop, workers and aggregator
pub type SharedStore = Arc<Mutex<dyn FrontierStore + Send>>;

/// Wraps a store for sharing across tasks
pub fn share(store: impl FrontierStore + Send + 'static) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Locks a shared store; callers must not hold the guard across an await
pub fn lock_store(
    store: &SharedStore,
) -> StorageResult<MutexGuard<'_, dyn FrontierStore + Send + 'static>> {
    store.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Clamps any computed priority into the frontier's valid range
pub fn clamp_priority(priority: i64) -> u32 {
    priority.clamp(MIN_PRIORITY as i64, MAX_PRIORITY as i64) as u32
}

/// Signal carried forward from the referring page to a discovered link
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlContext {
    /// Coarse content kind ("article", "news", "documentation", "general")
    pub content_type: String,
    /// Importance in [0, 1]
    pub importance: f64,
    /// When the context was computed
    pub last_modified: Option<DateTime<Utc>>,
    /// Anchor text share of body text, in [0, 1]
    pub link_density: f64,
    /// Structural quality in [0, 1]
    pub content_quality: f64,
    /// Reserved; no current heuristic reads it
    pub similarity_score: f64,
}

impl Default for CrawlContext {
    fn default() -> Self {
        Self {
            content_type: "general".to_string(),
            importance: 0.0,
            last_modified: None,
            link_density: 0.0,
            content_quality: 0.0,
            similarity_score: 0.0,
        }
    }
}

/// A URL waiting in (or handed out from) the crawl frontier
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierEntry {
    pub url: String,
    /// Always within [1, 100]
    pub priority: u32,
    pub depth: u32,
    pub parent_url: Option<String>,
    pub context: CrawlContext,
}

impl FrontierEntry {
    /// Builds the seed entry: priority 100, depth 0, importance 1.0
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            priority: MAX_PRIORITY,
            depth: 0,
            parent_url: None,
            context: CrawlContext {
                importance: 1.0,
                ..CrawlContext::default()
            },
        }
    }
}

/// A frontier entry together with its store-side bookkeeping
#[derive(Debug, Clone)]
pub struct QueueRecord {
    pub entry: FrontierEntry,
    pub status: FrontierStatus,
    pub attempts: u32,
    pub scheduled_at: String,
}

/// A fetched, relevant, non-duplicate page
///
/// URL is the natural key: saving the same URL again refreshes the row.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub id: Option<i64>,
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    pub status_code: u16,
    pub content_type: String,
    pub size_bytes: u64,
    pub load_time_millis: u64,
    pub depth: u32,
    pub parent_url: Option<String>,
    pub content_hash: String,
    pub importance: f64,
    pub content_quality: f64,
    pub link_density: f64,
}

/// An outbound link from a stored page
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEdge {
    pub source_id: i64,
    /// Filled in once the target page has been stored
    pub target_id: Option<i64>,
    pub url: String,
    pub anchor_text: String,
    pub rel: Option<String>,
}
