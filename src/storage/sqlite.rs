//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the FrontierStore trait.

use crate::state::FrontierStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{FrontierStore, StorageError, StorageResult};
use crate::storage::{
    clamp_priority, CrawlContext, FrontierEntry, LinkEdge, PageRecord, QueueRecord,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::{Duration, SystemTime};

const ENTRY_COLUMNS: &str = "url, priority, depth, parent_url, context_type, importance, \
                             link_density, content_quality";

const PAGE_COLUMNS: &str = "id, url, title, content, status_code, content_type, size_bytes, \
                            load_time_ms, depth, parent_url, content_hash, importance, \
                            content_quality, link_density";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        // Other crawler processes may hold the write lock briefly
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Fixed-width UTC timestamp, so lexical order matches time order
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<FrontierEntry> {
    Ok(FrontierEntry {
        url: row.get(0)?,
        priority: row.get(1)?,
        depth: row.get(2)?,
        parent_url: row.get(3)?,
        context: CrawlContext {
            content_type: row.get(4)?,
            importance: row.get(5)?,
            last_modified: None,
            link_density: row.get(6)?,
            content_quality: row.get(7)?,
            similarity_score: 0.0,
        },
    })
}

fn row_to_page(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: Some(row.get(0)?),
        url: row.get(1)?,
        title: row.get(2)?,
        content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        status_code: row.get::<_, Option<u16>>(4)?.unwrap_or_default(),
        content_type: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        size_bytes: row.get::<_, i64>(6)? as u64,
        load_time_millis: row.get::<_, i64>(7)? as u64,
        depth: row.get(8)?,
        parent_url: row.get(9)?,
        content_hash: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        importance: row.get(11)?,
        content_quality: row.get(12)?,
        link_density: row.get(13)?,
    })
}

fn row_to_link(row: &Row<'_>) -> rusqlite::Result<LinkEdge> {
    Ok(LinkEdge {
        source_id: row.get(0)?,
        target_id: row.get(1)?,
        url: row.get(2)?,
        anchor_text: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        rel: row.get(4)?,
    })
}

impl FrontierStore for SqliteStorage {
    // ===== Frontier =====

    fn enqueue(&mut self, entries: &[FrontierEntry]) -> StorageResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            // Context follows whichever discovery carried the higher priority
            let mut stmt = tx.prepare(
                "INSERT INTO crawl_queue
                 (url, priority, depth, parent_url, context_type, importance, link_density,
                  content_quality, scheduled_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending')
                 ON CONFLICT(url) DO UPDATE SET
                    context_type = CASE WHEN excluded.priority > crawl_queue.priority
                                        THEN excluded.context_type ELSE crawl_queue.context_type END,
                    importance = CASE WHEN excluded.priority > crawl_queue.priority
                                      THEN excluded.importance ELSE crawl_queue.importance END,
                    link_density = CASE WHEN excluded.priority > crawl_queue.priority
                                        THEN excluded.link_density ELSE crawl_queue.link_density END,
                    content_quality = CASE WHEN excluded.priority > crawl_queue.priority
                                           THEN excluded.content_quality ELSE crawl_queue.content_quality END,
                    priority = MAX(crawl_queue.priority, excluded.priority)",
            )?;

            for entry in entries {
                stmt.execute(params![
                    entry.url,
                    clamp_priority(entry.priority as i64),
                    entry.depth,
                    entry.parent_url,
                    entry.context.content_type,
                    entry.context.importance,
                    entry.context.link_density,
                    entry.context.content_quality,
                    now_timestamp(),
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn next_batch(&mut self, limit: usize) -> StorageResult<Vec<FrontierEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // IMMEDIATE takes the write lock up front so the select and the
        // status flips happen as one unit across processes
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidates = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM crawl_queue
                 WHERE status = 'pending'
                 ORDER BY priority DESC, scheduled_at ASC, id ASC
                 LIMIT ?1",
                ENTRY_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![limit as i64], row_to_entry)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let now = now_timestamp();
        let mut claimed = Vec::with_capacity(candidates.len());
        for entry in candidates {
            let changed = tx.execute(
                "UPDATE crawl_queue SET status = 'in_flight', last_attempt = ?1
                 WHERE url = ?2 AND status = 'pending'",
                params![now, entry.url],
            )?;
            if changed == 1 {
                claimed.push(entry);
            }
        }
        tx.commit()?;

        Ok(claimed)
    }

    fn mark_in_flight(&mut self, url: &str) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE crawl_queue SET status = 'in_flight', last_attempt = ?1
             WHERE url = ?2 AND status = 'pending'",
            params![now_timestamp(), url],
        )?;
        Ok(changed == 1)
    }

    fn mark_completed(&mut self, url: &str) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE crawl_queue SET status = ?1 WHERE url = ?2",
            params![FrontierStatus::Completed.to_db_string(), url],
        )?;
        if changed == 0 {
            return Err(StorageError::EntryNotFound(url.to_string()));
        }
        Ok(())
    }

    fn mark_failed(&mut self, url: &str, max_attempts: u32) -> StorageResult<FrontierStatus> {
        let changed = self.conn.execute(
            "UPDATE crawl_queue SET
                attempts = attempts + 1,
                status = CASE WHEN attempts + 1 >= ?1 THEN 'failed' ELSE 'pending' END,
                scheduled_at = ?2
             WHERE url = ?3",
            params![max_attempts, now_timestamp(), url],
        )?;
        if changed == 0 {
            return Err(StorageError::EntryNotFound(url.to_string()));
        }

        let status: String = self.conn.query_row(
            "SELECT status FROM crawl_queue WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;

        FrontierStatus::from_db_string(&status)
            .ok_or_else(|| StorageError::Database(format!("Unknown queue status '{}'", status)))
    }

    fn mark_depth_exceeded(&mut self, url: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE crawl_queue SET status = ?1 WHERE url = ?2",
            params![FrontierStatus::DepthExceeded.to_db_string(), url],
        )?;
        Ok(())
    }

    fn recover_in_flight(&mut self, stale_after: Duration) -> StorageResult<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(stale_after)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let cutoff = DateTime::<Utc>::from(cutoff).to_rfc3339_opts(SecondsFormat::Micros, true);

        // Younger claims may belong to a live process sharing this file
        let changed = self.conn.execute(
            "UPDATE crawl_queue SET status = 'pending'
             WHERE status = 'in_flight' AND (last_attempt IS NULL OR last_attempt < ?1)",
            params![cutoff],
        )?;
        Ok(changed)
    }

    fn reopen_depth_exceeded(&mut self, max_depth: u32) -> StorageResult<usize> {
        let changed = self.conn.execute(
            "UPDATE crawl_queue SET status = 'pending'
             WHERE status = 'depth_exceeded' AND depth <= ?1",
            params![max_depth],
        )?;
        Ok(changed)
    }

    fn get_entry(&self, url: &str) -> StorageResult<Option<QueueRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}, status, attempts, scheduled_at FROM crawl_queue WHERE url = ?1",
            ENTRY_COLUMNS
        ))?;

        let record = stmt
            .query_row(params![url], |row| {
                let entry = row_to_entry(row)?;
                let status: String = row.get(8)?;
                Ok(QueueRecord {
                    entry,
                    status: FrontierStatus::from_db_string(&status)
                        .unwrap_or(FrontierStatus::Pending),
                    attempts: row.get(9)?,
                    scheduled_at: row.get(10)?,
                })
            })
            .optional()?;

        Ok(record)
    }

    // ===== Page Ledger =====

    fn is_already_crawled(&self, url: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn save_page(&mut self, page: &PageRecord) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;

        let id: i64 = tx.query_row(
            "INSERT INTO pages (url, title, content, status_code, content_type, size_bytes,
                                load_time_ms, depth, parent_url, crawled_at, content_hash,
                                importance, content_quality, link_density)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                status_code = excluded.status_code,
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                load_time_ms = excluded.load_time_ms,
                crawled_at = excluded.crawled_at,
                content_hash = excluded.content_hash,
                importance = excluded.importance,
                content_quality = excluded.content_quality,
                link_density = excluded.link_density
             RETURNING id",
            params![
                page.url,
                page.title,
                page.content,
                page.status_code,
                page.content_type,
                page.size_bytes as i64,
                page.load_time_millis as i64,
                page.depth,
                page.parent_url,
                now_timestamp(),
                page.content_hash,
                page.importance,
                page.content_quality,
                page.link_density,
            ],
            |row| row.get(0),
        )?;

        // Resolve edges that were recorded before this page existed
        tx.execute(
            "UPDATE links SET target_id = ?1 WHERE url = ?2 AND target_id IS NULL",
            params![id, page.url],
        )?;

        tx.commit()?;
        Ok(id)
    }

    fn save_links(&mut self, source_id: i64, links: &[LinkEdge]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        // A re-crawl refreshes the page's outbound edges rather than stacking them
        tx.execute("DELETE FROM links WHERE source_id = ?1", params![source_id])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO links (source_id, target_id, url, anchor, rel)
                 VALUES (?1, COALESCE(?2, (SELECT id FROM pages WHERE url = ?3)), ?3, ?4, ?5)",
            )?;
            for link in links {
                stmt.execute(params![
                    source_id,
                    link.target_id,
                    link.url,
                    link.anchor_text,
                    link.rel
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS))?;

        let page = stmt.query_row(params![url], row_to_page).optional()?;

        Ok(page)
    }

    fn pages_with_hash(&self, content_hash: &str) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pages WHERE content_hash = ?1 ORDER BY id",
            PAGE_COLUMNS
        ))?;

        let pages = stmt
            .query_map(params![content_hash], row_to_page)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn get_outgoing_links(&self, source_id: i64) -> StorageResult<Vec<LinkEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, target_id, url, anchor, rel FROM links
             WHERE source_id = ?1 ORDER BY id",
        )?;

        let links = stmt
            .query_map(params![source_id], row_to_link)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    // ===== Statistics =====

    fn count_by_status(&self, status: FrontierStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawl_queue WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_links(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn average_scores(&self) -> StorageResult<(f64, f64)> {
        let averages: (Option<f64>, Option<f64>) = self.conn.query_row(
            "SELECT AVG(importance), AVG(content_quality) FROM pages",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((averages.0.unwrap_or(0.0), averages.1.unwrap_or(0.0)))
    }

    // ===== Maintenance =====

    fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM links;
            DELETE FROM pages;
            DELETE FROM crawl_queue;
        ",
        )?;
        Ok(())
    }
}
