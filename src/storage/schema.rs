//! Database schema definitions
//!
//! Three logical tables: `pages` (one row per crawled URL, with scores),
//! `links` (edges between pages), and `crawl_queue` (the durable frontier).

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawled pages, keyed by URL
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    content TEXT,
    status_code INTEGER,
    content_type TEXT,
    size_bytes INTEGER NOT NULL DEFAULT 0,
    load_time_ms INTEGER NOT NULL DEFAULT 0,
    depth INTEGER NOT NULL DEFAULT 0,
    parent_url TEXT,
    crawled_at TEXT NOT NULL,
    content_hash TEXT,
    importance REAL NOT NULL DEFAULT 0,
    content_quality REAL NOT NULL DEFAULT 0,
    link_density REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_pages_hash ON pages(content_hash);

-- Outbound links of stored pages
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES pages(id),
    target_id INTEGER REFERENCES pages(id),
    url TEXT NOT NULL,
    anchor TEXT,
    rel TEXT
);

CREATE INDEX IF NOT EXISTS idx_links_source ON links(source_id);
CREATE INDEX IF NOT EXISTS idx_links_url ON links(url);

-- Durable crawl frontier
CREATE TABLE IF NOT EXISTS crawl_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    priority INTEGER NOT NULL DEFAULT 1,
    depth INTEGER NOT NULL DEFAULT 0,
    parent_url TEXT,
    context_type TEXT NOT NULL DEFAULT 'general',
    importance REAL NOT NULL DEFAULT 0,
    link_density REAL NOT NULL DEFAULT 0,
    content_quality REAL NOT NULL DEFAULT 0,
    scheduled_at TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_attempt TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
);

CREATE INDEX IF NOT EXISTS idx_crawl_queue_priority ON crawl_queue(priority DESC, scheduled_at ASC);
CREATE INDEX IF NOT EXISTS idx_crawl_queue_status ON crawl_queue(status);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
