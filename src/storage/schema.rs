//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Spider-Index database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    tasks INTEGER NOT NULL DEFAULT 0,
    indexed INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    elapsed_ms INTEGER
);

-- Addresses that have been claimed for indexing
CREATE TABLE IF NOT EXISTS visited (
    address TEXT PRIMARY KEY,
    claimed_at TEXT NOT NULL,
    indexed_at TEXT
);

-- One row per distinct keyword
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- Keyword occurrences per page; id preserves posting order
CREATE TABLE IF NOT EXISTS postings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword_id INTEGER NOT NULL REFERENCES keywords(id),
    address TEXT NOT NULL,
    frequency INTEGER NOT NULL CHECK (frequency > 0),
    UNIQUE(keyword_id, address)
);

CREATE INDEX IF NOT EXISTS idx_postings_address ON postings(address);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
