//! Storage traits and error types
//!
//! This module defines the document-store interface the crawler relies on.
//! Every mutating operation must be atomic on the store side: callers never
//! read a record and write it back.

use crate::index::KeywordRecord;
use crate::storage::{IndexCounts, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of claiming an address for indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This caller inserted the marker and must index the page
    Claimed,
    /// A marker already existed; indexing must be skipped
    AlreadyVisited,
}

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Visited Filter =====

    /// Inserts a visited marker for `address` unless one exists
    fn try_claim(&mut self, address: &str) -> StorageResult<Claim>;

    /// Records that every keyword of `address` has been committed
    fn mark_indexed(&mut self, address: &str) -> StorageResult<()>;

    /// Returns true if a visited marker exists for `address`
    fn is_visited(&self, address: &str) -> StorageResult<bool>;

    // ===== Inverted Index =====

    /// Adds one occurrence of `keyword` on `address`
    ///
    /// Creates the keyword record and the posting as needed. Returns the
    /// posting's frequency after the update.
    fn record_occurrence(&mut self, keyword: &str, address: &str) -> StorageResult<u32> {
        self.record_occurrences(keyword, address, 1)
    }

    /// Adds `count` occurrences of `keyword` on `address` in one atomic upsert
    fn record_occurrences(&mut self, keyword: &str, address: &str, count: u32)
        -> StorageResult<u32>;

    /// Fetches a keyword record with its postings in insertion order
    fn get_keyword(&self, keyword: &str) -> StorageResult<Option<KeywordRecord>>;

    /// Returns the `limit` keywords with the highest total frequency
    fn top_keywords(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;

    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Stores the final status and counters of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        tasks: u64,
        indexed: u64,
        failed: u64,
        elapsed_ms: u64,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Statistics =====

    /// Counts visited markers, keywords and postings
    fn counts(&self) -> StorageResult<IndexCounts>;
}
