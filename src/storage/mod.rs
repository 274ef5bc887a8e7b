//! Storage module for persisting the index
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Visited markers used to index each address once
//! - Keyword records and their postings
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Claim, Storage, StorageError, StorageResult};

use crate::SpiderError;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Store handle shared by all crawl workers
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SpiderError> {
    SqliteStorage::new(path)
}

/// Locks a shared store, surfacing poisoning as a storage error
pub fn lock(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub tasks: u64,
    pub indexed: u64,
    pub failed: u64,
    pub elapsed_ms: Option<u64>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Row counts of the index tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexCounts {
    pub visited: u64,
    pub indexed: u64,
    pub keywords: u64,
    pub postings: u64,
}
