//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::index::{KeywordRecord, Posting};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Claim, Storage, StorageError, StorageResult};
use crate::storage::{IndexCounts, RunRecord, RunStatus};
use crate::SpiderError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

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
    /// * `Err(SpiderError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SpiderError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SpiderError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Running),
            tasks: row.get::<_, i64>(5)? as u64,
            indexed: row.get::<_, i64>(6)? as u64,
            failed: row.get::<_, i64>(7)? as u64,
            elapsed_ms: row.get::<_, Option<i64>>(8)?.map(|ms| ms as u64),
        })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, tasks, indexed, failed, elapsed_ms";

impl Storage for SqliteStorage {
    // ===== Visited Filter =====

    fn try_claim(&mut self, address: &str) -> StorageResult<Claim> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO visited (address, claimed_at) VALUES (?1, ?2)
             ON CONFLICT(address) DO NOTHING",
            params![address, now],
        )?;

        Ok(if inserted == 1 {
            Claim::Claimed
        } else {
            Claim::AlreadyVisited
        })
    }

    fn mark_indexed(&mut self, address: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO visited (address, claimed_at, indexed_at) VALUES (?1, ?2, ?2)
             ON CONFLICT(address) DO UPDATE SET indexed_at = excluded.indexed_at",
            params![address, now],
        )?;
        Ok(())
    }

    fn is_visited(&self, address: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM visited WHERE address = ?1",
                params![address],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ===== Inverted Index =====

    fn record_occurrences(
        &mut self,
        keyword: &str,
        address: &str,
        count: u32,
    ) -> StorageResult<u32> {
        if count == 0 {
            return Err(StorageError::Database(format!(
                "occurrence count for '{}' must be positive",
                keyword
            )));
        }

        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO keywords (keyword, created_at) VALUES (?1, ?2)
             ON CONFLICT(keyword) DO NOTHING",
            params![keyword, now],
        )?;

        // Increment in place, or append a new posting when the address is new
        let frequency: u32 = tx.query_row(
            "INSERT INTO postings (keyword_id, address, frequency)
             SELECT id, ?2, ?3 FROM keywords WHERE keyword = ?1
             ON CONFLICT(keyword_id, address) DO UPDATE SET frequency = frequency + excluded.frequency
             RETURNING frequency",
            params![keyword, address, count],
            |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(frequency)
    }

    fn get_keyword(&self, keyword: &str) -> StorageResult<Option<KeywordRecord>> {
        let keyword_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM keywords WHERE keyword = ?1",
                params![keyword],
                |row| row.get(0),
            )
            .optional()?;

        let Some(keyword_id) = keyword_id else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT address, frequency FROM postings WHERE keyword_id = ?1 ORDER BY id",
        )?;
        let postings = stmt
            .query_map(params![keyword_id], |row| {
                Ok(Posting {
                    address: row.get(0)?,
                    frequency: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(KeywordRecord {
            keyword: keyword.to_string(),
            postings,
        }))
    }

    fn top_keywords(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT k.keyword, SUM(p.frequency) AS total
             FROM keywords k JOIN postings p ON p.keyword_id = k.id
             GROUP BY k.id
             ORDER BY total DESC, k.keyword ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        tasks: u64,
        indexed: u64,
        failed: u64,
        elapsed_ms: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, tasks = ?3, indexed = ?4,
             failed = ?5, elapsed_ms = ?6 WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                tasks as i64,
                indexed as i64,
                failed as i64,
                elapsed_ms as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                Self::run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                Self::run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Statistics =====

    fn counts(&self) -> StorageResult<IndexCounts> {
        Ok(IndexCounts {
            visited: self.count("SELECT COUNT(*) FROM visited")?,
            indexed: self.count("SELECT COUNT(*) FROM visited WHERE indexed_at IS NOT NULL")?,
            keywords: self.count("SELECT COUNT(*) FROM keywords")?,
            postings: self.count("SELECT COUNT(*) FROM postings")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tokenize;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_try_claim_is_insert_if_absent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        assert!(!storage.is_visited("https://a.test").unwrap());
        assert_eq!(storage.try_claim("https://a.test").unwrap(), Claim::Claimed);
        assert_eq!(
            storage.try_claim("https://a.test").unwrap(),
            Claim::AlreadyVisited
        );
        assert!(storage.is_visited("https://a.test").unwrap());
    }

    #[test]
    fn test_mark_indexed() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.try_claim("https://a.test").unwrap();
        assert_eq!(storage.counts().unwrap().indexed, 0);

        storage.mark_indexed("https://a.test").unwrap();
        let counts = storage.counts().unwrap();
        assert_eq!(counts.visited, 1);
        assert_eq!(counts.indexed, 1);
    }

    #[test]
    fn test_first_occurrence_creates_record() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let freq = storage.record_occurrence("hello", "https://a.test").unwrap();
        assert_eq!(freq, 1);

        let record = storage.get_keyword("hello").unwrap().unwrap();
        assert_eq!(
            record.postings,
            vec![Posting {
                address: "https://a.test".to_string(),
                frequency: 1
            }]
        );
    }

    #[test]
    fn test_repeated_occurrence_increments_posting() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        storage.record_occurrence("hello", "https://a.test").unwrap();
        let freq = storage.record_occurrence("hello", "https://a.test").unwrap();

        assert_eq!(freq, 2);
        let record = storage.get_keyword("hello").unwrap().unwrap();
        assert_eq!(record.postings.len(), 1);
        assert_eq!(record.postings[0].frequency, 2);
    }

    #[test]
    fn test_new_address_appends_posting() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        storage.record_occurrence("hello", "https://a.test").unwrap();
        storage.record_occurrence("hello", "https://b.test").unwrap();
        storage.record_occurrence("hello", "https://a.test").unwrap();

        let record = storage.get_keyword("hello").unwrap().unwrap();
        let addresses: Vec<_> = record.postings.iter().map(|p| p.address.as_str()).collect();
        assert_eq!(addresses, vec!["https://a.test", "https://b.test"]);
        assert_eq!(record.posting("https://a.test").unwrap().frequency, 2);
        assert_eq!(record.posting("https://b.test").unwrap().frequency, 1);
    }

    #[test]
    fn test_record_occurrences_batch() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        assert_eq!(storage.record_occurrences("Go", "https://a.test", 3).unwrap(), 3);
        assert_eq!(storage.record_occurrences("Go", "https://a.test", 2).unwrap(), 5);
        assert!(storage.record_occurrences("Go", "https://a.test", 0).is_err());
    }

    #[test]
    fn test_go_go_and_go() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for token in tokenize("Go, Go, and Go!") {
            storage.record_occurrence(&token, "https://a.test").unwrap();
        }

        let go = storage.get_keyword("Go").unwrap().unwrap();
        assert_eq!(go.posting("https://a.test").unwrap().frequency, 3);
        let and = storage.get_keyword("and").unwrap().unwrap();
        assert_eq!(and.posting("https://a.test").unwrap().frequency, 1);
        assert!(storage.get_keyword("go").unwrap().is_none());
    }

    #[test]
    fn test_missing_keyword() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_keyword("absent").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        storage
                            .lock()
                            .unwrap()
                            .record_occurrence("shared", "https://a.test")
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let record = storage.lock().unwrap().get_keyword("shared").unwrap().unwrap();
        assert_eq!(record.postings.len(), 1);
        assert_eq!(record.postings[0].frequency, 200);
    }

    #[test]
    fn test_concurrent_connections_share_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        SqliteStorage::new(&path).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut storage = SqliteStorage::new(&path).unwrap();
                    for _ in 0..20 {
                        storage.record_occurrence("shared", "https://a.test").unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        let record = storage.get_keyword("shared").unwrap().unwrap();
        assert_eq!(record.postings[0].frequency, 80);
    }

    #[test]
    fn test_top_keywords() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.record_occurrences("alpha", "https://a.test", 2).unwrap();
        storage.record_occurrences("alpha", "https://b.test", 3).unwrap();
        storage.record_occurrences("beta", "https://a.test", 4).unwrap();
        storage.record_occurrences("gamma", "https://a.test", 1).unwrap();

        let top = storage.top_keywords(2).unwrap();
        assert_eq!(
            top,
            vec![("alpha".to_string(), 5), ("beta".to_string(), 4)]
        );
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        storage
            .finish_run(run_id, RunStatus::Completed, 10, 7, 2, 1234)
            .unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Completed);
        assert_eq!(latest.tasks, 10);
        assert_eq!(latest.indexed, 7);
        assert_eq!(latest.failed, 2);
        assert_eq!(latest.elapsed_ms, Some(1234));
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_unknown_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(42),
            Err(StorageError::RunNotFound(42))
        ));
        assert!(matches!(
            storage.finish_run(42, RunStatus::Completed, 0, 0, 0, 0),
            Err(StorageError::RunNotFound(42))
        ));
    }
}
