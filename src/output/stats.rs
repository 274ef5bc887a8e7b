//! Statistics generation from the index database
//!
//! This module provides functionality for extracting and displaying
//! index statistics from the storage layer.

use crate::storage::{IndexCounts, RunRecord, Storage};
use crate::SpiderError;

/// Number of keywords listed in the statistics report
const TOP_KEYWORDS: usize = 10;

/// Index statistics summary
#[derive(Debug, Clone)]
pub struct IndexStatistics {
    /// Row counts of the index tables
    pub counts: IndexCounts,

    /// Keywords with the highest total frequency, descending
    pub top_keywords: Vec<(String, u64)>,

    /// Most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl IndexStatistics {
    /// Share of visited addresses whose keywords were all committed
    pub fn indexed_ratio(&self) -> f64 {
        if self.counts.visited == 0 {
            0.0
        } else {
            self.counts.indexed as f64 / self.counts.visited as f64
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(IndexStatistics)` - Successfully loaded statistics
/// * `Err(SpiderError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<IndexStatistics, SpiderError> {
    Ok(IndexStatistics {
        counts: storage.counts()?,
        top_keywords: storage.top_keywords(TOP_KEYWORDS)?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IndexStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Visited addresses: {}", stats.counts.visited);
    println!(
        "  Fully indexed: {} ({:.1}%)",
        stats.counts.indexed,
        stats.indexed_ratio() * 100.0
    );
    println!("  Keywords: {}", stats.counts.keywords);
    println!("  Postings: {}", stats.counts.postings);
    println!();

    if !stats.top_keywords.is_empty() {
        println!("Top Keywords:");
        for (keyword, total) in &stats.top_keywords {
            println!("  {:<24} {}", keyword, total);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!(
                "  Tasks: {}, indexed: {}, failed: {}",
                run.tasks, run.indexed, run.failed
            );
            if let Some(ms) = run.elapsed_ms {
                println!("  Elapsed: {:.1}s", ms as f64 / 1000.0);
            }
        }
        None => println!("No crawl runs recorded"),
    }
}
