//! Crawler module for web page fetching and indexing
//!
//! This module contains the core crawling logic, including:
//! - The FIFO frontier of pending crawl tasks
//! - HTTP fetching
//! - HTML parsing, link extraction and text extraction
//! - The orchestrator driving the worker pool

mod context;
mod fetcher;
mod frontier;
mod orchestrator;
mod parser;

pub use context::CrawlContext;
pub use fetcher::{build_http_client, fetch, FetchError, FetchedPage};
pub use frontier::{CrawlTask, Frontier, TaskDone};
pub use orchestrator::{process_task, CrawlReport, Orchestrator, TaskOutcome};
pub use parser::{extract_links, parse_html, ParsedPage};

use crate::config::Config;
use crate::seeds::load_seeds;
use crate::storage::{self, open_storage, RunStatus, Storage};
use crate::SpiderError;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Load the seed list
/// 2. Open the index database and record a new run
/// 3. Build the HTTP client and crawl context
/// 4. Crawl until the frontier drains or `cancel` fires
/// 5. Record the run's final status and counters
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `cancel` - Token that stops the crawl early when cancelled
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished, possibly cancelled
/// * `Err(SpiderError)` - Crawl could not be started or recorded
pub async fn run_crawl(
    config: Config,
    config_hash: &str,
    cancel: CancellationToken,
) -> Result<CrawlReport, SpiderError> {
    let seeds = load_seeds(Path::new(&config.input.seed_file))?;
    tracing::info!("Loaded {} seed address(es)", seeds.len());

    tracing::info!("Opening index database: {}", config.output.database_path);
    let shared = Arc::new(Mutex::new(open_storage(Path::new(
        &config.output.database_path,
    ))?));

    let run_id = storage::lock(&shared)?.create_run(config_hash)?;
    tracing::info!("Started crawl run {}", run_id);

    let ctx = Arc::new(CrawlContext::new(&config, Arc::clone(&shared), cancel)?);
    let report = Orchestrator::new(ctx, seeds).run().await;

    let status = if report.cancelled {
        RunStatus::Cancelled
    } else {
        RunStatus::Completed
    };
    storage::lock(&shared)?.finish_run(
        run_id,
        status,
        report.tasks,
        report.indexed,
        report.fetch_failed,
        report.elapsed.as_millis() as u64,
    )?;

    tracing::info!(
        "Run {} {}: {} task(s), {} indexed, {} skipped, {} failed, {} beyond max depth",
        run_id,
        status.to_db_string(),
        report.tasks,
        report.indexed,
        report.skipped,
        report.fetch_failed,
        report.depth_exceeded
    );

    Ok(report)
}
