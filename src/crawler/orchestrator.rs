//! Crawl orchestrator - worker pool and per-task state machine
//!
//! This module contains the crawl loop that coordinates:
//! - A bounded pool of workers pulling from the shared frontier
//! - Depth policy, fetching, link extraction and the visited filter
//! - Tokenizing page text and writing postings to the index
//! - Deadline and cancellation handling
//! - Crawl statistics

use crate::crawler::context::CrawlContext;
use crate::crawler::fetcher::fetch;
use crate::crawler::frontier::{CrawlTask, Frontier};
use crate::crawler::parser::parse_html;
use crate::index::count_keywords;
use crate::state::TaskState;
use crate::storage::{self, Claim, Storage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// How a single task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Deeper than the configured maximum; not fetched, no children
    DepthExceeded,
    /// Transport failure or non-success status
    FetchFailed,
    /// Fetch abandoned because the crawl was cancelled
    Cancelled,
    /// Links followed, but the page was already claimed (or the claim failed)
    Skipped,
    /// Page text written to the index
    Indexed { keywords: u64, errors: u64 },
}

/// Summary of a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub tasks: u64,
    pub fetched: u64,
    pub fetch_failed: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub depth_exceeded: u64,
    pub keywords_recorded: u64,
    pub keyword_errors: u64,
    /// Tasks left in the frontier when the crawl stopped
    pub abandoned: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct CrawlStats {
    tasks: AtomicU64,
    fetched: AtomicU64,
    fetch_failed: AtomicU64,
    indexed: AtomicU64,
    skipped: AtomicU64,
    depth_exceeded: AtomicU64,
    keywords_recorded: AtomicU64,
    keyword_errors: AtomicU64,
}

impl CrawlStats {
    /// Records an outcome; returns the number of tasks finished so far
    fn record(&self, outcome: TaskOutcome) -> u64 {
        match outcome {
            TaskOutcome::DepthExceeded => {
                self.depth_exceeded.fetch_add(1, Ordering::Relaxed);
            }
            TaskOutcome::FetchFailed | TaskOutcome::Cancelled => {
                self.fetch_failed.fetch_add(1, Ordering::Relaxed);
            }
            TaskOutcome::Skipped => {
                self.fetched.fetch_add(1, Ordering::Relaxed);
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            TaskOutcome::Indexed { keywords, errors } => {
                self.fetched.fetch_add(1, Ordering::Relaxed);
                self.indexed.fetch_add(1, Ordering::Relaxed);
                self.keywords_recorded.fetch_add(keywords, Ordering::Relaxed);
                self.keyword_errors.fetch_add(errors, Ordering::Relaxed);
            }
        }
        self.tasks.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn report(&self, abandoned: u64, cancelled: bool, elapsed: Duration) -> CrawlReport {
        CrawlReport {
            tasks: self.tasks.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            fetch_failed: self.fetch_failed.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            depth_exceeded: self.depth_exceeded.load(Ordering::Relaxed),
            keywords_recorded: self.keywords_recorded.load(Ordering::Relaxed),
            keyword_errors: self.keyword_errors.load(Ordering::Relaxed),
            abandoned,
            cancelled,
            elapsed,
        }
    }
}

/// Main crawl orchestrator
pub struct Orchestrator {
    ctx: Arc<CrawlContext>,
    frontier: Arc<Frontier>,
    stats: Arc<CrawlStats>,
}

impl Orchestrator {
    /// Creates an orchestrator whose frontier holds `seeds` in order
    pub fn new(ctx: Arc<CrawlContext>, seeds: Vec<CrawlTask>) -> Self {
        Self {
            ctx,
            frontier: Arc::new(Frontier::with_tasks(seeds)),
            stats: Arc::new(CrawlStats::default()),
        }
    }

    /// Runs workers until the frontier drains or the crawl is cancelled
    pub async fn run(&self) -> CrawlReport {
        let start_time = Instant::now();
        let workers = self.ctx.crawler.workers.max(1);
        tracing::info!(
            "Starting crawl: {} seed task(s), {} worker(s), max depth {}",
            self.frontier.len(),
            workers,
            self.ctx.crawler.max_depth
        );

        let watcher = tokio::spawn(watch_cancellation(
            Arc::clone(&self.ctx),
            Arc::clone(&self.frontier),
        ));

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            pool.spawn(run_worker(
                worker_id,
                Arc::clone(&self.ctx),
                Arc::clone(&self.frontier),
                Arc::clone(&self.stats),
                start_time,
            ));
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Crawl worker terminated abnormally: {}", e);
            }
        }
        watcher.abort();

        let cancelled = self.ctx.is_cancelled();
        let abandoned = self.frontier.len() as u64;
        let report = self
            .stats
            .report(abandoned, cancelled, start_time.elapsed());

        if cancelled {
            tracing::warn!(
                "Crawl cancelled: {} task(s) processed, {} abandoned in frontier",
                report.tasks,
                abandoned
            );
        } else {
            tracing::info!("Frontier is empty, crawl complete");
        }

        report
    }
}

/// Closes the frontier once the crawl is cancelled or the deadline passes
async fn watch_cancellation(ctx: Arc<CrawlContext>, frontier: Arc<Frontier>) {
    match ctx.crawler.deadline() {
        Some(deadline) => {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    tracing::warn!("Crawl deadline of {:?} reached, stopping", deadline);
                    ctx.cancel.cancel();
                }
            }
        }
        None => ctx.cancel.cancelled().await,
    }
    frontier.close();
}

async fn run_worker(
    worker_id: u32,
    ctx: Arc<CrawlContext>,
    frontier: Arc<Frontier>,
    stats: Arc<CrawlStats>,
    start_time: Instant,
) {
    tracing::debug!("Worker {} started", worker_id);
    let progress_interval = ctx.crawler.progress_interval.max(1);

    while let Some(task) = frontier.next().await {
        let done = frontier.task_guard();
        let outcome = match process_task(&ctx, &frontier, &task).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Error processing {}: {}", task.address, e);
                TaskOutcome::FetchFailed
            }
        };
        drop(done);

        let finished = stats.record(outcome);
        if finished % progress_interval == 0 {
            let rate = finished as f64 / start_time.elapsed().as_secs_f64().max(f64::EPSILON);
            tracing::info!(
                "Progress: {} tasks finished, {} in frontier, {:.2} tasks/sec",
                finished,
                frontier.len(),
                rate
            );
        }
    }

    tracing::debug!("Worker {} finished", worker_id);
}

/// Runs one task through the state machine
///
/// Children are pushed as soon as the page is parsed, whatever the visited
/// filter decides afterwards.
pub async fn process_task(
    ctx: &CrawlContext,
    frontier: &Frontier,
    task: &CrawlTask,
) -> crate::Result<TaskOutcome> {
    let state = TaskState::Queued;

    // Depth cutoff is applied at dequeue time: over-deep children still pass
    // through the frontier, then are dropped here without a fetch.
    if task.depth > ctx.crawler.max_depth {
        state.transition(TaskState::Done)?;
        tracing::trace!(
            "Dropping {} at depth {} (max {})",
            task.address,
            task.depth,
            ctx.crawler.max_depth
        );
        return Ok(TaskOutcome::DepthExceeded);
    }

    let state = state.transition(TaskState::Fetching)?;
    tracing::debug!("Fetching {} (depth {})", task.address, task.depth);

    let fetched = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => {
            state.transition(TaskState::FetchFailed)?;
            tracing::debug!("Abandoned fetch of {}", task.address);
            return Ok(TaskOutcome::Cancelled);
        }
        result = fetch(&ctx.client, &task.address) => result,
    };

    let page = match fetched {
        Ok(page) => page,
        Err(e) => {
            state.transition(TaskState::FetchFailed)?;
            tracing::warn!("{}", e);
            return Ok(TaskOutcome::FetchFailed);
        }
    };

    tracing::debug!(
        "{} -> {} ({}, {})",
        task.address,
        page.final_url,
        page.status_code,
        page.content_type
    );

    let state = state.transition(TaskState::Parsed)?;
    // Relative links resolve against where the redirects ended up
    let base_url = Url::parse(&page.final_url)
        .or_else(|_| Url::parse(&task.address))
        .ok();
    let parsed = parse_html(&page.body, base_url.as_ref());
    tracing::info!(
        "{} {}",
        task.address,
        parsed.title.as_deref().unwrap_or("(no title)")
    );

    let mut pushed = 0usize;
    for child in parsed.child_tasks(task) {
        if frontier.push(child) {
            pushed += 1;
        }
    }
    tracing::trace!("{} child task(s) pushed from {}", pushed, task.address);

    let claim = storage::lock(&ctx.storage).and_then(|mut store| store.try_claim(&task.address));
    match claim {
        Ok(Claim::Claimed) => {}
        Ok(Claim::AlreadyVisited) => {
            state.transition(TaskState::Skipped)?.transition(TaskState::Done)?;
            tracing::debug!("{} already visited, skipping index", task.address);
            return Ok(TaskOutcome::Skipped);
        }
        Err(e) => {
            state.transition(TaskState::Skipped)?.transition(TaskState::Done)?;
            tracing::warn!("Visited check failed for {}: {}", task.address, e);
            return Ok(TaskOutcome::Skipped);
        }
    }

    let state = state.transition(TaskState::Indexed)?;
    let tokens = ctx.tokenizer.tokenize(&parsed.text);
    let (keywords, errors) = index_tokens(ctx, &task.address, &tokens);

    if errors == 0 {
        if let Err(e) =
            storage::lock(&ctx.storage).and_then(|mut store| store.mark_indexed(&task.address))
        {
            tracing::warn!("Failed to mark {} as indexed: {}", task.address, e);
        }
    } else {
        tracing::warn!(
            "{} of {} keyword(s) failed for {}; left unmarked as indexed",
            errors,
            keywords + errors,
            task.address
        );
    }

    state.transition(TaskState::Done)?;
    Ok(TaskOutcome::Indexed { keywords, errors })
}

/// Writes the token counts of one page to the index
///
/// Each distinct keyword is an independent atomic upsert; a failure skips
/// only that keyword. Returns `(recorded, failed)` keyword counts.
fn index_tokens(ctx: &CrawlContext, address: &str, tokens: &[String]) -> (u64, u64) {
    let mut recorded = 0;
    let mut failed = 0;

    for (keyword, count) in count_keywords(tokens) {
        let result = storage::lock(&ctx.storage)
            .and_then(|mut store| store.record_occurrences(keyword, address, count));
        match result {
            Ok(frequency) => {
                recorded += 1;
                tracing::trace!("{} -> {} (frequency {})", keyword, address, frequency);
            }
            Err(e) => {
                failed += 1;
                tracing::warn!("Failed to index '{}' for {}: {}", keyword, address, e);
            }
        }
    }

    (recorded, failed)
}
