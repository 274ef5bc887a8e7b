//! Frontier for managing pending crawl tasks
//!
//! This module handles:
//! - FIFO ordering of crawl tasks (breadth-first task creation)
//! - Serialized push/pop across concurrent workers
//! - Tracking in-flight tasks so workers know when the crawl has drained
//! - Closing the queue on cancellation

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// A unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Address to fetch
    pub address: String,

    /// Seed this task descends from; fixed for the whole traversal tree
    pub root_seed: String,

    /// Number of link hops from the seed
    pub depth: u32,
}

impl CrawlTask {
    /// Creates a depth-0 task rooted at itself
    pub fn seed(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            root_seed: address.clone(),
            address,
            depth: 0,
        }
    }

    /// Creates a task for a link discovered on this task's page
    pub fn child(&self, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            root_seed: self.root_seed.clone(),
            depth: self.depth + 1,
        }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<CrawlTask>,
    in_flight: usize,
    closed: bool,
}

/// Work queue shared by all crawl workers
///
/// Pop order is pure insertion order. A task handed out by [`Frontier::next`]
/// counts as in flight until [`Frontier::task_done`] is called for it; the
/// frontier is drained once the queue is empty and nothing is in flight.
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier pre-loaded with `tasks` in order
    pub fn with_tasks(tasks: impl IntoIterator<Item = CrawlTask>) -> Self {
        let frontier = Self::new();
        frontier.lock().queue.extend(tasks);
        frontier
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // No update below can panic halfway, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a task; returns false if the frontier has been closed
    pub fn push(&self, task: CrawlTask) -> bool {
        {
            let mut state = self.lock();
            if state.closed {
                return false;
            }
            state.queue.push_back(task);
        }
        self.notify.notify_waiters();
        true
    }

    /// Removes and returns the earliest-pushed task without waiting
    ///
    /// The returned task is not tracked as in flight.
    pub fn pop(&self) -> Option<CrawlTask> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        state.queue.pop_front()
    }

    /// Waits for the next task
    ///
    /// Returns `None` once the frontier is closed, or once it is empty with
    /// no task in flight that could still push children.
    pub async fn next(&self) -> Option<CrawlTask> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(task) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(task);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Returns a guard that calls [`Frontier::task_done`] when dropped
    ///
    /// Holding it while a task runs keeps the in-flight count right even if
    /// processing unwinds.
    pub fn task_guard(&self) -> TaskDone<'_> {
        TaskDone { frontier: self }
    }

    /// Marks a task obtained from [`Frontier::next`] as finished
    pub fn task_done(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    /// Stops accepting and handing out work; wakes every waiting worker
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Returns the number of queued tasks
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Returns the number of tasks handed out and not yet finished
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}

/// Marks one in-flight task as finished on drop
#[must_use = "the task is marked done as soon as the guard is dropped"]
pub struct TaskDone<'a> {
    frontier: &'a Frontier,
}

impl Drop for TaskDone<'_> {
    fn drop(&mut self) {
        self.frontier.task_done();
    }
}
