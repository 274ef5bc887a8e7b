//! State module for tracking crawl task progress
//!
//! Every crawl task walks the same lifecycle:
//!
//! ```text
//! queued -> fetching -> fetch-failed
//!                    -> parsed -> indexed -> done
//!                              -> skipped -> done
//! queued -> depth-exceeded
//! ```

mod task_state;

pub use task_state::TaskState;
