//! Output module for reporting on the index
//!
//! This module handles:
//! - Loading index statistics from the store
//! - Printing them for the `--stats` mode

pub mod stats;

pub use stats::{load_statistics, print_statistics, IndexStatistics};
