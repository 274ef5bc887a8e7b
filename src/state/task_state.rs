/// Task state definitions for the per-task crawl state machine
use std::fmt;

/// Represents the current state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task is waiting in the frontier
    Queued,

    /// Page content is being retrieved
    Fetching,

    /// Content retrieved and links extracted
    Parsed,

    /// Page text has been written to the index
    Indexed,

    /// Page was already claimed by an earlier task; indexing skipped
    Skipped,

    // ===== Terminal States =====
    /// Transport or status failure; no children, not marked visited
    FetchFailed,

    /// Task finished
    Done,
}

impl TaskState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::Done)
    }

    /// Returns true if the state machine permits moving from `self` to `next`
    ///
    /// `Queued -> Done` is the depth-policy shortcut: the task is popped but
    /// neither fetched nor expanded.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Queued, Fetching)
                | (Queued, Done)
                | (Fetching, FetchFailed)
                | (Fetching, Parsed)
                | (Parsed, Indexed)
                | (Parsed, Skipped)
                | (Indexed, Done)
                | (Skipped, Done)
        )
    }

    /// Performs a checked transition
    pub fn transition(self, next: TaskState) -> crate::Result<TaskState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(crate::SpiderError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Parsed => "parsed",
            Self::Indexed => "indexed",
            Self::Skipped => "skipped",
            Self::FetchFailed => "fetch-failed",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
