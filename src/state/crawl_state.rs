/// Lifecycle states of a single crawl run
///
/// A run starts `Idle`, moves to `Running` once the item pass begins, and ends
/// in exactly one terminal state.
use serde::Serialize;
use std::fmt;

/// Represents the current state of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    /// Loop constructed, no item processed yet
    Idle,

    /// Item pass in progress
    Running,

    // ===== Terminal States =====
    /// Stopped before the source set was exhausted (time budget or signal)
    GracefulStop,

    /// Every source item was visited
    Completed,

    /// A durable store write failed; everything committed before it is intact
    Failed,
}

impl CrawlState {
    /// Returns true if this is a terminal state (the run is over)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GracefulStop | Self::Completed | Self::Failed)
    }

    /// Returns true if the run ended with all committed work persisted and
    /// should exit successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Self::GracefulStop | Self::Completed)
    }

    /// Checks whether moving from this state to `next` is allowed
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::GracefulStop)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Short lowercase name used in logs and checkpoints
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::GracefulStop => "graceful_stop",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::GracefulStop => "Graceful Stop",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}
