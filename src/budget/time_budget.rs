use crate::budget::ShutdownFlag;
use crate::config::TimeConfig;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Granularity of [`TimeBudget::interruptible_wait`]
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Wall-clock budget for a run
///
/// Work may start only while more than `grace` remains before `limit`, and
/// never after a shutdown was requested. Clones share the same start instant
/// and shutdown flag.
///
/// Built on `tokio::time::Instant`, so a paused test runtime drives it with a
/// simulated clock.
#[derive(Debug, Clone)]
pub struct TimeBudget {
    started: Instant,
    limit: Duration,
    grace: Duration,
    shutdown: ShutdownFlag,
}

/// Snapshot of the budget, serialised into progress checkpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeStatus {
    pub elapsed_seconds: f64,
    pub remaining_seconds: f64,
    pub elapsed_formatted: String,
    pub remaining_formatted: String,
    pub time_limit_seconds: u64,
    pub time_limit_formatted: String,
    pub progress_percentage: f64,
    pub should_continue: bool,
}

impl TimeBudget {
    /// Starts the clock now
    pub fn new(limit: Duration, grace: Duration, shutdown: ShutdownFlag) -> Self {
        Self {
            started: Instant::now(),
            limit,
            grace,
            shutdown,
        }
    }

    pub fn from_config(config: &TimeConfig, shutdown: ShutdownFlag) -> Self {
        Self::new(config.limit, config.grace, shutdown)
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn shutdown_flag(&self) -> &ShutdownFlag {
        &self.shutdown
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// `max(0, limit - elapsed)`
    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    /// The single authority consulted before starting any unit of work
    pub fn should_continue(&self) -> bool {
        !self.shutdown.is_requested() && self.remaining() > self.grace
    }

    /// True once the run has entered its wind-down window
    pub fn should_begin_graceful_shutdown(&self) -> bool {
        !self.should_continue()
    }

    /// Sleeps for `duration` unless the budget runs out first
    ///
    /// Returns `true` if the full duration elapsed, `false` if the wait was
    /// cut short because work should no longer continue. Never sleeps past the
    /// start of the grace window.
    pub async fn interruptible_wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            if !self.should_continue() {
                return false;
            }

            let until_grace = self.remaining().saturating_sub(self.grace);
            let slice = WAIT_SLICE.min(deadline - now).min(until_grace);
            tokio::time::sleep(slice).await;
        }
    }

    pub fn status(&self) -> TimeStatus {
        let elapsed = self.elapsed();
        let remaining = self.remaining();
        let progress_percentage = if self.limit.is_zero() {
            100.0
        } else {
            elapsed.as_secs_f64() / self.limit.as_secs_f64() * 100.0
        };

        TimeStatus {
            elapsed_seconds: elapsed.as_secs_f64(),
            remaining_seconds: remaining.as_secs_f64(),
            elapsed_formatted: format_hms(elapsed),
            remaining_formatted: format_hms(remaining),
            time_limit_seconds: self.limit.as_secs(),
            time_limit_formatted: format_hms(self.limit),
            progress_percentage,
            should_continue: self.should_continue(),
        }
    }

    /// Logs elapsed/remaining time and item progress
    pub fn log_status(&self, current_item: Option<&str>, processed: usize, total: usize) {
        let status = self.status();
        tracing::info!(
            elapsed = %status.elapsed_formatted,
            remaining = %status.remaining_formatted,
            "Time status: {:.1}% of budget used, {}/{} items",
            status.progress_percentage,
            processed,
            total
        );
        if let Some(item) = current_item {
            tracing::debug!("Current item: {}", item);
        }
        if self.should_begin_graceful_shutdown() {
            tracing::warn!("Graceful shutdown window reached");
        }
    }
}

/// Formats a duration as `HH:MM:SS`
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
