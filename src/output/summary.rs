//! End-of-run summary

use crate::budget::TimeStatus;
use crate::reconcile::Decision;
use crate::state::CrawlState;
use serde::Serialize;

/// Per-run outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub removed: usize,
    /// Items committed as recorded failures (also counted as inserted/updated)
    pub failed: usize,
    /// Source items never visited because the run stopped early
    pub remaining: usize,
}

impl RunCounts {
    /// Counts one committed or skipped item
    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Skip => self.skipped += 1,
            Decision::Update => self.updated += 1,
            Decision::Insert => self.inserted += 1,
            Decision::Remove => self.removed += 1,
        }
    }

    /// Items the loop actually visited
    pub fn processed(&self) -> usize {
        self.inserted + self.updated + self.skipped
    }
}

/// Final summary of a run
///
/// Emitted for every terminal state, including `Failed`, where it reflects
/// what was committed before the failing write.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub state: CrawlState,
    pub counts: RunCounts,
    pub total_items: usize,
    /// Whether the persisted store differs from its state before the run
    pub store_changed: bool,
    pub store_records: usize,
    pub time_status: TimeStatus,
    pub finished_at: String,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }

    /// Logs the summary
    pub fn log(&self) {
        let c = &self.counts;
        let line = format!(
            "Run finished ({}): {} inserted, {} updated, {} skipped, {} removed, {} failed, {} not reached; store {} ({} records)",
            self.state,
            c.inserted,
            c.updated,
            c.skipped,
            c.removed,
            c.failed,
            c.remaining,
            if self.store_changed { "changed" } else { "unchanged" },
            self.store_records
        );

        match self.state {
            CrawlState::Failed => tracing::error!("{}", line),
            CrawlState::GracefulStop => tracing::warn!("{}", line),
            _ => tracing::info!("{}", line),
        }
        tracing::info!(
            "Time used: {} of {} ({:.1}%)",
            self.time_status.elapsed_formatted,
            self.time_status.time_limit_formatted,
            self.time_status.progress_percentage
        );
    }

    /// Prints the summary to stdout
    pub fn print(&self) {
        let c = &self.counts;
        println!("=== Run Summary ===\n");
        println!("Outcome: {}", self.state);
        println!("Finished at: {}", self.finished_at);
        println!();
        println!("Items:");
        println!("  Source items: {}", self.total_items);
        println!("  Processed: {}", c.processed());
        println!("  Inserted: {}", c.inserted);
        println!("  Updated: {}", c.updated);
        println!("  Skipped: {}", c.skipped);
        println!("  Recorded failures: {}", c.failed);
        println!("  Not reached: {}", c.remaining);
        println!();
        println!("Store:");
        println!("  Removed: {}", c.removed);
        println!("  Records: {}", self.store_records);
        println!("  Changed: {}", if self.store_changed { "yes" } else { "no" });
        println!();
        println!(
            "Time: {} elapsed of {} ({:.1}%)",
            self.time_status.elapsed_formatted,
            self.time_status.time_limit_formatted,
            self.time_status.progress_percentage
        );
    }
}
