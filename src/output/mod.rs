//! Output module for run summaries and reports
//!
//! This module handles:
//! - The end-of-run summary (logged and printed)
//! - The progress checkpoint file written during a run
//! - Store statistics and the catalog/store match report

mod checkpoint;
pub mod stats;
mod summary;

pub use checkpoint::{write_checkpoint, Progress};
pub use stats::{load_statistics, match_catalog, print_statistics, CatalogMatch, StoreStatistics};
pub use summary::{RunCounts, RunSummary};
