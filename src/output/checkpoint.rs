//! Progress checkpoint file
//!
//! A small JSON document rewritten after every committed item, so an operator
//! (or a wrapper script) can see how far a long run got and how much budget
//! is left without reading the log.

use crate::budget::{TimeBudget, TimeStatus};
use crate::output::RunCounts;
use crate::storage::{write_json_atomic, StorageResult};
use serde::Serialize;
use std::path::Path;

/// Progress of the item pass
#[derive(Debug, Clone, Serialize)]
pub struct Progress<'a> {
    pub current_item: Option<&'a str>,
    pub processed: usize,
    pub total: usize,
    pub counts: RunCounts,
}

#[derive(Serialize)]
struct Checkpoint<'a, T: Serialize> {
    timestamp: String,
    time_status: TimeStatus,
    data: &'a T,
}

/// Atomically writes `{timestamp, time_status, data}` to `path`
pub fn write_checkpoint<T: Serialize>(
    path: &Path,
    budget: &TimeBudget,
    data: &T,
) -> StorageResult<()> {
    let checkpoint = Checkpoint {
        timestamp: chrono::Local::now().to_rfc3339(),
        time_status: budget.status(),
        data,
    };
    write_json_atomic(path, &checkpoint)
}
