//! Storage module for persisting enriched records
//!
//! This module handles everything that touches the record store on disk:
//! - The record model and its on-disk field names
//! - The `RecordStore` trait and the JSON file implementation
//! - Crash-safe atomic file replacement
//! - Cleanup of per-record media directories

mod atomic;
mod json_store;
pub mod media;
mod record;
mod traits;

pub use atomic::write_json_atomic;
pub use json_store::{records_digest, JsonFileStore, StoreState};
pub use record::{ListedStatus, Record, SpecEntry, SpecSections, VariantAttribute};
pub use traits::{RecordStore, StorageError, StorageResult};

use std::path::Path;

/// Opens the record store at `path`
///
/// With `fresh` set, any existing records are discarded first and the empty
/// store is written out immediately, so a run that dies before its first
/// commit still leaves a clean file behind.
///
/// # Arguments
///
/// * `path` - Path to the JSON store file
/// * `fresh` - Discard existing records
pub fn open_store(path: &Path, fresh: bool) -> StorageResult<JsonFileStore> {
    let mut store = JsonFileStore::open(path);
    if fresh {
        tracing::info!("Fresh run: clearing {} stored records", store.len());
        store.clear()?;
    }
    Ok(store)
}
