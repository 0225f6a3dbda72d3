//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and the
//! associated error types.

use crate::storage::Record;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for durable record store implementations
///
/// Every mutation is persisted before it returns. A failed mutation leaves the
/// in-memory view identical to the last successfully persisted state.
pub trait RecordStore {
    /// All records in sequence order
    fn records(&self) -> &[Record];

    /// Looks up a record by key
    fn get(&self, key: &str) -> Option<&Record>;

    fn len(&self) -> usize {
        self.records().len()
    }

    fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Appends a record as number `len() + 1`
    ///
    /// Any sequence number on `record` is overwritten. Fails with
    /// `DuplicateKey` if the key is already stored.
    ///
    /// # Returns
    ///
    /// The assigned sequence number
    fn append(&mut self, record: Record) -> StorageResult<u64>;

    /// Replaces the record stored under `key`, keeping its position and
    /// sequence number
    fn update_at(&mut self, key: &str, record: Record) -> StorageResult<()>;

    /// Drops every record whose key is not in `keep`
    ///
    /// Survivors keep their relative order and are renumbered 1..N. Cleanup
    /// of anything associated with the removed records is up to the caller.
    ///
    /// # Returns
    ///
    /// The removed records, in their former order
    fn remove_all_except(&mut self, keep: &HashSet<String>) -> StorageResult<Vec<Record>>;

    /// Removes every record
    fn clear(&mut self) -> StorageResult<()>;
}
