//! JSON file record store
//!
//! The whole store lives in one `{"products": [...]}` file that is rewritten
//! atomically on every mutation. This trades write amplification for the
//! guarantee that a crash never loses or corrupts a committed record.

use crate::storage::atomic::write_json_atomic;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::storage::Record;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct StoreFileRef<'a> {
    products: &'a [Record],
}

#[derive(Deserialize)]
struct StoreFile {
    #[serde(default)]
    products: Vec<Record>,
}

/// Ordered records plus a `key -> position` index
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl StoreState {
    /// Builds state from loaded records
    ///
    /// Later duplicates of a key are dropped and sequence numbers are
    /// rewritten to the dense 1..N order of the surviving records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut state = Self::default();
        for mut record in records {
            if state.index.contains_key(&record.key) {
                tracing::warn!("Dropping duplicate stored record '{}'", record.key);
                continue;
            }
            let position = state.records.len();
            let expected = position as u64 + 1;
            if record.sequence_number != expected {
                tracing::debug!(
                    "Renumbering '{}' from {} to {}",
                    record.key,
                    record.sequence_number,
                    expected
                );
                record.sequence_number = expected;
            }
            state.index.insert(record.key.clone(), position);
            state.records.push(record);
        }
        state
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.index.get(key).and_then(|&i| self.records.get(i))
    }

    pub fn digest(&self) -> String {
        records_digest(&self.records)
    }
}

/// SHA-256 of the serialised records, used to tell whether a run changed
/// anything
pub fn records_digest(records: &[Record]) -> String {
    let mut hasher = Sha256::new();
    match serde_json::to_vec(records) {
        Ok(bytes) => hasher.update(&bytes),
        Err(e) => tracing::warn!("Could not serialise store for digest: {}", e),
    }
    hex::encode(hasher.finalize())
}

/// Record store backed by a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: StoreState,
}

impl JsonFileStore {
    /// Opens the store at `path`
    ///
    /// A missing, unreadable or corrupt file yields an empty store: the file
    /// is a checkpoint and starting empty is always safe. Nothing is written
    /// until the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match load_records(&path) {
            Ok(records) => {
                tracing::info!("Loaded {} records from {}", records.len(), path.display());
                StoreState::from_records(records)
            }
            Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No store at {}, starting empty", path.display());
                StoreState::default()
            }
            Err(e) => {
                tracing::warn!(
                    "Store {} unreadable ({}), starting empty",
                    path.display(),
                    e
                );
                StoreState::default()
            }
        };

        Self { path, state }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn digest(&self) -> String {
        self.state.digest()
    }

    fn persist(&self, records: &[Record]) -> StorageResult<()> {
        write_json_atomic(&self.path, &StoreFileRef { products: records })
    }
}

fn load_records(path: &Path) -> StorageResult<Vec<Record>> {
    let content = std::fs::read_to_string(path)?;
    let file: StoreFile = serde_json::from_str(&content)?;
    Ok(file.products)
}

impl RecordStore for JsonFileStore {
    fn records(&self) -> &[Record] {
        self.state.records()
    }

    fn get(&self, key: &str) -> Option<&Record> {
        self.state.get(key)
    }

    fn append(&mut self, mut record: Record) -> StorageResult<u64> {
        if self.state.index.contains_key(&record.key) {
            return Err(StorageError::DuplicateKey(record.key));
        }

        let position = self.state.records.len();
        let sequence_number = position as u64 + 1;
        record.sequence_number = sequence_number;

        self.state.records.push(record);
        if let Err(e) = self.persist(&self.state.records) {
            self.state.records.pop();
            return Err(e);
        }

        if let Some(stored) = self.state.records.get(position) {
            self.state.index.insert(stored.key.clone(), position);
        }
        Ok(sequence_number)
    }

    fn update_at(&mut self, key: &str, mut record: Record) -> StorageResult<()> {
        let position = *self
            .state
            .index
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        let slot = self
            .state
            .records
            .get_mut(position)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        record.key = key.to_string();
        record.sequence_number = slot.sequence_number;
        let previous = std::mem::replace(slot, record);

        if let Err(e) = self.persist(&self.state.records) {
            if let Some(slot) = self.state.records.get_mut(position) {
                *slot = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    fn remove_all_except(&mut self, keep: &HashSet<String>) -> StorageResult<Vec<Record>> {
        if self.state.records.iter().all(|r| keep.contains(&r.key)) {
            return Ok(Vec::new());
        }

        let (kept, removed): (Vec<Record>, Vec<Record>) = self
            .state
            .records
            .iter()
            .cloned()
            .partition(|r| keep.contains(&r.key));

        let next = StoreState::from_records(kept);
        self.persist(next.records())?;
        self.state = next;
        Ok(removed)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.persist(&[])?;
        self.state = StoreState::default();
        Ok(())
    }
}
