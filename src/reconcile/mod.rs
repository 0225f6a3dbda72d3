//! Reconciliation of the source catalog against the record store
//!
//! This module handles:
//! - Per-item decisions (skip, update, insert)
//! - Detection of records whose source item disappeared
//! - The pluggable staleness policy

mod policy;

pub use policy::{DefaultStalePolicy, StalePredicate};

use crate::catalog::SourceItem;
use crate::storage::Record;
use serde::Serialize;
use std::collections::HashSet;

/// What to do with one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Stored and fresh: no I/O
    Skip,
    /// Stored but stale: fetch and replace in place
    Update,
    /// Not stored yet: fetch and append
    Insert,
    /// Stored but gone from the source
    Remove,
}

impl Decision {
    /// Whether acting on this decision needs a fetch
    pub fn needs_fetch(&self) -> bool {
        matches!(self, Self::Update | Self::Insert)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Update => "update",
            Self::Insert => "insert",
            Self::Remove => "remove",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides what to do with a source item given its stored record, if any
pub fn decide(item: &SourceItem, stored: Option<&Record>, stale: &dyn StalePredicate) -> Decision {
    match stored {
        None => Decision::Insert,
        Some(record) if stale.is_stale(record, item) => Decision::Update,
        Some(_) => Decision::Skip,
    }
}

/// A key and the decision made for it
#[derive(Debug, Clone, PartialEq)]
pub struct Classified<'a> {
    pub key: &'a str,
    pub decision: Decision,
    /// The source item, absent for `Remove`
    pub item: Option<&'a SourceItem>,
}

/// Classifies every key of the source and the store
///
/// Each key lands in exactly one class. Source keys come first in source
/// order, followed by removals in store order.
pub fn classify<'a>(
    source: &'a [SourceItem],
    persisted: &'a [Record],
    stale: &dyn StalePredicate,
) -> Vec<Classified<'a>> {
    let by_key: std::collections::HashMap<&str, &Record> =
        persisted.iter().map(|r| (r.key.as_str(), r)).collect();
    let source_keys: HashSet<&str> = source.iter().map(|i| i.key.as_str()).collect();

    let mut out = Vec::with_capacity(source.len() + persisted.len());
    for item in source {
        out.push(Classified {
            key: &item.key,
            decision: decide(item, by_key.get(item.key.as_str()).copied(), stale),
            item: Some(item),
        });
    }

    for record in persisted {
        if !source_keys.contains(record.key.as_str()) {
            out.push(Classified {
                key: &record.key,
                decision: Decision::Remove,
                item: None,
            });
        }
    }

    out
}

/// Tally of decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileCounts {
    pub skip: usize,
    pub update: usize,
    pub insert: usize,
    pub remove: usize,
}

impl ReconcileCounts {
    pub fn from_classified(classified: &[Classified<'_>]) -> Self {
        let mut counts = Self::default();
        for c in classified {
            match c.decision {
                Decision::Skip => counts.skip += 1,
                Decision::Update => counts.update += 1,
                Decision::Insert => counts.insert += 1,
                Decision::Remove => counts.remove += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.skip + self.update + self.insert + self.remove
    }
}
