//! Staleness policy
//!
//! Decides whether an already-stored record needs to be fetched again.

use crate::catalog::SourceItem;
use crate::storage::Record;

/// Judges whether a persisted record is out of date against its source item
pub trait StalePredicate {
    fn is_stale(&self, record: &Record, item: &SourceItem) -> bool;
}

impl<F> StalePredicate for F
where
    F: Fn(&Record, &SourceItem) -> bool,
{
    fn is_stale(&self, record: &Record, item: &SourceItem) -> bool {
        self(record, item)
    }
}

/// Default policy
///
/// A record is stale when the catalog price changed, or when the previous
/// cross-retailer lookup failed and `recheck_unlisted` is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultStalePolicy {
    pub recheck_unlisted: bool,
}

impl DefaultStalePolicy {
    pub fn new(recheck_unlisted: bool) -> Self {
        Self { recheck_unlisted }
    }
}

impl Default for DefaultStalePolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StalePredicate for DefaultStalePolicy {
    fn is_stale(&self, record: &Record, item: &SourceItem) -> bool {
        if record.price != item.current_price {
            return true;
        }
        self.recheck_unlisted && !record.is_listed()
    }
}
