//! Source catalog module
//!
//! The catalog is produced by an external enumeration step and is read-only
//! here. This module loads it and gives every entry a stable, unique key.

mod key;
mod source;

pub use key::{derive_key, KeyAssigner};
pub use source::{items_from_entries, load_catalog, CatalogEntry, SourceItem};
