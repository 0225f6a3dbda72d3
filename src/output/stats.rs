//! Statistics over the record store
//!
//! This module provides functionality for summarising the persisted records
//! and for checking the store against the current catalog.

use crate::catalog::SourceItem;
use crate::storage::Record;
use serde::Serialize;
use std::collections::HashSet;

/// Record store statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatistics {
    /// Total number of stored records
    pub total_records: usize,

    /// Records with a resolved cross-retailer listing
    pub listed: usize,

    /// Records still awaiting a successful lookup
    pub unlisted: usize,

    pub with_external_id: usize,
    pub with_reference_price: usize,
    pub with_media: usize,
    pub with_spec_sections: usize,
}

/// How the catalog and the store line up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogMatch {
    pub catalog_count: usize,
    pub store_count: usize,
    /// Catalog keys with no stored record, in catalog order
    pub missing_from_store: Vec<String>,
    /// Stored keys no longer in the catalog, in store order
    pub missing_from_catalog: Vec<String>,
}

impl CatalogMatch {
    /// True when both sides hold exactly the same keys
    pub fn is_exact(&self) -> bool {
        self.missing_from_store.is_empty() && self.missing_from_catalog.is_empty()
    }
}

/// Computes statistics over the stored records
pub fn load_statistics(records: &[Record]) -> StoreStatistics {
    let mut stats = StoreStatistics {
        total_records: records.len(),
        ..StoreStatistics::default()
    };

    for record in records {
        if record.is_listed() {
            stats.listed += 1;
        } else {
            stats.unlisted += 1;
        }
        if record.external_id.is_some() {
            stats.with_external_id += 1;
        }
        if record.reference_price.is_some() {
            stats.with_reference_price += 1;
        }
        if !record.media_refs.is_empty() {
            stats.with_media += 1;
        }
        if !record.spec_sections.is_empty() {
            stats.with_spec_sections += 1;
        }
    }

    stats
}

/// Compares catalog keys with stored keys
pub fn match_catalog(items: &[SourceItem], records: &[Record]) -> CatalogMatch {
    let catalog_keys: HashSet<&str> = items.iter().map(|i| i.key.as_str()).collect();
    let store_keys: HashSet<&str> = records.iter().map(|r| r.key.as_str()).collect();

    CatalogMatch {
        catalog_count: items.len(),
        store_count: records.len(),
        missing_from_store: items
            .iter()
            .filter(|i| !store_keys.contains(i.key.as_str()))
            .map(|i| i.key.clone())
            .collect(),
        missing_from_catalog: records
            .iter()
            .filter(|r| !catalog_keys.contains(r.key.as_str()))
            .map(|r| r.key.clone())
            .collect(),
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `matched` - Catalog comparison, when the catalog could be read
pub fn print_statistics(stats: &StoreStatistics, matched: Option<&CatalogMatch>) {
    let total = stats.total_records;

    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", total);
    println!(
        "  Listed: {} ({:.1}%)",
        stats.listed,
        percent(stats.listed, total)
    );
    println!(
        "  Unlisted: {} ({:.1}%)",
        stats.unlisted,
        percent(stats.unlisted, total)
    );
    println!();

    println!("Enrichment:");
    println!("  With external id: {}", stats.with_external_id);
    println!("  With reference price: {}", stats.with_reference_price);
    println!("  With media: {}", stats.with_media);
    println!("  With spec sections: {}", stats.with_spec_sections);
    println!();

    if let Some(m) = matched {
        println!("Catalog Match:");
        println!("  Catalog items: {}", m.catalog_count);
        println!("  Stored records: {}", m.store_count);
        if m.is_exact() {
            println!("  Catalog and store match");
        } else {
            println!("  Not yet stored: {}", m.missing_from_store.len());
            for key in m.missing_from_store.iter().take(10) {
                println!("    - {}", key);
            }
            println!("  No longer in catalog: {}", m.missing_from_catalog.len());
            for key in m.missing_from_catalog.iter().take(10) {
                println!("    - {}", key);
            }
        }
    }
}
