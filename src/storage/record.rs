//! Persisted record model
//!
//! Field names on disk follow the store file format consumed by the site
//! front end (`id`, `count`, `listed`, `mrp`, `asin`, ...), while the Rust
//! names describe what each field means.

use crate::catalog::SourceItem;
use crate::fetcher::Enrichment;
use serde::{Deserialize, Deserializer, Serialize};
use indexmap::IndexMap;

/// Whether the cross-retailer lookup for a record succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListedStatus {
    Yes,
    #[default]
    No,
}

impl ListedStatus {
    pub fn is_listed(&self) -> bool {
        matches!(self, Self::Yes)
    }
}

/// A purchasable variant (storage/RAM configuration) and its price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAttribute {
    #[serde(rename = "size")]
    pub label: Option<String>,
    pub price: Option<String>,
}

/// One row of a specification table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecEntry {
    #[serde(rename = "specification")]
    pub attribute: String,
    pub value: String,
}

/// Specification tables by section title, in page order
pub type SpecSections = IndexMap<String, Vec<SpecEntry>>;

/// The durable, enriched unit keyed by a stable identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "id")]
    pub key: String,

    #[serde(rename = "name")]
    pub display_name: String,

    /// Dense 1..N position assigned on append, stable under updates
    #[serde(rename = "count")]
    pub sequence_number: u64,

    #[serde(rename = "listed", default)]
    pub listed_status: ListedStatus,

    #[serde(default)]
    pub price: Option<String>,

    /// "Was" price from the cross-reference retailer
    #[serde(rename = "mrp", default, deserialize_with = "blank_as_none")]
    pub reference_price: Option<String>,

    #[serde(rename = "url", default)]
    pub detail_url: Option<String>,

    #[serde(rename = "images", default, deserialize_with = "null_as_default")]
    pub media_refs: Vec<String>,

    #[serde(rename = "variants", default, deserialize_with = "null_as_default")]
    pub variant_attributes: Vec<VariantAttribute>,

    /// Cross-retailer identifier
    #[serde(rename = "asin", default)]
    pub external_id: Option<String>,

    #[serde(rename = "spec_score", default)]
    pub quality_score: Option<String>,

    #[serde(rename = "features", default, deserialize_with = "null_as_default")]
    pub spec_sections: SpecSections,
}

impl Record {
    /// A recorded failure: identity and price from the catalog, no enrichment
    ///
    /// The sequence number is left at 0 and assigned by the store.
    pub fn unresolved(item: &SourceItem) -> Self {
        Self {
            key: item.key.clone(),
            display_name: item.display_name.clone(),
            sequence_number: 0,
            listed_status: ListedStatus::No,
            price: item.current_price.clone(),
            reference_price: None,
            detail_url: item.detail_url.clone(),
            media_refs: Vec::new(),
            variant_attributes: Vec::new(),
            external_id: None,
            quality_score: None,
            spec_sections: SpecSections::new(),
        }
    }

    /// Builds a record from a successful fetch
    ///
    /// The record is `listed` only when the fetcher resolved an external id;
    /// otherwise the enrichment is kept but the record stays eligible for a
    /// retry on the next run.
    pub fn enriched(item: &SourceItem, enrichment: Enrichment) -> Self {
        let listed_status = if enrichment.external_id.is_some() {
            ListedStatus::Yes
        } else {
            ListedStatus::No
        };

        Self {
            listed_status,
            reference_price: enrichment.reference_price,
            media_refs: enrichment.media_refs,
            variant_attributes: enrichment.variant_attributes,
            external_id: enrichment.external_id,
            quality_score: enrichment.quality_score,
            spec_sections: enrichment.spec_sections,
            ..Self::unresolved(item)
        }
    }

    pub fn is_listed(&self) -> bool {
        self.listed_status.is_listed()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}
