use crate::catalog::key::{derive_key, KeyAssigner};
use crate::CatalogResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One entry of the authoritative catalog
///
/// Immutable once read. The same key may come back on a later run with a
/// different price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceItem {
    pub key: String,
    pub display_name: String,
    pub current_price: Option<String>,
    pub detail_url: Option<String>,
}

impl SourceItem {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            current_price: None,
            detail_url: None,
        }
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.current_price = Some(price.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.detail_url = Some(url.into());
        self
    }
}

/// On-disk catalog: `{"products": [...]}`
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    products: Vec<CatalogEntry>,
}

/// Raw catalog entry as written by the enumeration step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogEntry {
    #[serde(default, alias = "id")]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Reads the catalog file and assigns unique keys in file order
///
/// # Errors
///
/// Fails if the file cannot be read or is not valid catalog JSON. Unlike the
/// record store, a broken catalog is not recoverable: pruning against an
/// empty catalog would delete every stored record.
pub fn load_catalog(path: &Path) -> CatalogResult<Vec<SourceItem>> {
    let content = std::fs::read_to_string(path)?;
    let file: CatalogFile = serde_json::from_str(&content)?;
    let items = items_from_entries(file.products);

    tracing::info!("Loaded {} catalog items from {}", items.len(), path.display());
    Ok(items)
}

/// Turns raw entries into source items with unique keys
///
/// An explicit `unique_id` wins over a key derived from the name; both are
/// disambiguated against keys already handed out. Entries with neither a
/// usable id nor a usable name are skipped.
pub fn items_from_entries(entries: Vec<CatalogEntry>) -> Vec<SourceItem> {
    let mut keys = KeyAssigner::new();
    let mut items = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let name = entry
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let base = entry
            .unique_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| name.and_then(derive_key));

        let Some(base) = base else {
            tracing::warn!("Skipping catalog entry {}: no id or usable name", index);
            continue;
        };

        let key = keys.assign(&base);
        if key != base {
            tracing::debug!("Key collision on '{}', using '{}'", base, key);
        }

        items.push(SourceItem {
            display_name: name.map(str::to_string).unwrap_or_else(|| key.clone()),
            key,
            current_price: entry.price,
            detail_url: entry.url,
        });
    }

    items
}
