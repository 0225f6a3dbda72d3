//! Item fetcher module
//!
//! The crawl loop never talks to the network itself. It hands each source
//! item to an [`ItemFetcher`], which returns either the enrichment for that
//! item or a typed [`FetchFailure`]. Retries and any internal pooling are the
//! fetcher's business; the loop calls `fetch` once per item.
//!
//! [`HttpItemFetcher`] is the stock implementation: a plain GET of the item's
//! detail page followed by selector-driven extraction.

mod extract;
mod http;

pub use extract::{clean_text, extract_enrichment, CompiledSelectors, ExternalIdRule};
pub use http::{build_http_client, HttpItemFetcher};

use crate::catalog::SourceItem;
use crate::storage::{SpecSections, VariantAttribute};
use async_trait::async_trait;
use thiserror::Error;

/// Fields the fetcher adds on top of the catalog data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub reference_price: Option<String>,
    pub media_refs: Vec<String>,
    pub variant_attributes: Vec<VariantAttribute>,
    pub quality_score: Option<String>,
    pub spec_sections: SpecSections,
    /// Cross-retailer identifier; its presence marks the record as listed
    pub external_id: Option<String>,
}

/// Why an item could not be enriched
///
/// Never fatal to a run: the loop records the item as unresolved and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("Item '{0}' has no detail URL")]
    MissingDetailUrl(String),

    #[error("Invalid detail URL '{0}'")]
    InvalidUrl(String),

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Expected HTML from {url}, got '{content_type}'")]
    ContentMismatch { url: String, content_type: String },

    #[error("Fetch interrupted by shutdown")]
    Interrupted,
}

impl FetchFailure {
    /// Transient failures worth another attempt: server errors and timeouts
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Result type for a single fetch
pub type FetchResult = Result<Enrichment, FetchFailure>;

/// Collaborator that enriches one source item at a time
///
/// `fetch` is awaited to completion before the loop makes its next decision,
/// so any side effects it has are finished by the time it returns.
#[async_trait]
pub trait ItemFetcher: Send {
    async fn fetch(&mut self, item: &SourceItem) -> FetchResult;

    /// Releases held resources; called once on every exit path of a run
    async fn close(&mut self) {}
}
