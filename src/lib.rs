//! Catalog-Harvest: a resumable, time-budgeted catalog crawl
//!
//! This crate walks a product catalog one item at a time, enriches each item
//! through an [`fetcher::ItemFetcher`], and commits the result to a durable
//! record store. Runs are bounded by a wall-clock budget with a grace period,
//! and every commit is persisted atomically so an interrupted run never loses
//! completed work.

pub mod budget;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod fetcher;
pub mod output;
pub mod reconcile;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlState,
        to: state::CrawlState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid time value '{0}': expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Errors raised while reading the source catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

// Re-export commonly used types
pub use budget::{ShutdownFlag, TimeBudget};
pub use catalog::SourceItem;
pub use config::Config;
pub use crawler::CrawlLoop;
pub use reconcile::Decision;
pub use state::CrawlState;
pub use storage::{JsonFileStore, Record, RecordStore};
