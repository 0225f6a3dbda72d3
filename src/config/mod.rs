//! Configuration module for Catalog-Harvest
//!
//! Two files drive a run:
//!
//! - a TOML run configuration (paths, crawl loop settings, fetcher selectors),
//!   loaded once and validated; errors here are fatal
//! - a JSON time budget file, which never fails to load and falls back to
//!   defaults instead
//!
//! # Example
//!
//! ```no_run
//! use catalog_harvest::config::{load_config, load_time_config};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! let time = load_time_config(&config.paths.time_config);
//! println!("Budget: {:?} with {:?} grace", time.limit, time.grace);
//! ```

mod parser;
mod time;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, FetcherConfig, PathsConfig, SelectorConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

pub use time::{
    format_hhmm, load_time_config, parse_hhmm, TimeConfig, DEFAULT_GRACE_PERIOD,
    DEFAULT_TIME_LIMIT,
};
