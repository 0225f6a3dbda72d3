//! Crawler module for the time-budgeted item pass
//!
//! This module contains the core crawling logic, including:
//! - The sequential crawl loop and its lifecycle
//! - Wiring config, catalog, store, fetcher and budget into a run
//! - The dry-run planner

mod coordinator;

pub use coordinator::{CrawlLoop, LoopSettings, RemovalHook};

use crate::budget::{listen_for_signals, ShutdownFlag, TimeBudget};
use crate::catalog::load_catalog;
use crate::config::{load_time_config, Config};
use crate::fetcher::HttpItemFetcher;
use crate::output::RunSummary;
use crate::reconcile::{classify, DefaultStalePolicy, ReconcileCounts};
use crate::storage::media::{clear_media_root, remove_media_dir};
use crate::storage::{open_store, JsonFileStore, RecordStore};
use crate::HarvestError;

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Load the time budget and the source catalog
/// 2. Install the SIGINT/SIGTERM listener
/// 3. Open (or, with `fresh`, reset) the record store and media root
/// 4. Build the HTTP item fetcher
/// 5. Drive the crawl loop to a terminal state
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `fresh` - Discard stored records and media before crawling
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run completed or stopped gracefully
/// * `Err(HarvestError)` - Startup failed, or a store write failed mid-run
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::load_config;
/// use catalog_harvest::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_harvest(&config, false).await?;
/// summary.print();
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: &Config, fresh: bool) -> Result<RunSummary, HarvestError> {
    let time = load_time_config(&config.paths.time_config);
    let items = load_catalog(&config.paths.catalog)?;

    let shutdown = ShutdownFlag::new();
    let signals = listen_for_signals(shutdown.clone());
    let budget = TimeBudget::from_config(&time, shutdown);

    if fresh {
        if let Some(root) = &config.paths.media_root {
            clear_media_root(root)?;
        }
    }
    let store = open_store(&config.paths.store, fresh)?;
    let fetcher = HttpItemFetcher::new(&config.fetcher, budget.clone())?;

    let mut crawl = CrawlLoop::new(store, fetcher, budget, LoopSettings::from_config(config))
        .with_policy(DefaultStalePolicy::new(config.crawl.recheck_unlisted));

    if let Some(root) = config.paths.media_root.clone() {
        crawl = crawl.on_removed(move |record| {
            if let Err(e) = remove_media_dir(&root, &record.key) {
                tracing::warn!("Failed to remove media for '{}': {}", record.key, e);
            }
        });
    }

    let result = crawl.run(&items).await;
    signals.abort();
    result
}

/// Classifies the catalog against the store without fetching or writing
pub fn plan_harvest(config: &Config) -> Result<ReconcileCounts, HarvestError> {
    let items = load_catalog(&config.paths.catalog)?;
    let store = JsonFileStore::open(&config.paths.store);
    let policy = DefaultStalePolicy::new(config.crawl.recheck_unlisted);

    let classified = classify(&items, store.records(), &policy);
    let mut counts = ReconcileCounts::from_classified(&classified);
    if !config.crawl.prune_discontinued || items.is_empty() {
        counts.remove = 0;
    }

    tracing::info!(
        "Plan: {} insert, {} update, {} skip, {} remove",
        counts.insert,
        counts.update,
        counts.skip,
        counts.remove
    );
    Ok(counts)
}
