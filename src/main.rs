//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the Catalog-Harvest crawler.

use anyhow::Context;
use catalog_harvest::catalog::load_catalog;
use catalog_harvest::config::{
    format_hhmm, load_config_with_hash, load_time_config, parse_hhmm, Config,
};
use catalog_harvest::crawler::{plan_harvest, run_harvest};
use catalog_harvest::output::{load_statistics, match_catalog, print_statistics};
use catalog_harvest::storage::JsonFileStore;
use catalog_harvest::RecordStore;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: a resumable, time-budgeted catalog crawler
///
/// Catalog-Harvest walks a product catalog, enriches each item from its
/// detail page, and keeps a durable JSON record store in sync with the
/// catalog. Runs stop cleanly when the time budget's grace period is reached
/// or on SIGINT/SIGTERM, and pick up where they left off next time.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable, time-budgeted catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard stored records and media before crawling
    #[arg(long)]
    fresh: bool,

    /// Show what a run would insert, update, skip and remove, then exit
    #[arg(long, conflicts_with_all = ["stats", "set_time", "fresh"])]
    dry_run: bool,

    /// Show store statistics and the catalog match, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "set_time", "fresh"])]
    stats: bool,

    /// Set the run time limit (HH:MM) in the time config file, then exit
    #[arg(long, value_name = "HH:MM", conflicts_with_all = ["dry_run", "stats", "fresh"])]
    set_time: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if let Some(limit) = &cli.set_time {
        handle_set_time(&config, limit)?;
    } else if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config);
    } else {
        return handle_harvest(&config, cli.fresh).await;
    }

    Ok(ExitCode::SUCCESS)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --set-time: rewrites the limit, keeping the current grace period
fn handle_set_time(config: &Config, limit: &str) -> anyhow::Result<()> {
    let path = &config.paths.time_config;
    let mut time = load_time_config(path);
    time.limit = parse_hhmm(limit)?;

    if time.grace >= time.limit {
        tracing::warn!(
            "Grace period {} is not shorter than the new limit {}",
            format_hhmm(time.grace),
            format_hhmm(time.limit)
        );
    }

    time.write(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "✓ Time limit set to {} (grace {}) in {}",
        format_hhmm(time.limit),
        format_hhmm(time.grace),
        path.display()
    );
    Ok(())
}

/// Handles --dry-run: classifies the catalog against the store
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Catalog-Harvest Dry Run ===\n");

    let time = load_time_config(&config.paths.time_config);
    println!("Paths:");
    println!("  Catalog: {}", config.paths.catalog.display());
    println!("  Store: {}", config.paths.store.display());
    if let Some(root) = &config.paths.media_root {
        println!("  Media root: {}", root.display());
    }
    println!("\nBudget:");
    println!("  Time limit: {}", format_hhmm(time.limit));
    println!("  Grace period: {}", format_hhmm(time.grace));
    println!("  Inter-item delay: {}ms", config.crawl.inter_item_delay_ms);
    println!("  Re-check unlisted: {}", config.crawl.recheck_unlisted);

    let plan = plan_harvest(config)?;
    println!("\nPlanned Actions:");
    println!("  Insert: {}", plan.insert);
    println!("  Update: {}", plan.update);
    println!("  Skip: {}", plan.skip);
    println!("  Remove: {}", plan.remove);

    println!("\n✓ Configuration is valid");
    println!("✓ Would fetch {} items", plan.insert + plan.update);
    Ok(())
}

/// Handles --stats: store statistics plus the catalog/store match
fn handle_stats(config: &Config) {
    println!("Store: {}\n", config.paths.store.display());

    let store = JsonFileStore::open(&config.paths.store);
    let stats = load_statistics(store.records());

    let matched = match load_catalog(&config.paths.catalog) {
        Ok(items) => Some(match_catalog(&items, store.records())),
        Err(e) => {
            tracing::warn!("Catalog unavailable, skipping match: {}", e);
            None
        }
    };

    print_statistics(&stats, matched.as_ref());
}

/// Handles the main harvest run and maps its outcome to an exit code
async fn handle_harvest(config: &Config, fresh: bool) -> anyhow::Result<ExitCode> {
    if fresh {
        tracing::info!("Starting fresh harvest (discarding stored records)");
    } else {
        tracing::info!("Starting harvest (stored records are reused)");
    }

    match run_harvest(config, fresh).await {
        Ok(summary) => {
            summary.print();
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e).context("Harvest failed")
        }
    }
}
