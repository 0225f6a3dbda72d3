//! Crawl loop - main orchestration logic
//!
//! This module contains the loop that drives a run:
//! - Walking the source items strictly in order
//! - Reconciling each item against the live store
//! - Calling the item fetcher and committing the outcome
//! - Honouring the time budget and shutdown requests
//! - Pruning discontinued records and emitting the final summary

use crate::budget::TimeBudget;
use crate::catalog::SourceItem;
use crate::config::Config;
use crate::fetcher::ItemFetcher;
use crate::output::{write_checkpoint, Progress, RunCounts, RunSummary};
use crate::reconcile::{decide, Decision, DefaultStalePolicy, StalePredicate};
use crate::state::CrawlState;
use crate::storage::{records_digest, Record, RecordStore, StorageError};
use crate::HarvestError;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Callback invoked for every record pruned from the store
pub type RemovalHook = Box<dyn FnMut(&Record) + Send>;

/// Loop knobs, usually taken from the `[crawl]` config section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    /// Pause after each fetched item
    pub inter_item_delay: Duration,
    /// Log the time status every N processed items
    pub status_every: usize,
    /// Drop stored records whose key left the catalog
    pub prune_discontinued: bool,
    /// Progress checkpoint file, rewritten after every commit
    pub checkpoint: Option<PathBuf>,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            inter_item_delay: Duration::from_millis(config.crawl.inter_item_delay_ms),
            status_every: config.crawl.status_every.max(1) as usize,
            prune_discontinued: config.crawl.prune_discontinued,
            checkpoint: config.paths.checkpoint.clone(),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            inter_item_delay: Duration::from_secs(1),
            status_every: 10,
            prune_discontinued: true,
            checkpoint: None,
        }
    }
}

/// Why the item pass ended
enum PassEnd {
    Exhausted,
    Stopped,
}

/// Sequential crawl over a source item set
///
/// Owns the store and the fetcher for the duration of a run. Items are
/// handled one at a time: each decision is made against the store as it
/// stands after every earlier commit, and each fetch finishes before the
/// next decision.
pub struct CrawlLoop<S: RecordStore, F: ItemFetcher> {
    store: S,
    fetcher: F,
    budget: TimeBudget,
    policy: Box<dyn StalePredicate + Send + Sync>,
    settings: LoopSettings,
    removal_hooks: Vec<RemovalHook>,
    state: CrawlState,
}

impl<S: RecordStore, F: ItemFetcher> CrawlLoop<S, F> {
    /// Creates a loop with the default staleness policy
    ///
    /// # Arguments
    ///
    /// * `store` - Durable record store, possibly already populated
    /// * `fetcher` - Enrichment collaborator
    /// * `budget` - Time budget shared with the fetcher
    /// * `settings` - Loop knobs
    pub fn new(store: S, fetcher: F, budget: TimeBudget, settings: LoopSettings) -> Self {
        Self {
            store,
            fetcher,
            budget,
            policy: Box::new(DefaultStalePolicy::default()),
            settings,
            removal_hooks: Vec::new(),
            state: CrawlState::Idle,
        }
    }

    /// Replaces the staleness policy
    pub fn with_policy<P>(mut self, policy: P) -> Self
    where
        P: StalePredicate + Send + Sync + 'static,
    {
        self.policy = Box::new(policy);
        self
    }

    /// Registers a callback run for each record removed by pruning
    pub fn on_removed<H>(mut self, hook: H) -> Self
    where
        H: FnMut(&Record) + Send + 'static,
    {
        self.removal_hooks.push(Box::new(hook));
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Consumes the loop, handing back the store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Consumes the loop, handing back the store and the fetcher
    pub fn into_parts(self) -> (S, F) {
        (self.store, self.fetcher)
    }

    fn transition(&mut self, next: CrawlState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Crawl state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Runs the loop over `items` until they are exhausted, the budget runs
    /// out, or a shutdown is requested
    ///
    /// The fetcher is closed and a summary is logged on every exit path.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run ended `Completed` or `GracefulStop`
    /// * `Err(HarvestError)` - A store write failed (state `Failed`); every
    ///   earlier commit is already durable
    pub async fn run(&mut self, items: &[SourceItem]) -> Result<RunSummary, HarvestError> {
        if let Err(e) = self.transition(CrawlState::Running) {
            self.fetcher.close().await;
            return Err(e);
        }

        let digest_before = records_digest(self.store.records());
        let mut counts = RunCounts::default();
        tracing::info!(
            "Starting item pass: {} source items, {} stored records",
            items.len(),
            self.store.len()
        );

        let outcome = match self.item_pass(items, &mut counts).await {
            Ok(end) => self.prune(items, &mut counts).map(|()| end),
            Err(e) => Err(e),
        };

        let final_state = match &outcome {
            Ok(PassEnd::Exhausted) => CrawlState::Completed,
            Ok(PassEnd::Stopped) => CrawlState::GracefulStop,
            Err(_) => CrawlState::Failed,
        };

        self.fetcher.close().await;
        if final_state == CrawlState::GracefulStop {
            self.budget.log_status(None, counts.processed(), items.len());
        }
        self.transition(final_state)?;

        let summary = RunSummary {
            state: self.state,
            counts,
            total_items: items.len(),
            store_changed: records_digest(self.store.records()) != digest_before,
            store_records: self.store.len(),
            time_status: self.budget.status(),
            finished_at: chrono::Local::now().to_rfc3339(),
        };
        summary.log();

        outcome.map(|_| summary)
    }

    async fn item_pass(
        &mut self,
        items: &[SourceItem],
        counts: &mut RunCounts,
    ) -> Result<PassEnd, HarvestError> {
        let total = items.len();

        for (index, item) in items.iter().enumerate() {
            if !self.budget.should_continue() {
                counts.remaining = total - index;
                self.log_stop(Some(&item.key));
                return Ok(PassEnd::Stopped);
            }

            let decision = decide(item, self.store.get(&item.key), &*self.policy);
            if decision == Decision::Skip {
                tracing::debug!("[{}/{}] Skipping '{}'", index + 1, total, item.key);
                counts.record(decision);
                continue;
            }

            tracing::info!(
                "[{}/{}] {} '{}'",
                index + 1,
                total,
                if decision == Decision::Insert { "Inserting" } else { "Updating" },
                item.display_name
            );

            let record = match self.fetcher.fetch(item).await {
                Ok(enrichment) => Record::enriched(item, enrichment),
                Err(failure) => {
                    tracing::warn!("Recording '{}' as unresolved: {}", item.key, failure);
                    counts.failed += 1;
                    Record::unresolved(item)
                }
            };

            self.commit(decision, record)?;
            counts.record(decision);
            self.checkpoint(Some(&item.key), index + 1, total, counts);

            if (index + 1) % self.settings.status_every == 0 {
                self.budget.log_status(Some(&item.key), index + 1, total);
            }

            let last = index + 1 == total;
            if !last && !self.budget.interruptible_wait(self.settings.inter_item_delay).await {
                counts.remaining = total - index - 1;
                self.log_stop(None);
                return Ok(PassEnd::Stopped);
            }
        }

        Ok(PassEnd::Exhausted)
    }

    fn commit(&mut self, decision: Decision, record: Record) -> Result<(), HarvestError> {
        let key = record.key.clone();
        let result = match decision {
            Decision::Update => self.store.update_at(&key, record),
            _ => self.store.append(record).map(|sequence| {
                tracing::debug!("Appended '{}' as #{}", key, sequence);
            }),
        };

        result.map_err(|e: StorageError| {
            tracing::error!("Failed to commit '{}': {}", key, e);
            HarvestError::from(e)
        })
    }

    /// Applies `Remove` decisions in one commit after the item pass
    fn prune(&mut self, items: &[SourceItem], counts: &mut RunCounts) -> Result<(), HarvestError> {
        if !self.settings.prune_discontinued {
            return Ok(());
        }
        if items.is_empty() {
            tracing::warn!(
                "Source set is empty, not pruning {} stored records",
                self.store.len()
            );
            return Ok(());
        }

        let keep: HashSet<String> = items.iter().map(|i| i.key.clone()).collect();
        let removed = self.store.remove_all_except(&keep).map_err(|e| {
            tracing::error!("Failed to prune discontinued records: {}", e);
            HarvestError::from(e)
        })?;

        for record in &removed {
            tracing::info!("Removed discontinued record '{}'", record.key);
            counts.record(Decision::Remove);
            for hook in &mut self.removal_hooks {
                hook(record);
            }
        }
        Ok(())
    }

    fn checkpoint(
        &self,
        current: Option<&str>,
        processed: usize,
        total: usize,
        counts: &RunCounts,
    ) {
        let Some(path) = &self.settings.checkpoint else {
            return;
        };

        let progress = Progress {
            current_item: current,
            processed,
            total,
            counts: *counts,
        };
        if let Err(e) = write_checkpoint(path, &self.budget, &progress) {
            tracing::warn!("Failed to write checkpoint {}: {}", path.display(), e);
        }
    }

    fn log_stop(&self, next: Option<&str>) {
        let reason = if self.budget.shutdown_flag().is_requested() {
            "shutdown requested"
        } else {
            "time budget reached its grace period"
        };
        match next {
            Some(key) => tracing::warn!("Stopping before '{}': {}", key, reason),
            None => tracing::warn!("Stopping: {}", reason),
        }
    }
}
