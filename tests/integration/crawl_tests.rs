//! Integration tests for the crawl loop
//!
//! The loop is driven with a scripted in-process fetcher for the store and
//! budget properties, and with wiremock for the HTTP fetcher.

use async_trait::async_trait;
use catalog_harvest::budget::{ShutdownFlag, TimeBudget};
use catalog_harvest::config::{Config, CrawlConfig, FetcherConfig, PathsConfig, SelectorConfig};
use catalog_harvest::crawler::{run_harvest, CrawlLoop, LoopSettings};
use catalog_harvest::fetcher::{
    Enrichment, FetchFailure, FetchResult, HttpItemFetcher, ItemFetcher,
};
use catalog_harvest::output::RunSummary;
use catalog_harvest::reconcile::{classify, Decision, DefaultStalePolicy};
use catalog_harvest::storage::{
    JsonFileStore, ListedStatus, Record, RecordStore, StorageError, StorageResult,
};
use catalog_harvest::{CrawlState, HarvestError, SourceItem};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ===== Helpers =====

/// Fetcher with a fixed script: listed enrichment unless the key is failing
#[derive(Default)]
struct ScriptedFetcher {
    failing: HashSet<String>,
    calls: Vec<String>,
    closed: usize,
    /// Requests shutdown while fetching this key
    stop_during: Option<(String, ShutdownFlag)>,
}

impl ScriptedFetcher {
    fn failing(keys: &[&str]) -> Self {
        Self {
            failing: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ItemFetcher for ScriptedFetcher {
    async fn fetch(&mut self, item: &SourceItem) -> FetchResult {
        self.calls.push(item.key.clone());

        if let Some((key, flag)) = &self.stop_during {
            if *key == item.key {
                flag.request();
            }
        }

        if self.failing.contains(&item.key) {
            return Err(FetchFailure::Http {
                url: format!("https://shop.example/{}", item.key),
                status: 404,
            });
        }

        Ok(Enrichment {
            reference_price: Some("₹14,999".to_string()),
            media_refs: vec![format!("https://cdn.example/{}/1.jpg", item.key)],
            external_id: Some(format!("B0{}", item.key.to_uppercase().replace('_', ""))),
            ..Enrichment::default()
        })
    }

    async fn close(&mut self) {
        self.closed += 1;
    }
}

/// Store that fails every append after the first `appends_left`
struct FailingStore {
    inner: JsonFileStore,
    appends_left: usize,
}

impl RecordStore for FailingStore {
    fn records(&self) -> &[Record] {
        self.inner.records()
    }

    fn get(&self, key: &str) -> Option<&Record> {
        self.inner.get(key)
    }

    fn append(&mut self, record: Record) -> StorageResult<u64> {
        if self.appends_left == 0 {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated crash",
            )));
        }
        self.appends_left -= 1;
        self.inner.append(record)
    }

    fn update_at(&mut self, key: &str, record: Record) -> StorageResult<()> {
        self.inner.update_at(key, record)
    }

    fn remove_all_except(&mut self, keep: &HashSet<String>) -> StorageResult<Vec<Record>> {
        self.inner.remove_all_except(keep)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.inner.clear()
    }
}

fn no_delay() -> LoopSettings {
    LoopSettings {
        inter_item_delay: Duration::ZERO,
        ..LoopSettings::default()
    }
}

fn long_budget() -> TimeBudget {
    TimeBudget::new(
        Duration::from_secs(3600),
        Duration::from_secs(60),
        ShutdownFlag::new(),
    )
}

fn item(key: &str, price: &str) -> SourceItem {
    SourceItem::new(key, key.replace('_', " ")).with_price(price)
}

fn keyed_items(count: usize) -> Vec<SourceItem> {
    (1..=count)
        .map(|i| item(&format!("phone_{}", i), "₹1,000"))
        .collect()
}

async fn run_once(
    store_path: &Path,
    fetcher: ScriptedFetcher,
    items: &[SourceItem],
) -> (RunSummary, ScriptedFetcher) {
    let store = JsonFileStore::open(store_path);
    let mut crawl = CrawlLoop::new(store, fetcher, long_budget(), no_delay());
    let summary = crawl.run(items).await.expect("run should succeed");
    let (_, fetcher) = crawl.into_parts();
    (summary, fetcher)
}

fn stored_keys(store: &JsonFileStore) -> Vec<(String, u64)> {
    store
        .records()
        .iter()
        .map(|r| (r.key.clone(), r.sequence_number))
        .collect()
}

// ===== Scripted fetcher scenarios =====

#[tokio::test]
async fn test_end_to_end_insert_update_remove() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store.json");

    // Run 1: empty store, both items inserted in order
    let source = vec![item("phone_a", "₹10,000"), item("phone_b", "₹20,000")];
    let (summary, fetcher) = run_once(&store_path, ScriptedFetcher::default(), &source).await;
    assert_eq!(summary.state, CrawlState::Completed);
    assert_eq!(summary.counts.inserted, 2);
    assert_eq!(fetcher.closed, 1);

    let store = JsonFileStore::open(&store_path);
    assert_eq!(
        stored_keys(&store),
        vec![("phone_a".to_string(), 1), ("phone_b".to_string(), 2)]
    );

    // Run 2: phone_a price drops, phone_b untouched
    let source = vec![item("phone_a", "₹9,500"), item("phone_b", "₹20,000")];
    let (summary, fetcher) = run_once(&store_path, ScriptedFetcher::default(), &source).await;
    assert_eq!(summary.counts.updated, 1);
    assert_eq!(summary.counts.skipped, 1);
    assert_eq!(summary.counts.inserted, 0);
    assert_eq!(fetcher.calls, vec!["phone_a".to_string()]);

    let store = JsonFileStore::open(&store_path);
    assert_eq!(store.len(), 2);
    let a = store.get("phone_a").unwrap();
    assert_eq!(a.sequence_number, 1);
    assert_eq!(a.price.as_deref(), Some("₹9,500"));
    assert_eq!(store.records()[0].key, "phone_a");

    // Run 3: phone_a discontinued
    let source = vec![item("phone_b", "₹20,000")];
    let (summary, fetcher) = run_once(&store_path, ScriptedFetcher::default(), &source).await;
    assert_eq!(summary.counts.removed, 1);
    assert!(fetcher.calls.is_empty());

    let store = JsonFileStore::open(&store_path);
    assert_eq!(store.len(), 1);
    assert!(store.get("phone_a").is_none());
    assert_eq!(store.get("phone_b").unwrap().sequence_number, 1);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store.json");
    let source = keyed_items(4);

    run_once(&store_path, ScriptedFetcher::default(), &source).await;
    let before = std::fs::read(&store_path).unwrap();

    let (summary, fetcher) = run_once(&store_path, ScriptedFetcher::default(), &source).await;
    assert_eq!(summary.counts.inserted, 0);
    assert_eq!(summary.counts.updated, 0);
    assert_eq!(summary.counts.skipped, 4);
    assert!(!summary.store_changed);
    assert!(fetcher.calls.is_empty());
    assert_eq!(std::fs::read(&store_path).unwrap(), before);
}

#[tokio::test]
async fn test_crash_keeps_exactly_committed_records() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store.json");
    let source = keyed_items(5);

    let store = FailingStore {
        inner: JsonFileStore::open(&store_path),
        appends_left: 3,
    };
    let mut crawl = CrawlLoop::new(store, ScriptedFetcher::default(), long_budget(), no_delay());
    let err = crawl.run(&source).await.unwrap_err();

    assert!(matches!(err, HarvestError::Storage(_)));
    assert_eq!(crawl.state(), CrawlState::Failed);
    assert_eq!(crawl.fetcher().closed, 1);

    // Restart: exactly the first three, in order, and the file parses
    let store = JsonFileStore::open(&store_path);
    assert_eq!(
        stored_keys(&store),
        vec![
            ("phone_1".to_string(), 1),
            ("phone_2".to_string(), 2),
            ("phone_3".to_string(), 3),
        ]
    );

    // The resumed run only does the remaining work
    let (summary, fetcher) = run_once(&store_path, ScriptedFetcher::default(), &source).await;
    assert_eq!(summary.counts.skipped, 3);
    assert_eq!(summary.counts.inserted, 2);
    assert_eq!(fetcher.calls, vec!["phone_4".to_string(), "phone_5".to_string()]);
    assert_eq!(JsonFileStore::open(&store_path).len(), 5);
}

#[tokio::test]
async fn test_failed_fetch_is_recorded_then_rechecked() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store.json");
    let source = vec![item("phone_a", "₹10,000"), item("phone_b", "₹20,000")];

    let (summary, _) = run_once(&store_path, ScriptedFetcher::failing(&["phone_a"]), &source).await;
    assert_eq!(summary.state, CrawlState::Completed);
    assert_eq!(summary.counts.failed, 1);

    let store = JsonFileStore::open(&store_path);
    let a = store.get("phone_a").unwrap();
    assert!(!a.is_listed());
    assert!(a.media_refs.is_empty());
    assert_eq!(a.price.as_deref(), Some("₹10,000"));
    assert_eq!(a.sequence_number, 1);

    // Unlisted records are re-checked by the default policy
    let (summary, fetcher) = run_once(&store_path, ScriptedFetcher::default(), &source).await;
    assert_eq!(summary.counts.updated, 1);
    assert_eq!(fetcher.calls, vec!["phone_a".to_string()]);

    let store = JsonFileStore::open(&store_path);
    let a = store.get("phone_a").unwrap();
    assert!(a.is_listed());
    assert_eq!(a.sequence_number, 1);
}

#[tokio::test]
async fn test_unlisted_recheck_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store.json");
    let source = vec![item("phone_a", "₹10,000")];
    run_once(&store_path, ScriptedFetcher::failing(&["phone_a"]), &source).await;

    let mut crawl = CrawlLoop::new(
        JsonFileStore::open(&store_path),
        ScriptedFetcher::default(),
        long_budget(),
        no_delay(),
    )
    .with_policy(DefaultStalePolicy::new(false));
    let summary = crawl.run(&source).await.unwrap();

    assert_eq!(summary.counts.skipped, 1);
    assert!(crawl.fetcher().calls.is_empty());
}

#[tokio::test]
async fn test_shutdown_finishes_in_flight_item() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store.json");
    let source = keyed_items(5);

    let shutdown = ShutdownFlag::new();
    let budget = TimeBudget::new(
        Duration::from_secs(3600),
        Duration::from_secs(60),
        shutdown.clone(),
    );
    let fetcher = ScriptedFetcher {
        stop_during: Some(("phone_2".to_string(), shutdown)),
        ..ScriptedFetcher::default()
    };

    let mut crawl = CrawlLoop::new(
        JsonFileStore::open(&store_path),
        fetcher,
        budget,
        LoopSettings {
            inter_item_delay: Duration::from_millis(500),
            ..LoopSettings::default()
        },
    );
    let summary = crawl.run(&source).await.unwrap();

    assert_eq!(summary.state, CrawlState::GracefulStop);
    assert_eq!(summary.counts.inserted, 2);
    assert_eq!(summary.counts.remaining, 3);
    assert_eq!(crawl.fetcher().closed, 1);

    // The item in flight when shutdown was requested is committed
    let store = JsonFileStore::open(&store_path);
    assert_eq!(store.len(), 2);
    assert!(store.get("phone_2").unwrap().is_listed());
}

#[tokio::test(start_paused = true)]
async fn test_time_budget_stops_at_grace_period() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store.json");
    let source = keyed_items(10);

    let budget = TimeBudget::new(
        Duration::from_secs(10),
        Duration::from_secs(3),
        ShutdownFlag::new(),
    );
    let mut crawl = CrawlLoop::new(
        JsonFileStore::open(&store_path),
        ScriptedFetcher::default(),
        budget.clone(),
        LoopSettings {
            inter_item_delay: Duration::from_secs(2),
            ..LoopSettings::default()
        },
    );

    let summary = crawl.run(&source).await.unwrap();

    // Items start at t=0,2,4,6; the wait after the fourth is cut at t=7
    assert_eq!(summary.state, CrawlState::GracefulStop);
    assert_eq!(summary.counts.inserted, 4);
    assert_eq!(summary.counts.remaining, 6);
    assert_eq!(budget.elapsed(), Duration::from_secs(7));
    assert!(!summary.time_status.should_continue);
    assert_eq!(JsonFileStore::open(&store_path).len(), 4);
}

#[tokio::test]
async fn test_graceful_stop_still_prunes() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store.json");
    run_once(
        &store_path,
        ScriptedFetcher::default(),
        &[item("gone", "₹1"), item("phone_a", "₹1")],
    )
    .await;

    let shutdown = ShutdownFlag::new();
    shutdown.request();
    let budget = TimeBudget::new(Duration::from_secs(3600), Duration::from_secs(60), shutdown);
    let mut crawl = CrawlLoop::new(
        JsonFileStore::open(&store_path),
        ScriptedFetcher::default(),
        budget,
        no_delay(),
    );
    let summary = crawl.run(&[item("phone_a", "₹2")]).await.unwrap();

    assert_eq!(summary.state, CrawlState::GracefulStop);
    assert_eq!(summary.counts.remaining, 1);
    assert_eq!(summary.counts.removed, 1);
    assert!(crawl.fetcher().calls.is_empty());
    assert_eq!(crawl.store().get("phone_a").unwrap().price.as_deref(), Some("₹1"));
}

// ===== Reconciliation property =====

#[test]
fn test_classify_partitions_every_combination() {
    const UNIVERSE: [&str; 5] = ["a", "b", "c", "d", "e"];
    let policy = DefaultStalePolicy::default();

    for source_mask in 0u32..32 {
        for store_mask in 0u32..32 {
            let source: Vec<SourceItem> = UNIVERSE
                .iter()
                .enumerate()
                .filter(|(i, _)| source_mask & (1 << i) != 0)
                .map(|(i, k)| item(k, if i % 2 == 0 { "₹1" } else { "₹2" }))
                .collect();
            let persisted: Vec<Record> = UNIVERSE
                .iter()
                .enumerate()
                .filter(|(i, _)| store_mask & (1 << i) != 0)
                .map(|(_, k)| {
                    let mut record = Record::unresolved(&item(k, "₹1"));
                    record.external_id = Some("B0X".to_string());
                    record.listed_status = ListedStatus::Yes;
                    record
                })
                .collect();

            let classified = classify(&source, &persisted, &policy);

            let source_keys: HashSet<&str> = source.iter().map(|i| i.key.as_str()).collect();
            let store_keys: HashSet<&str> = persisted.iter().map(|r| r.key.as_str()).collect();

            let non_remove: HashSet<&str> = classified
                .iter()
                .filter(|c| c.decision != Decision::Remove)
                .map(|c| c.key)
                .collect();
            let removes: Vec<&str> = classified
                .iter()
                .filter(|c| c.decision == Decision::Remove)
                .map(|c| c.key)
                .collect();

            // Insert/Update/Skip cover the source exactly once
            assert_eq!(non_remove, source_keys);
            assert_eq!(classified.len() - removes.len(), source.len());

            // One Remove per stored key missing from the source
            let expected: HashSet<&str> = store_keys.difference(&source_keys).copied().collect();
            assert_eq!(removes.len(), expected.len());
            assert_eq!(removes.iter().copied().collect::<HashSet<_>>(), expected);

            for c in &classified {
                match c.decision {
                    Decision::Insert => assert!(!store_keys.contains(c.key)),
                    Decision::Update | Decision::Skip => assert!(store_keys.contains(c.key)),
                    Decision::Remove => assert!(!source_keys.contains(c.key)),
                }
            }
        }
    }
}

// ===== HTTP fetcher =====

const DETAIL_PAGE: &str = r#"
<html><body>
  <img src="/media/phone-a.jpg">
  <span class="score">82</span>
  <table><tr><td>RAM</td><td>8 GB</td></tr></table>
  <a href="https://www.amazon.in/Phone-A/dp/B0PHONEA12/ref=sr_1">Buy</a>
</body></html>
"#;

fn fetcher_config(retries: u32) -> FetcherConfig {
    FetcherConfig {
        max_retries: retries,
        retry_delay_ms: 10,
        external_host: Some("amazon.in".to_string()),
        selectors: SelectorConfig {
            quality_score: vec![".score".to_string()],
            ..SelectorConfig::default()
        },
        ..FetcherConfig::default()
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_http_fetcher_extracts_enrichment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/phone-a"))
        .respond_with(html(DETAIL_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = HttpItemFetcher::new(&fetcher_config(0), long_budget()).unwrap();
    let item = item("phone_a", "₹10,000").with_url(format!("{}/phone-a", server.uri()));

    let enrichment = fetcher.fetch(&item).await.unwrap();
    assert_eq!(enrichment.external_id.as_deref(), Some("B0PHONEA12"));
    assert_eq!(enrichment.quality_score.as_deref(), Some("82"));
    assert_eq!(
        enrichment.media_refs,
        vec![format!("{}/media/phone-a.jpg", server.uri())]
    );
    assert_eq!(enrichment.spec_sections["Specifications"][0].value, "8 GB");
}

#[tokio::test]
async fn test_http_fetcher_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/phone-a"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/phone-a"))
        .respond_with(html(DETAIL_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = HttpItemFetcher::new(&fetcher_config(2), long_budget()).unwrap();
    let item = item("phone_a", "₹1").with_url(format!("{}/phone-a", server.uri()));

    let enrichment = fetcher.fetch(&item).await.unwrap();
    assert!(enrichment.external_id.is_some());
    assert_eq!(fetcher.requests(), 3);
}

#[tokio::test]
async fn test_http_fetcher_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let mut fetcher = HttpItemFetcher::new(&fetcher_config(2), long_budget()).unwrap();
    let item = item("phone_a", "₹1").with_url(format!("{}/phone-a", server.uri()));

    let failure = fetcher.fetch(&item).await.unwrap_err();
    assert!(matches!(failure, FetchFailure::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_http_fetcher_does_not_retry_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = HttpItemFetcher::new(&fetcher_config(3), long_budget()).unwrap();
    let item = item("phone_a", "₹1").with_url(format!("{}/gone", server.uri()));

    let failure = fetcher.fetch(&item).await.unwrap_err();
    assert!(matches!(failure, FetchFailure::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_http_fetcher_rejects_non_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let mut fetcher = HttpItemFetcher::new(&fetcher_config(0), long_budget()).unwrap();
    let item = item("phone_a", "₹1").with_url(format!("{}/brochure", server.uri()));

    let failure = fetcher.fetch(&item).await.unwrap_err();
    assert!(matches!(failure, FetchFailure::ContentMismatch { .. }));
}

#[tokio::test]
async fn test_http_fetcher_retry_wait_honours_shutdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let shutdown = ShutdownFlag::new();
    let budget = TimeBudget::new(
        Duration::from_secs(3600),
        Duration::from_secs(60),
        shutdown.clone(),
    );
    shutdown.request();

    let config = FetcherConfig {
        retry_delay_ms: 60_000,
        ..fetcher_config(3)
    };
    let mut fetcher = HttpItemFetcher::new(&config, budget).unwrap();
    let item = item("phone_a", "₹1").with_url(format!("{}/phone-a", server.uri()));

    assert_eq!(fetcher.fetch(&item).await.unwrap_err(), FetchFailure::Interrupted);
    assert_eq!(fetcher.requests(), 1);
}

// ===== Full harvest =====

#[tokio::test]
async fn test_run_harvest_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/phone-a"))
        .respond_with(html(DETAIL_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/phone-b"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let catalog = dir.path().join("mobiles.json");
    std::fs::write(
        &catalog,
        serde_json::json!({
            "products": [
                {"name": "Phone A", "price": "₹10,000", "url": format!("{}/phone-a", server.uri())},
                {"name": "Phone B", "price": "₹20,000", "url": format!("{}/phone-b", server.uri())}
            ]
        })
        .to_string(),
    )
    .unwrap();

    let media_root = dir.path().join("images");
    std::fs::create_dir_all(media_root.join("stale_phone")).unwrap();

    let config = Config {
        paths: PathsConfig {
            catalog,
            store: dir.path().join("updated_mobiles.json"),
            time_config: dir.path().join("time.json"),
            checkpoint: Some(dir.path().join("checkpoint.json")),
            media_root: Some(media_root.clone()),
        },
        crawl: CrawlConfig {
            inter_item_delay_ms: 0,
            ..CrawlConfig::default()
        },
        fetcher: fetcher_config(0),
    };

    let summary = run_harvest(&config, true).await.unwrap();
    assert_eq!(summary.state, CrawlState::Completed);
    assert_eq!(summary.counts.inserted, 2);
    assert_eq!(summary.counts.failed, 1);
    assert!(!media_root.join("stale_phone").exists());

    let store = JsonFileStore::open(&config.paths.store);
    assert!(store.get("phone_a").unwrap().is_listed());
    assert!(!store.get("phone_b").unwrap().is_listed());
    assert!(dir.path().join("checkpoint.json").exists());

    // On-disk format keeps the front-end field names
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.paths.store).unwrap()).unwrap();
    assert_eq!(raw["products"][0]["id"], "phone_a");
    assert_eq!(raw["products"][0]["count"], 1);
    assert_eq!(raw["products"][0]["listed"], "yes");
    assert_eq!(raw["products"][0]["asin"], "B0PHONEA12");
    assert_eq!(raw["products"][1]["listed"], "no");
}
