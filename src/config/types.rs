use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

/// File locations used by a run
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Source catalog (`{"products": [...]}`), read-only
    pub catalog: PathBuf,

    /// Record store file, rewritten atomically on every commit
    pub store: PathBuf,

    /// Time budget file (`[{"time": "HH:MM", "grace": "HH:MM"}]`)
    #[serde(rename = "time-config", default = "default_time_config_path")]
    pub time_config: PathBuf,

    /// Optional progress checkpoint written after each commit
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,

    /// Optional directory of per-record media folders, pruned with their records
    #[serde(rename = "media-root", default)]
    pub media_root: Option<PathBuf>,
}

/// Crawl loop behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Pause between enriched items (milliseconds)
    #[serde(rename = "inter-item-delay-ms")]
    pub inter_item_delay_ms: u64,

    /// Retry records whose cross-reference lookup failed on a previous run
    #[serde(rename = "recheck-unlisted")]
    pub recheck_unlisted: bool,

    /// Log the time status every N processed items
    #[serde(rename = "status-every")]
    pub status_every: u32,

    /// Remove stored records whose key left the catalog
    #[serde(rename = "prune-discontinued")]
    pub prune_discontinued: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            inter_item_delay_ms: 1000,
            recheck_unlisted: true,
            status_every: 10,
            prune_discontinued: true,
        }
    }
}

/// HTTP item fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries for transient failures (5xx, timeouts)
    pub max_retries: u32,

    /// Pause between retries (milliseconds)
    pub retry_delay_ms: u64,

    /// Host of the cross-reference retailer (e.g. "amazon.in")
    pub external_host: Option<String>,

    /// Path segment preceding the identifier in cross-reference links
    pub external_id_marker: String,

    /// Ordered CSS selector chains for each extracted field
    pub selectors: SelectorConfig,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("catalog-harvest/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 2000,
            external_host: None,
            external_id_marker: "/dp/".to_string(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// Ordered selector lists; the first selector producing a value wins
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    pub images: Vec<String>,
    pub variants: Vec<String>,
    pub variant_label: Vec<String>,
    pub variant_price: Vec<String>,
    pub quality_score: Vec<String>,
    pub reference_price: Vec<String>,
    pub spec_sections: Vec<String>,
    pub spec_title: Vec<String>,
    pub spec_rows: Vec<String>,
    pub external_links: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            images: vec!["img[src]".to_string()],
            variants: Vec::new(),
            variant_label: Vec::new(),
            variant_price: Vec::new(),
            quality_score: Vec::new(),
            reference_price: Vec::new(),
            spec_sections: Vec::new(),
            spec_title: vec!["h3".to_string(), "h2".to_string()],
            spec_rows: vec!["tr".to_string()],
            external_links: vec!["a[href]".to_string()],
        }
    }
}

fn default_time_config_path() -> PathBuf {
    PathBuf::from("time.json")
}
