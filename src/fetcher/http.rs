//! HTTP item fetcher
//!
//! This module handles the network side of enrichment:
//! - Building the HTTP client with the configured user agent
//! - GET requests for item detail pages
//! - Bounded retry of transient failures, with budget-aware waits
//! - Error classification into `FetchFailure`

use crate::budget::TimeBudget;
use crate::catalog::SourceItem;
use crate::config::FetcherConfig;
use crate::fetcher::extract::{extract_enrichment, CompiledSelectors, ExternalIdRule};
use crate::fetcher::{FetchFailure, FetchResult, ItemFetcher};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches item detail pages over HTTP and extracts their enrichment
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 5xx | Retry up to `max-retries` times |
/// | Timeout | Retry up to `max-retries` times |
/// | Other HTTP error | Immediate failure |
/// | Connection refused | Immediate failure |
/// | Non-HTML response | Immediate failure |
///
/// Waits between attempts go through the run's [`TimeBudget`], so a retry
/// loop never outlives the budget or a shutdown request.
pub struct HttpItemFetcher {
    client: Client,
    selectors: CompiledSelectors,
    external: ExternalIdRule,
    budget: TimeBudget,
    max_retries: u32,
    retry_delay: Duration,
    requests: u64,
}

impl HttpItemFetcher {
    pub fn new(config: &FetcherConfig, budget: TimeBudget) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(config)?,
            selectors: CompiledSelectors::compile(&config.selectors)?,
            external: ExternalIdRule::new(
                config.external_host.clone(),
                config.external_id_marker.clone(),
            ),
            budget,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            requests: 0,
        })
    }

    /// Number of HTTP requests sent so far
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// GETs `url`, retrying transient failures
    async fn fetch_page(&mut self, url: &Url) -> Result<String, FetchFailure> {
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(failure) if failure.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} (attempt {}/{}), retrying in {:?}",
                        failure,
                        attempt,
                        self.max_retries + 1,
                        self.retry_delay
                    );
                    if !self.budget.interruptible_wait(self.retry_delay).await {
                        return Err(FetchFailure::Interrupted);
                    }
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    async fn get_once(&mut self, url: &Url) -> Result<String, FetchFailure> {
        self.requests += 1;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Missing Content-Type is tolerated; an explicit non-HTML one is not
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.is_empty() && !content_type.contains("html") {
            return Err(FetchFailure::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

/// Maps a reqwest error onto a fetch failure
fn classify_error(url: &Url, error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status() {
        FetchFailure::Http {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else if error.is_connect() {
        FetchFailure::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchFailure::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl ItemFetcher for HttpItemFetcher {
    async fn fetch(&mut self, item: &SourceItem) -> FetchResult {
        let raw = item
            .detail_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| FetchFailure::MissingDetailUrl(item.key.clone()))?;
        let url = Url::parse(raw).map_err(|_| FetchFailure::InvalidUrl(raw.to_string()))?;

        let body = self.fetch_page(&url).await?;
        let enrichment = extract_enrichment(&body, &url, &self.selectors, &self.external);

        tracing::debug!(
            "Extracted {} images, {} variants, {} spec sections for '{}'",
            enrichment.media_refs.len(),
            enrichment.variant_attributes.len(),
            enrichment.spec_sections.len(),
            item.key
        );
        if enrichment.external_id.is_none() {
            tracing::info!("No cross-retailer listing found for '{}'", item.key);
        }

        Ok(enrichment)
    }

    async fn close(&mut self) {
        tracing::info!("HTTP fetcher closed after {} requests", self.requests);
    }
}
