use crate::config::types::{Config, CrawlConfig, FetcherConfig, PathsConfig, SelectorConfig};
use crate::fetcher::CompiledSelectors;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_paths(&config.paths)?;
    validate_crawl_config(&config.crawl)?;
    validate_fetcher_config(&config.fetcher)?;
    Ok(())
}

/// Validates file locations
fn validate_paths(paths: &PathsConfig) -> Result<(), ConfigError> {
    if paths.catalog.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "catalog path cannot be empty".to_string(),
        ));
    }

    if paths.store.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "store path cannot be empty".to_string(),
        ));
    }

    if paths.catalog == paths.store {
        return Err(ConfigError::Validation(format!(
            "catalog and store must be different files, both are '{}'",
            paths.store.display()
        )));
    }

    Ok(())
}

/// Validates crawl loop settings
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.status_every < 1 {
        return Err(ConfigError::Validation(format!(
            "status_every must be >= 1, got {}",
            config.status_every
        )));
    }

    if config.inter_item_delay_ms > 3_600_000 {
        return Err(ConfigError::Validation(format!(
            "inter_item_delay_ms must be <= 3600000, got {}",
            config.inter_item_delay_ms
        )));
    }

    Ok(())
}

/// Validates fetcher settings and compiles every selector once
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.external_id_marker.is_empty() {
        return Err(ConfigError::Validation(
            "external_id_marker cannot be empty".to_string(),
        ));
    }

    if let Some(host) = &config.external_host {
        if host.is_empty() || host.contains('/') {
            return Err(ConfigError::Validation(format!(
                "external_host must be a bare host name, got '{}'",
                host
            )));
        }
    }

    validate_selectors(&config.selectors)
}

/// Ensures every configured CSS selector parses
fn validate_selectors(selectors: &SelectorConfig) -> Result<(), ConfigError> {
    CompiledSelectors::compile(selectors).map(|_| ())
}
