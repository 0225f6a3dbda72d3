//! Time budget configuration
//!
//! The budget lives in its own small JSON file so an operator (or a CI job)
//! can change it without touching the run configuration:
//!
//! ```json
//! [{"time": "05:00", "grace": "00:05"}]
//! ```
//!
//! Loading never fails. Anything missing or malformed falls back to the
//! defaults and is logged as a warning.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default run limit (5 hours)
pub const DEFAULT_TIME_LIMIT: &str = "05:00";

/// Default grace period (5 minutes)
pub const DEFAULT_GRACE_PERIOD: &str = "00:05";

/// Run limit and grace period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeConfig {
    pub limit: Duration,
    pub grace: Duration,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            limit: Duration::from_secs(5 * 3600),
            grace: Duration::from_secs(5 * 60),
        }
    }
}

/// One entry of the on-disk list
#[derive(Debug, Default, Serialize, Deserialize)]
struct TimeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grace: Option<String>,
}

/// Parses an `HH:MM` value (`HH` 00-23, `MM` 00-59) into a duration
pub fn parse_hhmm(value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidTime(value.to_string());

    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }

    let hours: u64 = hours.parse().map_err(|_| invalid())?;
    let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    Ok(Duration::from_secs(hours * 3600 + minutes * 60))
}

/// Formats a duration as `HH:MM`, dropping seconds
pub fn format_hhmm(duration: Duration) -> String {
    let total_minutes = duration.as_secs() / 60;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

/// Loads the time configuration, falling back to defaults on any problem
///
/// A missing file, a value that is not a non-empty list, or an unparsable
/// field is logged and replaced by its default. Fields are recovered
/// independently: a bad `grace` does not discard a good `time`.
pub fn load_time_config(path: &Path) -> TimeConfig {
    let entry = match read_entry(path) {
        Ok(entry) => entry,
        Err(reason) => {
            tracing::warn!(
                "Time config {} unusable ({}), using defaults {} / {}",
                path.display(),
                reason,
                DEFAULT_TIME_LIMIT,
                DEFAULT_GRACE_PERIOD
            );
            return TimeConfig::default();
        }
    };

    let defaults = TimeConfig::default();
    let limit = field_or_default(entry.time.as_deref(), "time", defaults.limit);
    let grace = field_or_default(entry.grace.as_deref(), "grace", defaults.grace);

    if grace >= limit {
        tracing::warn!(
            "Grace period {} is not shorter than the limit {}; no work will start",
            format_hhmm(grace),
            format_hhmm(limit)
        );
    }

    tracing::info!(
        "Time limit {} ({}s), grace period {} ({}s)",
        format_hhmm(limit),
        limit.as_secs(),
        format_hhmm(grace),
        grace.as_secs()
    );

    TimeConfig { limit, grace }
}

fn read_entry(path: &Path) -> Result<TimeEntry, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let entries: Vec<TimeEntry> =
        serde_json::from_str(&content).map_err(|e| format!("expected a list: {}", e))?;
    entries
        .into_iter()
        .next()
        .ok_or_else(|| "list is empty".to_string())
}

fn field_or_default(value: Option<&str>, name: &str, default: Duration) -> Duration {
    match value {
        None => default,
        Some(raw) => parse_hhmm(raw).unwrap_or_else(|e| {
            tracing::warn!("Ignoring '{}': {}; using {}", name, e, format_hhmm(default));
            default
        }),
    }
}

impl TimeConfig {
    /// Writes this configuration as `[{"time": ..., "grace": ...}]`
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let entries = [TimeEntry {
            time: Some(format_hhmm(self.limit)),
            grace: Some(format_hhmm(self.grace)),
        }];
        let json = serde_json::to_string_pretty(&entries)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
