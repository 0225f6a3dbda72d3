use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Loads and parses a configuration file from the given path
///
/// Relative paths inside `[paths]` are resolved against the directory that
/// contains the configuration file, so a run behaves the same regardless of
/// the working directory it was started from.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use catalog_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Store: {}", config.paths.store.display());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let mut config: Config = toml::from_str(&content)?;

    if let Some(base) = path.parent() {
        resolve_paths(&mut config, base);
    }

    validate(&config)?;

    Ok(config)
}

/// Rebases every relative path in `[paths]` onto `base`
fn resolve_paths(config: &mut Config, base: &Path) {
    let rebase = |p: &mut PathBuf| {
        if p.is_relative() && !p.as_os_str().is_empty() {
            *p = base.join(&*p);
        }
    };

    let paths = &mut config.paths;
    rebase(&mut paths.catalog);
    rebase(&mut paths.store);
    rebase(&mut paths.time_config);
    if let Some(checkpoint) = paths.checkpoint.as_mut() {
        rebase(checkpoint);
    }
    if let Some(media_root) = paths.media_root.as_mut() {
        rebase(media_root);
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two runs can be checked for identical settings.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
