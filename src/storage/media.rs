//! Per-record media directories
//!
//! Downloaded images live under `<media-root>/<key>/`. These helpers keep the
//! directory tree in line with the store when records are pruned or a fresh
//! run wipes everything.

use std::io;
use std::path::{Path, PathBuf};

/// Directory holding the media for `key`
pub fn media_dir(root: &Path, key: &str) -> PathBuf {
    root.join(key)
}

/// Removes the media directory of a pruned record
///
/// # Returns
///
/// * `Ok(true)` - The directory existed and was removed
/// * `Ok(false)` - There was nothing to remove
pub fn remove_media_dir(root: &Path, key: &str) -> io::Result<bool> {
    // Keys come from catalog data; never let one escape the media root
    if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
        tracing::warn!("Refusing to remove media for suspicious key '{}'", key);
        return Ok(false);
    }

    let dir = media_dir(root, key);
    match std::fs::remove_dir_all(&dir) {
        Ok(()) => {
            tracing::debug!("Removed media directory {}", dir.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Removes every media directory under `root`, leaving `root` itself
///
/// # Returns
///
/// The number of entries removed
pub fn clear_media_root(root: &Path) -> io::Result<usize> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
        removed += 1;
    }

    tracing::info!("Cleared {} media entries from {}", removed, root.display());
    Ok(removed)
}
