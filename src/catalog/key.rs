//! Stable record keys derived from display names

use std::collections::HashSet;

/// Derives a key from a product name
///
/// Lowercases, drops everything that is not an ASCII letter, digit or
/// whitespace, then joins the remaining words with `_`. Returns `None` when
/// nothing usable is left.
///
/// ```
/// use catalog_harvest::catalog::derive_key;
///
/// assert_eq!(derive_key("Samsung Galaxy S24 (8GB RAM)").as_deref(), Some("samsung_galaxy_s24_8gb_ram"));
/// ```
pub fn derive_key(name: &str) -> Option<String> {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    let key = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Hands out unique keys, suffixing `_1`, `_2`, ... on collision
#[derive(Debug, Default)]
pub struct KeyAssigner {
    taken: HashSet<String>,
}

impl KeyAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `base` if unused, otherwise the first free `base_N` (N >= 1)
    pub fn assign(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }

        let mut n = 1u32;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
