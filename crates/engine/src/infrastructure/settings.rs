//! Engine configuration from the environment.
//!
//! | Variable                     | Default                |
//! |------------------------------|------------------------|
//! | `CHARFORGE_CATALOG_PATH`     | `content/catalog.json` |
//! | `CHARFORGE_DERIVATION_CACHE` | `true`                 |
//! | `CHARFORGE_CACHE_CAPACITY`   | `1024`                 |
//!
//! Unparseable values fall back to the default with a warning.

use std::path::PathBuf;

pub const DEFAULT_CATALOG_PATH: &str = "content/catalog.json";
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Catalog bundle file, or a directory of bundles
    pub catalog_path: PathBuf,
    /// Memoize derived state per character
    pub derivation_cache: bool,
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            derivation_cache: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so tests need not touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let catalog_path = lookup("CHARFORGE_CATALOG_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_path);

        let derivation_cache = match lookup("CHARFORGE_DERIVATION_CACHE") {
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Invalid CHARFORGE_DERIVATION_CACHE, using default");
                defaults.derivation_cache
            }),
            None => defaults.derivation_cache,
        };

        let cache_capacity = match lookup("CHARFORGE_CACHE_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .unwrap_or_else(|| {
                    tracing::warn!(value = %raw, "Invalid CHARFORGE_CACHE_CAPACITY, using default");
                    defaults.cache_capacity
                }),
            None => defaults.cache_capacity,
        };

        Self {
            catalog_path,
            derivation_cache,
            cache_capacity,
        }
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = path.into();
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.derivation_cache = false;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
