//! Configuration for the file cache.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seconds a revalidated copy stays usable without re-checking the remote
/// store. Bounds remote traffic for bursts of rapid re-opens of the same
/// path (stat-then-open patterns) at the cost of a small staleness window.
const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 3;

/// Configuration for a [`crate::FileCache`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for staged content files and (by default) the
    /// metadata database.
    pub cache_dir: PathBuf,

    /// Path to the metadata database; defaults to
    /// `<cache_dir>/metadata.db`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Freshness window in seconds.
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,
}

fn default_freshness_window_secs() -> u64 {
    DEFAULT_FRESHNESS_WINDOW_SECS
}

impl CacheConfig {
    /// Configuration rooted at `cache_dir` with default settings.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            db_path: None,
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
        }
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub(crate) fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.cache_dir.join("metadata.db"))
    }
}
