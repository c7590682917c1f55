//! Shared test utilities for file cache integration tests
#![allow(dead_code)]

use std::sync::Arc;

use file_cache::testkit::MockRemoteStore;
use file_cache::{CacheConfig, FileCache, MemoryAttrCache};
use tempfile::TempDir;

pub struct TestEnv {
    pub cache: FileCache,
    pub remote: Arc<MockRemoteStore>,
    pub attrs: Arc<MemoryAttrCache>,
    pub temp: TempDir,
}

/// Set up a cache over a scripted remote and an in-memory attribute cache,
/// rooted in a fresh temp directory.
pub async fn setup() -> TestEnv {
    setup_with_window(3).await
}

/// Install a compact subscriber so failing runs can be traced with
/// `RUST_LOG=debug`; safe to call from every test.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .compact()
        .try_init();
}

pub async fn setup_with_window(secs: u64) -> TestEnv {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let mut config = CacheConfig::new(temp.path());
    config.freshness_window_secs = secs;

    let remote = Arc::new(MockRemoteStore::new());
    let attrs = Arc::new(MemoryAttrCache::new());
    let cache = FileCache::new(config, remote.clone(), attrs.clone())
        .await
        .unwrap();

    TestEnv {
        cache,
        remote,
        attrs,
        temp,
    }
}

/// Force the next resolve-open of `path` to revalidate by backdating its
/// entry far past any freshness window.
pub async fn backdate_entry(cache: &FileCache, path: &str) {
    let mut entry = cache
        .metadata()
        .get(path)
        .await
        .unwrap()
        .expect("entry to backdate");
    entry.last_revalidated = 0;
    cache.metadata().put(path, &entry).await.unwrap();
}
