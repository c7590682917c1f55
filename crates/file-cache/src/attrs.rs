//! Synthetic file attributes and the external attribute cache contract.
//!
//! The cache core is write-only towards the attribute cache: it publishes a
//! full attribute record whenever it learns a file's current size (at
//! replace-open and after write-back).

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Default block size reported for cached files.
const BLOCKS: u64 = 8;

/// Attribute record published for a cached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticAttr {
    pub mode: u32,
    pub nlink: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub blksize: u32,
    pub blocks: u64,
    pub uid: u32,
    pub gid: u32,
    pub prepopulated: bool,
}

impl SyntheticAttr {
    /// Attributes for a regular cached file of `size` bytes, stamped now
    /// and owned by the running process.
    pub fn regular_file(size: u64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            mode: 0o660 | libc::S_IFREG as u32,
            nlink: 1,
            size,
            atime: now,
            mtime: now,
            ctime: now,
            blksize: 0,
            blocks: BLOCKS,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            prepopulated: false,
        }
    }
}

/// External attribute cache the core publishes into.
#[async_trait]
pub trait AttrCache: Send + Sync {
    async fn set(&self, path: &str, attr: SyntheticAttr);
}

/// In-memory attribute cache.
///
/// Keeps the latest record per path plus the full publication history,
/// which integration tests assert against.
#[derive(Debug, Default)]
pub struct MemoryAttrCache {
    latest: Mutex<HashMap<String, SyntheticAttr>>,
    history: Mutex<Vec<(String, SyntheticAttr)>>,
}

impl MemoryAttrCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest attributes published for a path.
    pub fn get(&self, path: &str) -> Option<SyntheticAttr> {
        self.latest.lock().get(path).cloned()
    }

    /// Every record ever published for a path, in order.
    pub fn recorded(&self, path: &str) -> Vec<SyntheticAttr> {
        self.history
            .lock()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, a)| a.clone())
            .collect()
    }
}

#[async_trait]
impl AttrCache for MemoryAttrCache {
    async fn set(&self, path: &str, attr: SyntheticAttr) {
        self.latest
            .lock()
            .insert(path.to_string(), attr.clone());
        self.history.lock().push((path.to_string(), attr));
    }
}
