//! Staging area for cache content files.
//!
//! Every generation of a path's content lives in its own uniquely-named
//! file under `<cache_dir>/files`. A staged file is exclusively owned by
//! the call that created it until it is published into a cache entry;
//! after that it is shared read-only by any number of descriptors.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use uuid::Uuid;

use crate::error::{FileCacheError, Result};

const FILES_SUBDIR: &str = "files";
const FILE_PREFIX: &str = "davcache-";

/// Allocates uniquely-named content files under the cache directory.
#[derive(Debug, Clone)]
pub struct StagingArea {
    files_dir: PathBuf,
}

impl StagingArea {
    /// Prepare the staging subdirectory under `cache_dir`. Pre-existence is
    /// fine; any other creation failure is fatal.
    pub async fn open(cache_dir: &Path) -> Result<Self> {
        let files_dir = cache_dir.join(FILES_SUBDIR);
        tokio::fs::create_dir_all(&files_dir)
            .await
            .map_err(|e| FileCacheError::StagingDir(files_dir.clone(), e))?;
        Ok(Self { files_dir })
    }

    /// Create a fresh, empty, uniquely-named staging file opened for
    /// reading and writing.
    pub async fn create(&self) -> Result<(File, PathBuf)> {
        loop {
            let path = self
                .files_dir
                .join(format!("{FILE_PREFIX}{}", Uuid::new_v4()));
            match OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    tracing::debug!(path = %path.display(), "created staging file");
                    return Ok((file, path));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
