//! The cache facade: session open, write-back sync, release, entry
//! deletion.

use std::sync::Arc;

use bytes::Bytes;
use remote_store::RemoteStore;

use crate::attrs::{AttrCache, SyntheticAttr};
use crate::config::CacheConfig;
use crate::db::{CacheEntry, MetadataDb};
use crate::error::Result;
use crate::handle::{AccessMode, SessionHandle};
use crate::resolver::{unlink_superseded, Resolver};
use crate::staging::StagingArea;

/// Local disk cache over a remote document store.
///
/// Clone-able; clones share the metadata pool, staging area, and per-path
/// coordination state.
#[derive(Clone)]
pub struct FileCache {
    db: MetadataDb,
    staging: StagingArea,
    resolver: Resolver,
    remote: Arc<dyn RemoteStore>,
    attrs: Arc<dyn AttrCache>,
}

impl FileCache {
    /// Initialize the cache: staging subdirectory and metadata database
    /// are created if absent.
    pub async fn new(
        config: CacheConfig,
        remote: Arc<dyn RemoteStore>,
        attrs: Arc<dyn AttrCache>,
    ) -> Result<Self> {
        let staging = StagingArea::open(&config.cache_dir).await?;
        let db = MetadataDb::open(&config.db_path()).await?;
        let resolver = Resolver::new(
            db.clone(),
            staging.clone(),
            remote.clone(),
            config.freshness_window(),
        );
        Ok(Self {
            db,
            staging,
            resolver,
            remote,
            attrs,
        })
    }

    /// Direct access to the persisted entries (diagnostics and tests).
    pub fn metadata(&self) -> &MetadataDb {
        &self.db
    }

    /// Open a session on `path`.
    ///
    /// A replace-open allocates a brand-new private staging file without
    /// consulting the remote store and immediately publishes size-zero
    /// attributes, so concurrent lookups see a zero-length file before any
    /// byte is written. A resolve-open goes through the freshness resolver
    /// and attaches to the current generation.
    pub async fn open(
        &self,
        path: &str,
        mode: AccessMode,
        replace: bool,
    ) -> Result<SessionHandle> {
        if replace {
            let (file, replacement_path) = self.staging.create().await?;
            self.attrs.set(path, SyntheticAttr::regular_file(0)).await;
            tracing::debug!(path, "opened replacement session");
            Ok(SessionHandle {
                file,
                replacement_path: Some(replacement_path),
                readable: mode.readable(),
                writable: true,
                modified: false,
            })
        } else {
            let file = self.resolver.resolve(path).await?;
            tracing::debug!(path, "opened session on current generation");
            Ok(SessionHandle {
                file,
                replacement_path: None,
                readable: mode.readable(),
                writable: mode.writable(),
                modified: false,
            })
        }
    }

    /// Push the handle's content to the remote store and refresh the
    /// persisted metadata and attribute cache.
    ///
    /// A no-op for handles that are not writable or were never modified;
    /// a successful sync clears the modified flag, so an immediate second
    /// call uploads nothing. Upload failure leaves the local state
    /// untouched so the caller can retry.
    pub async fn sync(&self, path: &str, handle: &mut SessionHandle) -> Result<()> {
        if !handle.writable || !handle.modified {
            return Ok(());
        }

        let body = handle.read_full().await?;
        self.remote.upload(path, Bytes::from(body)).await?;
        let size = handle.end_offset().await?;
        let now = chrono::Utc::now().timestamp();

        // Refresh the persisted entry. The upload response's validator is
        // deliberately not captured; the carried-over token may force one
        // full refetch on the next revalidation.
        let prior = self.db.get(path).await?;
        match (&handle.replacement_path, prior) {
            (Some(replacement), prior) => {
                let entry = CacheEntry {
                    local_filename: replacement.clone(),
                    validator: prior
                        .as_ref()
                        .map(|p| p.validator.clone())
                        .unwrap_or_default(),
                    last_revalidated: now,
                };
                self.db.put(path, &entry).await?;
                if let Some(prior) = prior {
                    if prior.local_filename != *replacement {
                        unlink_superseded(&prior.local_filename).await;
                    }
                }
            }
            (None, Some(prior)) => {
                let entry = CacheEntry {
                    last_revalidated: now,
                    ..prior
                };
                self.db.put(path, &entry).await?;
            }
            (None, None) => {
                // Entry deleted mid-session; nothing sensible to point at.
                tracing::debug!(path, "no cache entry to refresh after write-back");
            }
        }

        self.attrs.set(path, SyntheticAttr::regular_file(size)).await;
        handle.modified = false;
        tracing::debug!(path, size, "write-back complete");
        Ok(())
    }

    /// Sync, then close the descriptor regardless of the sync outcome.
    /// The handle is consumed; the sync error, if any, is returned after
    /// the close.
    pub async fn release(&self, path: &str, mut handle: SessionHandle) -> Result<()> {
        let result = self.sync(path, &mut handle).await;
        drop(handle);
        tracing::debug!(path, "released session");
        result
    }

    /// Remove the metadata record for `path`. Open descriptors are
    /// untouched and keep working until closed. Returns whether a record
    /// existed.
    pub async fn delete_entry(&self, path: &str) -> Result<bool> {
        self.db.delete(path).await
    }
}
