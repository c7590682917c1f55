//! Freshness resolver / fetch protocol.
//!
//! Given a remote path, produce a descriptor onto a current local copy, or
//! fail. Concurrent resolutions for the same path are coalesced behind a
//! per-path lock, so a cold path is fetched once rather than raced by
//! independent replacements.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use remote_store::{FetchContent, FetchOutcome, RemoteStore, RemoteStoreError};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::db::{clamp_validator, CacheEntry, MetadataDb};
use crate::error::Result;
use crate::staging::StagingArea;

type Flight = Arc<tokio::sync::Mutex<()>>;

#[derive(Clone)]
pub(crate) struct Resolver {
    db: MetadataDb,
    staging: StagingArea,
    remote: Arc<dyn RemoteStore>,
    window: Duration,
    flights: Arc<Mutex<HashMap<String, Flight>>>,
}

impl Resolver {
    pub(crate) fn new(
        db: MetadataDb,
        staging: StagingArea,
        remote: Arc<dyn RemoteStore>,
        window: Duration,
    ) -> Self {
        Self {
            db,
            staging,
            remote,
            window,
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Produce a descriptor onto a current local copy of `path`.
    pub(crate) async fn resolve(&self, path: &str) -> Result<File> {
        let flight = self.flight_for(path);
        let result = {
            let _guard = flight.lock().await;
            self.resolve_locked(path).await
        };
        self.prune_flight(path, &flight);
        result
    }

    /// The read-check-act sequence, run under the per-path lock.
    async fn resolve_locked(&self, path: &str) -> Result<File> {
        let mut entry = self.db.get(path).await?;

        if let Some(entry) = &entry {
            if entry.is_fresh(self.window) {
                tracing::debug!(path, file = %entry.local_filename.display(), "cache entry is fresh");
                return open_generation(&entry.local_filename).await;
            }
        }

        loop {
            let validator = entry
                .as_ref()
                .map(|e| e.validator.as_str())
                .filter(|v| !v.is_empty());
            match self.remote.conditional_fetch(path, validator).await? {
                FetchOutcome::Retry => {
                    tracing::debug!(path, "transport asked to retry fetch");
                    continue;
                }
                FetchOutcome::NotModified => {
                    // A not-modified response without a precondition sent is
                    // a protocol violation.
                    let Some(mut entry) = entry.take() else {
                        return Err(RemoteStoreError::UnexpectedStatus(304).into());
                    };
                    entry.last_revalidated = chrono::Utc::now().timestamp();
                    self.db.put(path, &entry).await?;
                    tracing::debug!(path, file = %entry.local_filename.display(), "revalidated existing generation");
                    return open_generation(&entry.local_filename).await;
                }
                FetchOutcome::Content(content) => {
                    return self.stage_replacement(path, entry.take(), content).await;
                }
            }
        }
    }

    /// Stream the full response body into a fresh staging file, commit the
    /// entry, then drop the superseded generation's directory entry.
    async fn stage_replacement(
        &self,
        path: &str,
        prior: Option<CacheEntry>,
        content: FetchContent,
    ) -> Result<File> {
        let (mut file, local_filename) = self.staging.create().await?;
        let mut body = content.body;
        while let Some(chunk) = body.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        let entry = CacheEntry {
            local_filename: local_filename.clone(),
            validator: content
                .validator
                .as_deref()
                .map(clamp_validator)
                .unwrap_or_default(),
            last_revalidated: chrono::Utc::now().timestamp(),
        };
        self.db.put(path, &entry).await?;

        // The persistent record no longer references the old generation.
        // Descriptors already attached to it stay valid until closed.
        if let Some(prior) = prior {
            unlink_superseded(&prior.local_filename).await;
        }

        file.seek(SeekFrom::Start(0)).await?;
        tracing::debug!(path, file = %local_filename.display(), "staged new generation");
        Ok(file)
    }

    fn flight_for(&self, path: &str) -> Flight {
        let mut flights = self.flights.lock();
        flights.entry(path.to_string()).or_default().clone()
    }

    fn prune_flight(&self, path: &str, flight: &Flight) {
        let mut flights = self.flights.lock();
        // One reference in the map plus the one held here means no other
        // caller is in flight for this path.
        if let Some(current) = flights.get(path) {
            if Arc::ptr_eq(current, flight) && Arc::strong_count(flight) == 2 {
                flights.remove(path);
            }
        }
    }

    #[cfg(test)]
    fn flight_count(&self) -> usize {
        self.flights.lock().len()
    }
}

/// Open an already-staged generation for a session.
async fn open_generation(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .await?)
}

/// Remove a superseded generation's directory entry. Failure leaves a
/// dangling named file; logged and otherwise ignored.
pub(crate) async fn unlink_superseded(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(file = %path.display(), error = %e, "failed to unlink superseded cache file");
    }
}
