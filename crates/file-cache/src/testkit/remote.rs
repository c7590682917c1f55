//! Scripted remote store used by unit and integration tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use remote_store::{
    FetchContent, FetchOutcome, RemoteStore, RemoteStoreError, Result,
};

enum Scripted {
    NotModified,
    Retry,
    Content {
        validator: Option<String>,
        body: Bytes,
    },
    Status(u16),
}

/// Remote store whose fetch outcomes are scripted up front.
///
/// Records every fetch (path plus the validator precondition sent) and
/// every uploaded body, so tests can assert on the exact remote traffic.
/// Panics when a fetch arrives with nothing scripted.
#[derive(Default)]
pub struct MockRemoteStore {
    script: Mutex<VecDeque<Scripted>>,
    fetches: Mutex<Vec<(String, Option<String>)>>,
    uploads: Mutex<Vec<(String, Bytes)>>,
    fail_uploads_with: Mutex<Option<u16>>,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a "not modified" response.
    pub fn push_not_modified(&self) {
        self.script.lock().push_back(Scripted::NotModified);
    }

    /// Script a transport-level retry signal.
    pub fn push_retry(&self) {
        self.script.lock().push_back(Scripted::Retry);
    }

    /// Script a full-content response.
    pub fn push_content(&self, validator: Option<&str>, body: impl Into<Bytes>) {
        self.script.lock().push_back(Scripted::Content {
            validator: validator.map(|v| v.to_string()),
            body: body.into(),
        });
    }

    /// Script a response status outside the protocol's expected set.
    pub fn push_status(&self, status: u16) {
        self.script.lock().push_back(Scripted::Status(status));
    }

    /// Make subsequent uploads fail with `status` until cleared.
    pub fn fail_uploads_with(&self, status: u16) {
        *self.fail_uploads_with.lock() = Some(status);
    }

    /// Let uploads succeed again.
    pub fn allow_uploads(&self) {
        *self.fail_uploads_with.lock() = None;
    }

    /// Number of conditional fetches issued.
    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().len()
    }

    /// Validator preconditions sent, in fetch order.
    pub fn sent_validators(&self) -> Vec<Option<String>> {
        self.fetches.lock().iter().map(|(_, v)| v.clone()).collect()
    }

    /// Uploaded bodies, in order.
    pub fn uploads(&self) -> Vec<(String, Bytes)> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn conditional_fetch(
        &self,
        path: &str,
        validator: Option<&str>,
    ) -> Result<FetchOutcome> {
        self.fetches
            .lock()
            .push((path.to_string(), validator.map(|v| v.to_string())));

        let scripted = self
            .script
            .lock()
            .pop_front()
            .expect("mock remote: fetch arrived with nothing scripted");
        match scripted {
            Scripted::NotModified => Ok(FetchOutcome::NotModified),
            Scripted::Retry => Ok(FetchOutcome::Retry),
            Scripted::Content { validator, body } => {
                Ok(FetchOutcome::Content(FetchContent::from_bytes(validator, body)))
            }
            Scripted::Status(status) => Err(RemoteStoreError::UnexpectedStatus(status)),
        }
    }

    async fn upload(&self, path: &str, body: Bytes) -> Result<()> {
        if let Some(status) = *self.fail_uploads_with.lock() {
            return Err(RemoteStoreError::UnexpectedStatus(status));
        }
        self.uploads.lock().push((path.to_string(), body));
        Ok(())
    }
}
