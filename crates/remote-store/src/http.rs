//! HTTP implementation of the remote store contract.

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode, Url};

use crate::error::{RemoteStoreError, Result};
use crate::{FetchContent, FetchOutcome, RemoteStore};

/// Remote document store spoken to over HTTP.
///
/// Conditional fetches are GETs carrying `If-None-Match` when a validator is
/// known; uploads are PUTs of the full body. reqwest re-establishes dropped
/// connections internally, so this implementation never yields
/// [`FetchOutcome::Retry`].
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
}

impl HttpRemoteStore {
    /// Create a client rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a client rooted at `base_url`, reusing an existing
    /// `reqwest::Client` (connection pool and TLS config included).
    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Resolve a remote path against the base URL.
    fn url_for(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn conditional_fetch(
        &self,
        path: &str,
        validator: Option<&str>,
    ) -> Result<FetchOutcome> {
        let url = self.url_for(path)?;
        let mut request = self.client.get(url);
        if let Some(validator) = validator {
            request = request.header(IF_NONE_MATCH, validator);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_MODIFIED => {
                tracing::debug!(path, "remote reports not modified");
                Ok(FetchOutcome::NotModified)
            }
            StatusCode::OK => {
                let validator = response
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string());
                let body = response
                    .bytes_stream()
                    .map_err(RemoteStoreError::from)
                    .boxed();
                Ok(FetchOutcome::Content(FetchContent { validator, body }))
            }
            status => {
                tracing::debug!(path, %status, "fetch returned unexpected status");
                Err(RemoteStoreError::UnexpectedStatus(status.as_u16()))
            }
        }
    }

    async fn upload(&self, path: &str, body: Bytes) -> Result<()> {
        let url = self.url_for(path)?;
        let response = self.client.put(url).body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(path, %status, "upload rejected");
            return Err(RemoteStoreError::UnexpectedStatus(status.as_u16()));
        }
        Ok(())
    }
}
