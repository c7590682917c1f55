//! Client contract for the remote document store.
//!
//! The cache core consumes the store through two operations: a conditional
//! fetch (GET with an optional validator precondition) and a full-content
//! upload (PUT). Transports that can ask for a request-level retry surface
//! that as [`FetchOutcome::Retry`]; callers loop on it until a definitive
//! status or a transport failure is obtained.

mod error;
mod http;

pub use error::{RemoteStoreError, Result};
pub use http::HttpRemoteStore;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Stream of body chunks for a full-content response.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Outcome of a conditional fetch.
pub enum FetchOutcome {
    /// The validator still matches; the caller's local copy is current.
    NotModified,
    /// Transport-level signal to reissue the same request.
    Retry,
    /// Full content follows; the previous local copy (if any) is stale.
    Content(FetchContent),
}

/// Full-content response: the new validator plus the streaming body.
pub struct FetchContent {
    /// Validator token identifying this content version, when the store
    /// supplies one.
    pub validator: Option<String>,
    /// The complete resource body.
    pub body: ByteStream,
}

impl FetchContent {
    /// Build a full-content outcome from an in-memory body.
    pub fn from_bytes(validator: Option<String>, body: Bytes) -> Self {
        Self {
            validator,
            body: Box::pin(futures::stream::once(async move { Ok(body) })),
        }
    }
}

/// Remote document store session.
///
/// Implementations are shared across concurrent callers; both operations
/// take `&self`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the resource at `path`, preconditioned on `validator` when one
    /// is supplied ("fetch only if changed").
    async fn conditional_fetch(
        &self,
        path: &str,
        validator: Option<&str>,
    ) -> Result<FetchOutcome>;

    /// Replace the remote resource at `path` with `body`.
    async fn upload(&self, path: &str, body: Bytes) -> Result<()>;
}
