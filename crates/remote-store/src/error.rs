//! Error types for the remote store client.

/// Errors that can occur talking to the remote document store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteStoreError {
    /// HTTP transport error
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response status outside the protocol's expected set
    #[error("unexpected response status: {0}")]
    UnexpectedStatus(u16),

    /// Request URL could not be built
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for remote store operations.
pub type Result<T> = std::result::Result<T, RemoteStoreError>;
