//! Error types for the file cache.

use std::path::PathBuf;

/// Errors that can occur when working with the file cache.
#[derive(Debug, thiserror::Error)]
pub enum FileCacheError {
    /// Metadata store error
    #[error("metadata store error: {0}")]
    Db(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store error
    #[error("remote store error: {0}")]
    Remote(#[from] remote_store::RemoteStoreError),

    /// Write attempted on a handle opened without write access
    #[error("handle is not open for writing")]
    AccessDenied,

    /// Staging directory could not be created
    #[error("failed to create staging directory {0}: {1}")]
    StagingDir(PathBuf, std::io::Error),
}

/// Result type alias for file cache operations.
pub type Result<T> = std::result::Result<T, FileCacheError>;
