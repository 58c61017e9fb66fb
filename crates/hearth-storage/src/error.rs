//! Storage error types.

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A namespace or key contains characters the store refuses.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Another process holds the data directory.
    #[error("data directory is locked: {0}")]
    Locked(String),

    /// An I/O operation failed.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;
