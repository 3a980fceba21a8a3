//! Storage errors

use thiserror::Error;

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Corrupt store file {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Result alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
