//! Storage error types.

use std::path::PathBuf;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The key is invalid.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The backing file could not be read, written, or locked.
    #[error("state file error at {path}: {message}")]
    Io {
        /// Path of the file involved.
        path: PathBuf,
        /// Error description.
        message: String,
    },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
