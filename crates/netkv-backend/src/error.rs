//! Error types for the backend module.

use thiserror::Error;

/// Errors that can occur during backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The key does not exist.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key exists but the write required it not to.
    #[error("key already exists: {0}")]
    KeyExists(String),

    /// The key's version differs from the one the caller claimed.
    #[error("key modified: {0}")]
    KeyModified(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic storage failure (poisoned lock, join failure, ...).
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid backend configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The backend has been closed.
    #[error("backend is closed")]
    Closed,

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// True for the version-mismatch conditions (`KeyExists`, `KeyModified`).
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::KeyExists(_) | BackendError::KeyModified(_))
    }
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
