//! Error types for the datastore facade.

use netkv_backend::BackendError;
use netkv_core::ObjectError;
use thiserror::Error;

/// Errors that can occur during Store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid input object (no value to store, ...).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The object was modified concurrently; re-fetch and retry.
    #[error("key modified: {0}")]
    KeyModified(String),

    /// The key does not exist.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Enumeration requested on a type without a constructor.
    #[error("error listing objects, object does not implement KvConstructor")]
    NotConstructible,

    /// The object failed to encode or hydrate.
    #[error("object error: {0}")]
    Object(#[from] ObjectError),

    /// Any other backend failure, propagated unchanged.
    #[error("backend error: {0}")]
    Backend(BackendError),

    /// Invalid or unsupported configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn is_key_modified(&self) -> bool {
        matches!(self, StoreError::KeyModified(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound(_))
    }
}

impl From<BackendError> for StoreError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::KeyExists(key) | BackendError::KeyModified(key) => {
                StoreError::KeyModified(key)
            }
            BackendError::KeyNotFound(key) => StoreError::KeyNotFound(key),
            other => StoreError::Backend(other),
        }
    }
}

/// Result type for Store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
