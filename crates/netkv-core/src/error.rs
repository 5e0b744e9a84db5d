//! Error types for netkv core contracts.

use thiserror::Error;

/// Errors raised by [`KvObject`](crate::KvObject) implementations while
/// encoding or hydrating their content.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for object operations.
pub type Result<T> = std::result::Result<T, ObjectError>;
