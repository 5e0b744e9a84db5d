//! BackingStore trait: the abstract interface for key-value persistence.
//!
//! This trait keeps the datastore facade storage-agnostic. Implementations
//! include SQLite (embedded, local scope) and in-memory (for tests).

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A stored key, its value, and the version the backend assigned to it.
#[derive(Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Bytes,
    pub last_index: u64,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>, last_index: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            last_index,
        }
    }

    /// A previous-version token for atomic operations: key and expected version.
    pub fn previous(key: impl Into<String>, last_index: u64) -> Self {
        Self::new(key, Bytes::new(), last_index)
    }
}

impl fmt::Debug for KvPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.value[..self.value.len().min(16)];
        f.debug_struct("KvPair")
            .field("key", &self.key)
            .field("value", &format_args!("{}({} bytes)", hex::encode(shown), self.value.len()))
            .field("last_index", &self.last_index)
            .finish()
    }
}

/// The BackingStore trait: async interface for versioned key-value storage.
///
/// # Design Notes
///
/// - **Versions**: every successful `put`/`atomic_put` sets the key's version to
///   the previous version plus one, 1 for a new key.
/// - **Conflicts**: `atomic_put` with `previous == None` fails with `KeyExists` if
///   the key is present; with `Some(previous)` it fails with `KeyModified` if the
///   stored version differs, and `KeyNotFound` if the key is gone.
/// - **Deletes**: `atomic_delete` of an absent key is a no-op.
/// - **Listing**: `list` returns every pair whose key starts with `prefix`,
///   the prefix key itself included, sorted by key. An empty result is
///   reported as `KeyNotFound`.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Get the pair stored at `key`.
    async fn get(&self, key: &str) -> Result<KvPair>;

    /// Unconditionally store `value` at `key`.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Check whether `key` exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// List all pairs under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>>;

    /// Store `value` at `key` if the stored version still matches `previous`.
    ///
    /// Returns the pair as stored, carrying the new version.
    async fn atomic_put(&self, key: &str, value: &[u8], previous: Option<&KvPair>)
        -> Result<KvPair>;

    /// Delete `key` if its stored version still matches `previous`.
    async fn atomic_delete(&self, key: &str, previous: &KvPair) -> Result<()>;

    /// Release the backend's resources. Later calls fail with `Closed`.
    async fn close(&self) -> Result<()>;
}
