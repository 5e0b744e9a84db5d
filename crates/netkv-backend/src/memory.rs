//! In-memory implementation of the BackingStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{BackendError, Result};
use crate::traits::{BackingStore, KvPair};

/// In-memory backend implementation.
///
/// All data is lost when the backend is dropped. Thread-safe via RwLock.
#[derive(Debug)]
pub struct MemoryBackend {
    inner: RwLock<MemoryBackendInner>,
}

#[derive(Debug, Default)]
struct MemoryBackendInner {
    /// Keys in sorted order so prefix scans are a contiguous range.
    entries: BTreeMap<String, StoredValue>,
    closed: bool,
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: Bytes,
    version: u64,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryBackendInner::default()),
        }
    }

    /// Number of stored keys, placeholders included.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryBackendInner>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| BackendError::Storage(format!("lock poisoned: {e}")))?;
        if inner.closed {
            return Err(BackendError::Closed);
        }
        Ok(inner)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryBackendInner>> {
        let inner = self
            .inner
            .write()
            .map_err(|e| BackendError::Storage(format!("lock poisoned: {e}")))?;
        if inner.closed {
            return Err(BackendError::Closed);
        }
        Ok(inner)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackendInner {
    fn store(&mut self, key: &str, value: &[u8]) -> u64 {
        let version = self.entries.get(key).map(|v| v.version).unwrap_or(0) + 1;
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: Bytes::copy_from_slice(value),
                version,
            },
        );
        version
    }
}

#[async_trait]
impl BackingStore for MemoryBackend {
    async fn get(&self, key: &str) -> Result<KvPair> {
        let inner = self.read()?;
        inner
            .entries
            .get(key)
            .map(|v| KvPair::new(key, v.value.clone(), v.version))
            .ok_or_else(|| BackendError::KeyNotFound(key.to_string()))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut inner = self.write()?;
        inner.store(key, value);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.entries.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>> {
        let inner = self.read()?;

        let pairs: Vec<KvPair> = inner
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, v)| KvPair::new(key.clone(), v.value.clone(), v.version))
            .collect();

        if pairs.is_empty() {
            return Err(BackendError::KeyNotFound(prefix.to_string()));
        }
        Ok(pairs)
    }

    async fn atomic_put(
        &self,
        key: &str,
        value: &[u8],
        previous: Option<&KvPair>,
    ) -> Result<KvPair> {
        let mut inner = self.write()?;

        let current = inner.entries.get(key).map(|v| v.version);
        match (previous, current) {
            (None, Some(_)) => return Err(BackendError::KeyExists(key.to_string())),
            (Some(_), None) => return Err(BackendError::KeyNotFound(key.to_string())),
            (Some(prev), Some(version)) if prev.last_index != version => {
                return Err(BackendError::KeyModified(key.to_string()))
            }
            _ => {}
        }

        let version = inner.store(key, value);
        Ok(KvPair::new(key, Bytes::copy_from_slice(value), version))
    }

    async fn atomic_delete(&self, key: &str, previous: &KvPair) -> Result<()> {
        let mut inner = self.write()?;

        match inner.entries.get(key).map(|v| v.version) {
            None => Ok(()),
            Some(version) if version != previous.last_index => {
                Err(BackendError::KeyModified(key.to_string()))
            }
            Some(_) => {
                inner.entries.remove(key);
                Ok(())
            }
        }
    }

    async fn close(&self) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| BackendError::Storage(format!("lock poisoned: {e}")))?;
        inner.closed = true;
        Ok(())
    }
}
