//! Backend fixtures.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use netkv_backend::{BackendError, BackingStore, KvPair, MemoryBackend, Result};

/// A fresh in-memory backend, ready to hand to a store.
pub fn memory_backend() -> Arc<dyn BackingStore> {
    Arc::new(MemoryBackend::new())
}

/// Wraps a backend and fails its conditional writes on demand.
///
/// Reads and unconditional puts always go through, so a store's lazy cache
/// loading keeps working while writes are failing.
pub struct FailingBackend {
    inner: Arc<dyn BackingStore>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl FailingBackend {
    pub fn new(inner: Arc<dyn BackingStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(memory_backend())
    }

    /// Toggle failure of `atomic_put` and `atomic_delete`.
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of conditional writes that reached the wrapped backend.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &Arc<dyn BackingStore> {
        &self.inner
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Storage(format!("injected write failure at {key}")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BackingStore for FailingBackend {
    async fn get(&self, key: &str) -> Result<KvPair> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner.put(key, value).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>> {
        self.inner.list(prefix).await
    }

    async fn atomic_put(
        &self,
        key: &str,
        value: &[u8],
        previous: Option<&KvPair>,
    ) -> Result<KvPair> {
        self.check(key)?;
        self.inner.atomic_put(key, value, previous).await
    }

    async fn atomic_delete(&self, key: &str, previous: &KvPair) -> Result<()> {
        self.check(key)?;
        self.inner.atomic_delete(key, previous).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_backend_toggles() {
        let backend = FailingBackend::in_memory();
        backend.atomic_put("k/", b"v", None).await.unwrap();
        assert_eq!(backend.writes(), 1);

        backend.fail_writes(true);
        let err = backend.atomic_put("k2/", b"v", None).await.unwrap_err();
        assert!(matches!(err, BackendError::Storage(_)));
        assert!(!backend.inner().exists("k2/").await.unwrap());

        // Reads still pass through
        assert_eq!(backend.get("k/").await.unwrap().last_index, 1);

        backend.fail_writes(false);
        let previous = KvPair::previous("k/", 1);
        backend.atomic_delete("k/", &previous).await.unwrap();
        assert_eq!(backend.writes(), 2);
    }
}
