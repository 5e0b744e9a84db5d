//! The store's in-process mirror of the object space.
//!
//! Entries are grouped by rendered key prefix, one sorted map per parent,
//! so listing a collection never walks unrelated keys. A prefix is loaded
//! from the backend the first time it is touched, with every stored key
//! under it, nested ones included.
//!
//! The cache is only reached through [`Store`](crate::Store), whose lock
//! already serializes every call, so it has no lock of its own.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use netkv_backend::BackingStore;
use netkv_core::{KvObject, RootChain};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::store::scan_prefix;

/// A mirrored object: its serialized content and index.
#[derive(Debug, Clone)]
struct CachedEntry {
    value: Bytes,
    index: u64,
}

pub(crate) struct Cache {
    root: RootChain,
    /// Rendered prefix -> (rendered key -> entry).
    prefixes: HashMap<String, BTreeMap<String, CachedEntry>>,
}

impl Cache {
    pub(crate) fn new(root: RootChain) -> Self {
        Self {
            root,
            prefixes: HashMap::new(),
        }
    }

    /// Entries of `prefix`, loading them from the backend on first use.
    async fn entries(
        &mut self,
        backend: &dyn BackingStore,
        prefix: &str,
    ) -> Result<&mut BTreeMap<String, CachedEntry>> {
        if !self.prefixes.contains_key(prefix) {
            let loaded: BTreeMap<String, CachedEntry> = scan_prefix(backend, prefix)
                .await?
                .into_iter()
                .map(|pair| {
                    (
                        pair.key,
                        CachedEntry {
                            value: pair.value,
                            index: pair.last_index,
                        },
                    )
                })
                .collect();

            debug!(prefix, entries = loaded.len(), "loaded cache prefix");
            self.prefixes.insert(prefix.to_string(), loaded);
        }

        Ok(self.prefixes.entry(prefix.to_string()).or_default())
    }

    /// Record a write.
    ///
    /// Without `skip_persist` the backend already arbitrated the write and
    /// the object carries the backend's index, which is mirrored verbatim.
    /// With `skip_persist` the cache is the only authority: the claimed
    /// version must match the cached one, and the next index is assigned here.
    pub(crate) async fn add(
        &mut self,
        backend: &dyn BackingStore,
        obj: &mut dyn KvObject,
        skip_persist: bool,
    ) -> Result<()> {
        let key = self.root.render(&obj.key());
        let prefix = self.root.render(&obj.key_prefix());
        let value = obj.value().ok_or_else(|| {
            StoreError::BadRequest(format!("invalid KV object with a nil value for key {key}"))
        })?;

        let entries = self.entries(backend, &prefix).await?;

        if skip_persist {
            let current = entries.get(&key).map(|e| e.index).unwrap_or(0);
            let claimed = if obj.exists() { obj.index() } else { 0 };
            if claimed != current {
                warn!(key = %key, claimed, current, "stale version for cached object");
                return Err(StoreError::KeyModified(key));
            }
            obj.set_index(current + 1);
        }

        entries.insert(
            key,
            CachedEntry {
                value: Bytes::from(value),
                index: obj.index(),
            },
        );
        Ok(())
    }

    /// Hydrate `obj` from the mirror.
    pub(crate) async fn get(
        &mut self,
        backend: &dyn BackingStore,
        obj: &mut dyn KvObject,
    ) -> Result<()> {
        let key = self.root.render(&obj.key());
        let prefix = self.root.render(&obj.key_prefix());

        let entries = self.entries(backend, &prefix).await?;
        let entry = entries
            .get(&key)
            .ok_or_else(|| StoreError::KeyNotFound(key.clone()))?;

        obj.set_value(&entry.value)?;
        obj.set_index(entry.index);
        Ok(())
    }

    /// Materialize every cached object under the exemplar's prefix.
    pub(crate) async fn list(
        &mut self,
        backend: &dyn BackingStore,
        exemplar: &dyn KvObject,
    ) -> Result<Vec<Box<dyn KvObject>>> {
        let ctor = exemplar.constructor().ok_or(StoreError::NotConstructible)?;
        let prefix = self.root.render(&exemplar.key_prefix());

        let entries = self.entries(backend, &prefix).await?;
        let mut objects = Vec::with_capacity(entries.len());
        for entry in entries.values() {
            let mut obj = ctor.new_object();
            obj.set_value(&entry.value)?;
            obj.set_index(entry.index);
            objects.push(obj);
        }
        Ok(objects)
    }

    /// Remove the object's entry. Removing an absent key is a no-op.
    ///
    /// With `skip_persist` a stale index is rejected, since nothing else
    /// arbitrates deletes of cache-only objects.
    pub(crate) async fn del(
        &mut self,
        backend: &dyn BackingStore,
        obj: &dyn KvObject,
        skip_persist: bool,
    ) -> Result<()> {
        let key = self.root.render(&obj.key());
        let prefix = self.root.render(&obj.key_prefix());

        let entries = self.entries(backend, &prefix).await?;

        if skip_persist {
            if let Some(entry) = entries.get(&key) {
                if entry.index != obj.index() {
                    warn!(
                        key = %key,
                        claimed = obj.index(),
                        current = entry.index,
                        "stale version for cached object"
                    );
                    return Err(StoreError::KeyModified(key));
                }
            }
        }

        entries.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netkv_backend::MemoryBackend;
    use netkv_testkit::NetworkRecord;

    fn cache() -> (Cache, MemoryBackend) {
        (Cache::new(RootChain::default()), MemoryBackend::new())
    }

    #[tokio::test]
    async fn test_skip_add_sequences_from_one() {
        let (mut cache, backend) = cache();
        let mut net = NetworkRecord::new("net-A").skip_persist();

        cache.add(&backend, &mut net, true).await.unwrap();
        assert_eq!(net.index(), 1);

        cache.add(&backend, &mut net, true).await.unwrap();
        assert_eq!(net.index(), 2);
    }

    #[tokio::test]
    async fn test_skip_add_rejects_stale_version() {
        let (mut cache, backend) = cache();
        let mut net = NetworkRecord::new("net-A").skip_persist();
        cache.add(&backend, &mut net, true).await.unwrap();

        let mut stale = net.clone();
        cache.add(&backend, &mut net, true).await.unwrap();

        let err = cache.add(&backend, &mut stale, true).await.unwrap_err();
        assert!(err.is_key_modified());
        assert_eq!(stale.index(), 1);

        // A fresh object cannot overwrite an existing cache-only entry either
        let mut fresh = NetworkRecord::new("net-A").skip_persist();
        assert!(cache.add(&backend, &mut fresh, true).await.unwrap_err().is_key_modified());
    }

    #[tokio::test]
    async fn test_mirror_add_keeps_backend_index() {
        let (mut cache, backend) = cache();
        let mut net = NetworkRecord::new("net-A");
        net.set_index(7);

        cache.add(&backend, &mut net, false).await.unwrap();
        assert_eq!(net.index(), 7);

        let mut read = NetworkRecord::new("net-A");
        cache.get(&backend, &mut read).await.unwrap();
        assert_eq!(read.index(), 7);
    }

    #[tokio::test]
    async fn test_get_returns_deep_copy() {
        let (mut cache, backend) = cache();
        let mut net = NetworkRecord::new("net-A").with_driver("bridge").skip_persist();
        cache.add(&backend, &mut net, true).await.unwrap();

        // Mutating the caller's instance does not reach the mirror
        net.driver = "overlay".into();

        let mut read = NetworkRecord::new("net-A");
        cache.get(&backend, &mut read).await.unwrap();
        assert_eq!(read.driver, "bridge");
    }

    #[tokio::test]
    async fn test_get_miss() {
        let (mut cache, backend) = cache();
        let mut net = NetworkRecord::new("missing");
        assert!(cache.get(&backend, &mut net).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_lazy_load_from_backend() {
        let (mut cache, backend) = cache();
        let root = RootChain::default();
        let record = NetworkRecord::new("net-A").with_driver("macvlan");
        backend
            .atomic_put(&root.render(&record.key()), &record.value().unwrap(), None)
            .await
            .unwrap();

        let mut read = NetworkRecord::new("net-A");
        cache.get(&backend, &mut read).await.unwrap();
        assert_eq!(read.driver, "macvlan");
        assert_eq!(read.index(), 1);

        // The prefix placeholder was created
        assert!(backend.exists(&root.key(&["network"])).await.unwrap());
    }

    #[tokio::test]
    async fn test_lazy_load_keeps_nested_keys() {
        let (mut cache, backend) = cache();
        let root = RootChain::default();
        let nested = NetworkRecord::new("net-A");
        backend
            .atomic_put(&root.key(&["network", "zone1", "net-A"]), &nested.value().unwrap(), None)
            .await
            .unwrap();

        let listed = cache.list(&backend, &NetworkRecord::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].index(), 1);
    }

    #[tokio::test]
    async fn test_list_requires_constructor() {
        let (mut cache, backend) = cache();
        let opaque = netkv_testkit::OpaqueRecord::new(["network", "x"], Some(b"x".to_vec()));
        let err = cache.list(&backend, &opaque).await.unwrap_err();
        assert!(matches!(err, StoreError::NotConstructible));
    }

    #[tokio::test]
    async fn test_del_is_idempotent_and_checks_skip_version() {
        let (mut cache, backend) = cache();
        let mut net = NetworkRecord::new("net-A").skip_persist();
        cache.add(&backend, &mut net, true).await.unwrap();

        let mut stale = net.clone();
        stale.set_index(5);
        assert!(cache.del(&backend, &stale, true).await.unwrap_err().is_key_modified());

        cache.del(&backend, &net, true).await.unwrap();
        cache.del(&backend, &net, true).await.unwrap();

        let mut read = NetworkRecord::new("net-A");
        assert!(cache.get(&backend, &mut read).await.unwrap_err().is_not_found());
    }
}
