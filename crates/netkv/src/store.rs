//! The Store: the public datastore facade.
//!
//! The Store composes a [`BackingStore`] with the [`Cache`] and gives every
//! object atomic, optimistically-concurrent persistence. Durable writes are
//! confirmed by the backend before the cache is touched; skip-persistence
//! writes are sequenced by the cache alone.

use std::collections::HashMap;
use std::sync::Arc;

use netkv_backend::{BackendError, BackingStore, KvPair, MemoryBackend, Provider, SqliteBackend};
use netkv_core::{KeyPath, KvObject, RootChain, Scope};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::config::{DatastoreConfigData, ScopeClientConfig, ScopeConfig};
use crate::error::{Result, StoreError};

/// Versioned object store for one scope.
///
/// Every public operation holds one lock for its whole duration, backend
/// round trip included, so all operations against one Store are totally
/// ordered. Distinct stores are independent.
pub struct Store {
    scope: Scope,
    root: RootChain,
    backend: Arc<dyn BackingStore>,
    /// The facade lock. `None` when the store runs without a cache.
    cache: Mutex<Option<Cache>>,
}

impl Store {
    /// Create a store from a scope configuration.
    ///
    /// An incomplete configuration (blank provider or address) falls back to
    /// [`ScopeConfig::default_scope`]. Stores built this way are local scope
    /// and cached.
    pub fn new(config: ScopeConfig) -> Result<Self> {
        let config = if config.client.provider.is_empty() || config.client.address.is_empty() {
            warn!("incomplete datastore configuration, using the default local scope");
            ScopeConfig::default_scope(None)
        } else {
            config
        };

        let backend = open_backend(&config.client)?;
        Ok(Self::from_backend(backend, Scope::Local))
    }

    /// Create a store from untyped datastore settings.
    pub fn from_config(data: &DatastoreConfigData) -> Result<Self> {
        let config = data.to_scope_config()?;
        Self::new(config).map_err(|e| {
            StoreError::Config(format!(
                "failed to construct datastore client from datastore configuration {data:?}: {e}"
            ))
        })
    }

    /// Create a cached store over an existing backend, with the default root chain.
    pub fn from_backend(backend: Arc<dyn BackingStore>, scope: Scope) -> Self {
        let root = RootChain::default();
        Self {
            scope,
            cache: Mutex::new(Some(Cache::new(root.clone()))),
            root,
            backend,
        }
    }

    /// Use a different root chain for every key of this store.
    pub fn with_root_chain(mut self, root: RootChain) -> Self {
        let cache = self.cache.get_mut();
        if cache.is_some() {
            *cache = Some(Cache::new(root.clone()));
        }
        self.root = root;
        self
    }

    /// Serve every operation straight from the backend.
    pub fn without_cache(mut self) -> Self {
        *self.cache.get_mut() = None;
        self
    }

    /// Placement scope of this store.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn root_chain(&self) -> &RootChain {
        &self.root
    }

    /// Render `key` against this store's root chain.
    pub fn key(&self, key: &KeyPath) -> String {
        self.root.render(key)
    }

    /// The backend this store writes through to.
    pub fn backend(&self) -> &Arc<dyn BackingStore> {
        &self.backend
    }

    /// Atomically create or update an object.
    ///
    /// A new object (`!exists()`) must not be present yet; an existing one
    /// must still be at the index it carries. On success the object carries
    /// its new index. Fails with [`StoreError::KeyModified`] on a stale index.
    pub async fn put_object_atomic(&self, obj: &mut dyn KvObject) -> Result<()> {
        let mut cache = self.cache.lock().await;

        let key = self.key(&obj.key());
        let value = obj.value().ok_or_else(|| {
            StoreError::BadRequest(format!("invalid KV object with a nil value for key {key}"))
        })?;
        let skip = obj.skip();

        if !skip {
            let previous = obj
                .exists()
                .then(|| KvPair::previous(key.as_str(), obj.index()));

            let pair = self
                .backend
                .atomic_put(&key, &value, previous.as_ref())
                .await
                .map_err(|e| {
                    let e = StoreError::from(e);
                    if e.is_key_modified() {
                        warn!(key = %key, index = obj.index(), "atomic put lost a version race");
                    }
                    e
                })?;

            obj.set_index(pair.last_index);
        }

        if let Some(cache) = cache.as_mut() {
            cache.add(self.backend.as_ref(), obj, skip).await?;
        }

        debug!(key = %key, index = obj.index(), skip, "stored object");
        Ok(())
    }

    /// Load an object. With a cache the lookup uses the object's own key.
    pub async fn get_object(&self, key: &str, obj: &mut dyn KvObject) -> Result<()> {
        let mut cache = self.cache.lock().await;

        if let Some(cache) = cache.as_mut() {
            return cache.get(self.backend.as_ref(), obj).await;
        }

        let pair = self.backend.get(key).await?;
        obj.set_value(&pair.value)?;
        obj.set_index(pair.last_index);
        Ok(())
    }

    /// List the objects under a prefix, typed by `exemplar`.
    ///
    /// With a cache the prefix is the exemplar's `key_prefix()`; without,
    /// the backend is scanned under `key`.
    pub async fn list(&self, key: &str, exemplar: &dyn KvObject) -> Result<Vec<Box<dyn KvObject>>> {
        let mut cache = self.cache.lock().await;

        if let Some(cache) = cache.as_mut() {
            return cache.list(self.backend.as_ref(), exemplar).await;
        }

        Ok(self
            .objects_from_backend(key, exemplar)
            .await?
            .into_iter()
            .map(|(_, obj)| obj)
            .collect())
    }

    /// Map the objects under a prefix by key, typed by `exemplar`.
    ///
    /// Always scans the backend, never the cache, so cache-only objects do
    /// not show up here. Keys are trimmed of leading and trailing `/`.
    pub async fn map(
        &self,
        key: &str,
        exemplar: &dyn KvObject,
    ) -> Result<HashMap<String, Box<dyn KvObject>>> {
        let _guard = self.cache.lock().await;

        Ok(self
            .objects_from_backend(key, exemplar)
            .await?
            .into_iter()
            .map(|(key, obj)| (key.trim_matches('/').to_string(), obj))
            .collect())
    }

    /// Atomically delete an object at the index it carries.
    ///
    /// The cache is only cleaned up once the backend confirmed the delete.
    pub async fn delete_object_atomic(&self, obj: &dyn KvObject) -> Result<()> {
        let mut cache = self.cache.lock().await;

        let key = self.key(&obj.key());
        let skip = obj.skip();

        if !skip {
            let previous = KvPair::previous(key.as_str(), obj.index());
            self.backend
                .atomic_delete(&key, &previous)
                .await
                .map_err(|e| {
                    let e = StoreError::from(e);
                    if e.is_key_modified() {
                        warn!(key = %key, index = obj.index(), "atomic delete lost a version race");
                    }
                    e
                })?;
        }

        if let Some(cache) = cache.as_mut() {
            cache.del(self.backend.as_ref(), obj, skip).await?;
        }

        debug!(key = %key, skip, "deleted object");
        Ok(())
    }

    /// Release the backend's resources.
    pub async fn close(&self) -> Result<()> {
        Ok(self.backend.close().await?)
    }

    async fn objects_from_backend(
        &self,
        key: &str,
        exemplar: &dyn KvObject,
    ) -> Result<Vec<(String, Box<dyn KvObject>)>> {
        let ctor = exemplar.constructor().ok_or(StoreError::NotConstructible)?;

        let mut objects = Vec::new();
        for pair in scan_prefix(self.backend.as_ref(), key).await? {
            let mut obj = ctor.new_object();
            obj.set_value(&pair.value)?;
            obj.set_index(pair.last_index);
            objects.push((pair.key, obj));
        }
        Ok(objects)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("scope", &self.scope)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Make sure the prefix key exists so a scan never fails just because no
/// child has been written yet.
pub(crate) async fn ensure_parent(backend: &dyn BackingStore, parent: &str) -> Result<()> {
    if backend.exists(parent).await? {
        return Ok(());
    }
    backend.put(parent, &[]).await?;
    Ok(())
}

/// Every stored pair under `prefix`, placeholders excluded.
pub(crate) async fn scan_prefix(backend: &dyn BackingStore, prefix: &str) -> Result<Vec<KvPair>> {
    ensure_parent(backend, prefix).await?;

    Ok(backend
        .list(prefix)
        .await?
        .into_iter()
        .filter(|pair| !pair.value.is_empty())
        .collect())
}

fn open_backend(client: &ScopeClientConfig) -> Result<Arc<dyn BackingStore>> {
    let provider: Provider = client
        .provider
        .parse()
        .map_err(|e: BackendError| StoreError::Config(e.to_string()))?;
    let options = client.config.clone().unwrap_or_default();
    let address = client.address.split(',').next().unwrap_or_default().trim();

    match provider {
        Provider::Sqlite => Ok(Arc::new(SqliteBackend::open(address, &options)?)),
        Provider::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}
