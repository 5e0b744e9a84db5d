//! # netkv
//!
//! Versioned key-value datastore for container network objects. Every
//! object gets atomic, optimistically-concurrent persistence, a transparent
//! read cache, and prefix enumeration, on top of any [`BackingStore`].
//!
//! ## Overview
//!
//! - **Store**: the facade. One lock serializes every operation, backend
//!   round trip included.
//! - **Cache**: an in-process mirror that serves reads without touching the
//!   backend and sequences cache-only (skip-persistence) objects itself.
//! - **Versions**: every successful write bumps the object's index. A write
//!   carrying a stale index fails with [`StoreError::KeyModified`]; the
//!   caller re-fetches and retries.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use netkv::{ScopeConfig, Store};
//!
//! async fn example() {
//!     // Local scope, embedded SQLite under the given data directory
//!     let config = ScopeConfig::default_scope(Some("/var/lib/engine".as_ref()));
//!     let store = Store::new(config).unwrap();
//!
//!     // let mut network: impl KvObject = ...;
//!     // store.put_object_atomic(&mut network).await.unwrap();
//!     // store.get_object(&store.key(&network.key()), &mut network).await.unwrap();
//!
//!     store.close().await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `netkv::core` - Keys, scopes, and the object contracts
//! - `netkv::backend` - Backend trait and implementations

mod cache;
pub mod config;
pub mod error;
pub mod store;

// Re-export component crates
pub use netkv_backend as backend;
pub use netkv_core as core;

// Re-export main types for convenience
pub use config::{DatastoreConfigData, ScopeClientConfig, ScopeConfig};
pub use error::{Result, StoreError};
pub use store::Store;

// Re-export commonly used component types
pub use netkv_backend::{BackendConfig, BackingStore, KvPair, MemoryBackend, Provider, SqliteBackend};
pub use netkv_core::{
    KeyPath, KvConstructor, KvObject, RootChain, Scope, ENDPOINT_KEY_PREFIX, NETWORK_KEY_PREFIX,
};
