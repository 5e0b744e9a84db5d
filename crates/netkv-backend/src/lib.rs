//! # netkv Backend
//!
//! Backing store abstraction for netkv. The [`BackingStore`] trait is the
//! only thing the datastore facade knows about persistence; this crate also
//! ships an in-memory implementation and an embedded SQLite one.
//!
//! ## Key Types
//!
//! - [`BackingStore`] - The async trait for all backend operations
//! - [`KvPair`] - A key, its value, and the version the backend assigned
//! - [`MemoryBackend`] - In-memory storage for tests and ephemeral use
//! - [`SqliteBackend`] - Embedded local storage
//! - [`BackendConfig`] / [`Provider`] - Backend selection and options
//!
//! ## Usage
//!
//! ```rust,no_run
//! use netkv_backend::{BackendConfig, BackingStore, SqliteBackend};
//!
//! async fn example() {
//!     let backend = SqliteBackend::open("local-kv.db", &BackendConfig::default()).unwrap();
//!
//!     // Create a key only if it does not exist yet
//!     let pair = backend.atomic_put("docker/network/v1.0/network/a/", b"{}", None).await.unwrap();
//!     assert_eq!(pair.last_index, 1);
//!
//!     // Update it, claiming the version we last saw
//!     let pair = backend.atomic_put(&pair.key, b"{\"x\":1}", Some(&pair)).await.unwrap();
//!     assert_eq!(pair.last_index, 2);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Per-key versions**: every successful write bumps the key's version by one,
//!   starting at 1 when the key is created
//! - **Distinguished errors**: version conflicts and missing keys have their own
//!   [`BackendError`] variants so callers can map them without string matching
//! - **Prefix listing**: `list` returns an error when nothing matches, which is
//!   why callers create a placeholder for the prefix before scanning

pub mod config;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use config::{BackendConfig, Provider};
pub use error::{BackendError, Result};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{BackingStore, KvPair};
