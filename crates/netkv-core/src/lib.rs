//! # netkv Core
//!
//! Pure contracts for the netkv datastore: hierarchical keys, placement
//! scopes, and the traits every persisted network object implements.
//!
//! This crate contains no I/O, no storage, no locking. Backends live in
//! `netkv-backend`, the facade and its cache live in `netkv`.
//!
//! ## Key Types
//!
//! - [`KeyPath`] - An ordered sequence of path segments
//! - [`RootChain`] - The namespace/version prefix every rendered key starts with
//! - [`Scope`] - Placement class of an object (local vs. global)
//! - [`KvObject`] - The contract for versioned, serializable objects
//! - [`KvConstructor`] - Factory capability needed for enumeration

pub mod error;
pub mod key;
pub mod object;
pub mod scope;

pub use error::{ObjectError, Result};
pub use key::{KeyPath, RootChain, DEFAULT_ROOT_CHAIN, ENDPOINT_KEY_PREFIX, NETWORK_KEY_PREFIX};
pub use object::{KvConstructor, KvObject};
pub use scope::{ParseScopeError, Scope};
