//! # netkv Testkit
//!
//! Testing utilities for netkv.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Objects**: Small domain records implementing the object contracts
//! - **Fixtures**: Backend helpers, including a fault-injecting backend
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Objects
//!
//! ```rust
//! use netkv_core::KvObject;
//! use netkv_testkit::NetworkRecord;
//!
//! let net = NetworkRecord::new("net-A").with_driver("bridge");
//! assert!(!net.exists());
//! assert!(net.constructor().is_some());
//! ```
//!
//! ## Fault Injection
//!
//! ```rust
//! use netkv_testkit::fixtures::FailingBackend;
//!
//! let backend = FailingBackend::in_memory();
//! backend.fail_writes(true);
//! ```

pub mod fixtures;
pub mod generators;
pub mod objects;

pub use fixtures::{memory_backend, FailingBackend};
pub use objects::{EndpointRecord, NetworkRecord, OpaqueRecord};
