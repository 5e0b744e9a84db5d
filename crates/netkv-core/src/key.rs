//! Hierarchical keys and their rendering against a root chain.
//!
//! A [`KeyPath`] is the identity of an object inside the store. It is only
//! turned into a string when it meets a [`RootChain`], which prepends the
//! namespace and schema version shared by every key of one store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path separator used in rendered keys.
pub const SEPARATOR: char = '/';

/// Default namespace/version prefix for rendered keys.
pub const DEFAULT_ROOT_CHAIN: &[&str] = &["docker", "network", "v1.0"];

/// Key prefix for network objects.
pub const NETWORK_KEY_PREFIX: &str = "network";

/// Key prefix for endpoint objects.
pub const ENDPOINT_KEY_PREFIX: &str = "endpoint";

/// An ordered sequence of path segments.
///
/// Two keys are equal iff their segment sequences are equal. Segment content
/// is never validated; callers supply well-formed path components.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Create a key from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The empty key (the root chain itself once rendered).
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// The key with its last segment removed. The root is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.0.clone();
        segments.pop();
        Self(segments)
    }

    /// Append a segment, returning the child key.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// The segments of this key.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPath({})", self)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for KeyPath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

/// The namespace/version prefix every rendered key starts with.
///
/// Each store carries its own chain, so independent stores (and test suites)
/// can use distinct namespaces side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootChain(Vec<String>);

impl RootChain {
    /// Create a root chain from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The segments of this chain.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Render a key: root chain then key segments, each followed by `/`.
    ///
    /// `docker/network/v1.0/` + `["network", "net-A"]` renders as
    /// `docker/network/v1.0/network/net-A/`.
    pub fn render(&self, key: &KeyPath) -> String {
        let mut out = String::new();
        for part in self.0.iter().chain(key.segments()) {
            out.push_str(part);
            out.push(SEPARATOR);
        }
        out
    }

    /// Render a key given as raw segments.
    pub fn key<S: AsRef<str>>(&self, segments: &[S]) -> String {
        self.render(&KeyPath::new(segments.iter().map(|s| s.as_ref().to_string())))
    }
}

impl Default for RootChain {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_CHAIN.iter().copied())
    }
}
