//! Placement scopes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Placement class of an object or store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Single host, embedded store.
    #[default]
    Local,
    /// Cluster wide, distributed store.
    Global,
    /// Not a datastore location; carried for objects managed by the swarm.
    Swarm,
}

impl Scope {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Global => "global",
            Scope::Swarm => "swarm",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unknown scope name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown scope: {0}")]
pub struct ParseScopeError(pub String);

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Scope::Local),
            "global" => Ok(Scope::Global),
            "swarm" => Ok(Scope::Swarm),
            other => Err(ParseScopeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_roundtrip_str() {
        for scope in [Scope::Local, Scope::Global, Scope::Swarm] {
            assert_eq!(scope.as_str().parse::<Scope>().unwrap(), scope);
        }
    }

    #[test]
    fn test_scope_unknown() {
        let err = "cluster".parse::<Scope>().unwrap_err();
        assert_eq!(err, ParseScopeError("cluster".into()));
    }

    #[test]
    fn test_scope_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Scope::Global).unwrap(), r#""global""#);
        assert_eq!(Scope::default(), Scope::Local);
    }
}
