//! Scope configuration: which backend a store uses and how to reach it.

use std::path::Path;

use netkv_backend::{BackendConfig, Provider};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Default directory of the local datastore file.
pub const DEFAULT_PREFIX: &str = "/var/lib/docker/network/files";

/// File name of the local datastore.
pub const LOCAL_KV_FILE: &str = "local-kv.db";

/// Datastore configuration for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub client: ScopeClientConfig,
}

/// Client-side connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeClientConfig {
    /// Backend kind, e.g. `sqlite`.
    pub provider: String,
    /// Connection string. For file backends a path; only the first of a
    /// comma-separated list is used.
    pub address: String,
    /// Backend-specific options.
    pub config: Option<BackendConfig>,
}

impl ScopeConfig {
    /// The default configuration for unattended local-only operation.
    ///
    /// With `data_dir` the file lives under `<data_dir>/network/files/`,
    /// otherwise under [`DEFAULT_PREFIX`].
    pub fn default_scope(data_dir: Option<&Path>) -> Self {
        let address = match data_dir {
            Some(dir) => dir.join("network").join("files").join(LOCAL_KV_FILE),
            None => Path::new(DEFAULT_PREFIX).join(LOCAL_KV_FILE),
        };

        Self {
            client: ScopeClientConfig {
                provider: Provider::Sqlite.to_string(),
                address: address.to_string_lossy().into_owned(),
                config: Some(BackendConfig::default()),
            },
        }
    }

    /// A config is valid when both provider and address are non-blank.
    pub fn is_valid(&self) -> bool {
        !self.client.provider.trim().is_empty() && !self.client.address.trim().is_empty()
    }

    /// Parse a configuration document.
    pub fn from_json(document: &str) -> Result<Self> {
        serde_json::from_str(document).map_err(|e| {
            StoreError::Config(format!("cannot parse scope configuration {document:?}: {e}"))
        })
    }
}

/// Datastore settings handed over untyped, e.g. by a discovery service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatastoreConfigData {
    pub provider: String,
    pub address: String,
    /// Backend options; must deserialize into [`BackendConfig`] if present.
    pub config: Option<serde_json::Value>,
}

impl DatastoreConfigData {
    /// Decode the untyped backend options.
    pub fn backend_config(&self) -> Result<Option<BackendConfig>> {
        match &self.config {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    StoreError::Config(format!("cannot parse store configuration: {value}: {e}"))
                }),
        }
    }

    /// Convert into a typed scope configuration.
    pub fn to_scope_config(&self) -> Result<ScopeConfig> {
        Ok(ScopeConfig {
            client: ScopeClientConfig {
                provider: self.provider.clone(),
                address: self.address.clone(),
                config: self.backend_config()?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_scope_without_data_dir() {
        let cfg = ScopeConfig::default_scope(None);
        assert_eq!(cfg.client.provider, "sqlite");
        assert_eq!(cfg.client.address, "/var/lib/docker/network/files/local-kv.db");

        let backend = cfg.client.config.unwrap();
        assert_eq!(backend.bucket, "libnetwork");
        assert_eq!(backend.connection_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_default_scope_with_data_dir() {
        let cfg = ScopeConfig::default_scope(Some(Path::new("/srv/engine")));
        assert_eq!(cfg.client.address, "/srv/engine/network/files/local-kv.db");
        assert!(cfg.is_valid());
    }

    #[test]
    fn test_is_valid() {
        assert!(!ScopeConfig::default().is_valid());

        let mut cfg = ScopeConfig::default_scope(None);
        cfg.client.address = "   ".into();
        assert!(!cfg.is_valid());
    }

    #[test]
    fn test_from_json() {
        let cfg = ScopeConfig::from_json(
            r#"{"client":{"provider":"memory","address":"mem","config":{"bucket":"test_bucket"}}}"#,
        )
        .unwrap();
        assert_eq!(cfg.client.provider, "memory");
        assert_eq!(cfg.client.config.unwrap().bucket, "test_bucket");

        let err = ScopeConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, StoreError::Config(msg) if msg.contains("{not json")));
    }

    #[test]
    fn test_datastore_config_data_parse_failure_names_value() {
        let data = DatastoreConfigData {
            provider: "sqlite".into(),
            address: "/tmp/x.db".into(),
            config: Some(serde_json::json!({"bucket": 42})),
        };
        let err = data.backend_config().unwrap_err();
        assert!(matches!(err, StoreError::Config(msg) if msg.contains("42")));
    }

    #[test]
    fn test_datastore_config_data_without_options() {
        let data = DatastoreConfigData {
            provider: "memory".into(),
            address: "mem".into(),
            config: None,
        };
        let cfg = data.to_scope_config().unwrap();
        assert!(cfg.is_valid());
        assert!(cfg.client.config.is_none());
    }
}
