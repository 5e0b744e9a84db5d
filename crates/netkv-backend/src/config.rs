//! Backend selection and backend-specific options.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Default bucket (SQLite table) name.
pub const DEFAULT_BUCKET: &str = "libnetwork";

/// Default connection timeout.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Supported backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Embedded SQLite database file.
    Sqlite,
    /// Process memory, nothing persisted.
    Memory,
}

impl Provider {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provider::Sqlite => "sqlite",
            Provider::Memory => "memory",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sqlite" => Ok(Provider::Sqlite),
            "memory" => Ok(Provider::Memory),
            other => Err(BackendError::InvalidConfig(format!(
                "unsupported KV store: {other}"
            ))),
        }
    }
}

/// Backend-specific options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Bucket the keys live in. For SQLite this is the table name.
    pub bucket: String,
    /// How long to wait on a busy database before failing.
    pub connection_timeout: Option<Duration>,
}

impl BackendConfig {
    /// Check the bucket is usable as an identifier.
    pub fn validate(&self) -> Result<(), BackendError> {
        let ok = !self.bucket.is_empty()
            && self
                .bucket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !self.bucket.starts_with(|c: char| c.is_ascii_digit());
        if ok {
            Ok(())
        } else {
            Err(BackendError::InvalidConfig(format!(
                "invalid bucket name: {:?}",
                self.bucket
            )))
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            connection_timeout: Some(DEFAULT_CONNECTION_TIMEOUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("sqlite".parse::<Provider>().unwrap(), Provider::Sqlite);
        assert_eq!(" memory ".parse::<Provider>().unwrap(), Provider::Memory);
        assert!(matches!(
            "boltdb".parse::<Provider>(),
            Err(BackendError::InvalidConfig(msg)) if msg.contains("boltdb")
        ));
    }

    #[test]
    fn test_bucket_validation() {
        assert!(BackendConfig::default().validate().is_ok());

        for bad in ["", "drop table", "1abc", "a-b"] {
            let config = BackendConfig {
                bucket: bad.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_config_defaults_when_fields_missing() {
        let config: BackendConfig = serde_json::from_str(r#"{"bucket":"netstore"}"#).unwrap();
        assert_eq!(config.bucket, "netstore");
        assert_eq!(config.connection_timeout, Some(DEFAULT_CONNECTION_TIMEOUT));
    }
}
