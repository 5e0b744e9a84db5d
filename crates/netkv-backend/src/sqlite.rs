//! SQLite implementation of the BackingStore trait.
//!
//! This is the embedded local-scope backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Every key lives in
//! one row of the bucket's table together with its version.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::config::BackendConfig;
use crate::error::{BackendError, Result};
use crate::migration;
use crate::traits::{BackingStore, KvPair};

/// SQLite-based backend implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteBackend {
    /// The SQLite connection, `None` once closed.
    conn: Arc<Mutex<Option<Connection>>>,
    /// Table holding this backend's keys.
    table: Arc<str>,
}

impl SqliteBackend {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file (and its parent directories) and runs migrations if
    /// needed.
    pub fn open(path: impl AsRef<Path>, config: &BackendConfig) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        Self::init(Connection::open(path)?, config)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory(config: &BackendConfig) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, config)
    }

    fn init(mut conn: Connection, config: &BackendConfig) -> Result<Self> {
        config.validate()?;
        if let Some(timeout) = config.connection_timeout {
            conn.busy_timeout(timeout)?;
        }
        migration::migrate(&mut conn, &config.bucket)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            table: Arc::from(config.bucket.as_str()),
        })
    }

    /// Run a blocking operation on the connection.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = Arc::clone(&self.table);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| BackendError::Storage(format!("mutex poisoned: {e}")))?;
            let conn = guard.as_mut().ok_or(BackendError::Closed)?;
            f(conn, &table)
        })
        .await
        .map_err(|e| BackendError::Storage(format!("blocking task failed: {e}")))?
    }
}

/// Read the current version of `key`, if any.
fn current_version(conn: &Connection, table: &str, key: &str) -> Result<Option<u64>> {
    Ok(conn
        .query_row(
            &format!(r#"SELECT version FROM "{table}" WHERE key = ?1"#),
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

/// Insert or overwrite `key`, bumping its version. Returns the new version.
fn upsert(conn: &Connection, table: &str, key: &str, value: &[u8]) -> Result<u64> {
    let version = conn.query_row(
        &format!(
            r#"INSERT INTO "{table}" (key, value, version) VALUES (?1, ?2, 1)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value, version = version + 1
               RETURNING version"#
        ),
        params![key, value],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn row_to_pair(row: &rusqlite::Row<'_>) -> rusqlite::Result<KvPair> {
    let key: String = row.get("key")?;
    let value: Vec<u8> = row.get("value")?;
    let version: u64 = row.get("version")?;
    Ok(KvPair::new(key, Bytes::from(value), version))
}

#[async_trait]
impl BackingStore for SqliteBackend {
    async fn get(&self, key: &str) -> Result<KvPair> {
        let key = key.to_string();
        self.with_conn(move |conn, table| {
            conn.query_row(
                &format!(r#"SELECT key, value, version FROM "{table}" WHERE key = ?1"#),
                params![key],
                row_to_pair,
            )
            .optional()?
            .ok_or_else(|| BackendError::KeyNotFound(key.clone()))
        })
        .await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let key = key.to_string();
        let value = value.to_vec();
        self.with_conn(move |conn, table| {
            upsert(conn, table, &key, &value)?;
            Ok(())
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.with_conn(move |conn, table| Ok(current_version(conn, table, &key)?.is_some()))
            .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>> {
        let prefix = prefix.to_string();
        self.with_conn(move |conn, table| {
            let mut stmt = conn.prepare(&format!(
                r#"SELECT key, value, version FROM "{table}"
                   WHERE substr(key, 1, length(?1)) = ?1
                   ORDER BY key"#
            ))?;
            let pairs = stmt
                .query_map(params![prefix], row_to_pair)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            if pairs.is_empty() {
                return Err(BackendError::KeyNotFound(prefix));
            }
            Ok(pairs)
        })
        .await
    }

    async fn atomic_put(
        &self,
        key: &str,
        value: &[u8],
        previous: Option<&KvPair>,
    ) -> Result<KvPair> {
        let key = key.to_string();
        let value = value.to_vec();
        let expected = previous.map(|p| p.last_index);

        self.with_conn(move |conn, table| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            match (expected, current_version(&tx, table, &key)?) {
                (None, Some(_)) => return Err(BackendError::KeyExists(key)),
                (Some(_), None) => return Err(BackendError::KeyNotFound(key)),
                (Some(expected), Some(version)) if expected != version => {
                    return Err(BackendError::KeyModified(key))
                }
                _ => {}
            }

            let version = upsert(&tx, table, &key, &value)?;
            tx.commit()?;
            Ok(KvPair::new(key, Bytes::from(value), version))
        })
        .await
    }

    async fn atomic_delete(&self, key: &str, previous: &KvPair) -> Result<()> {
        let key = key.to_string();
        let expected = previous.last_index;

        self.with_conn(move |conn, table| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            match current_version(&tx, table, &key)? {
                None => return Ok(()),
                Some(version) if version != expected => {
                    return Err(BackendError::KeyModified(key))
                }
                Some(_) => {}
            }

            tx.execute(
                &format!(r#"DELETE FROM "{table}" WHERE key = ?1"#),
                params![key],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| BackendError::Storage(format!("mutex poisoned: {e}")))?;
            match guard.take() {
                Some(conn) => conn.close().map_err(|(_, e)| BackendError::Database(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| BackendError::Storage(format!("blocking task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> SqliteBackend {
        SqliteBackend::open_memory(&BackendConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_atomic_put_and_get() {
        let backend = open();

        let p1 = backend.atomic_put("a/1/", b"one", None).await.unwrap();
        assert_eq!(p1.last_index, 1);

        let p2 = backend.atomic_put("a/1/", b"two", Some(&p1)).await.unwrap();
        assert_eq!(p2.last_index, 2);

        let got = backend.get("a/1/").await.unwrap();
        assert_eq!(got, p2);
    }

    #[tokio::test]
    async fn test_conflict_detection() {
        let backend = open();
        let p1 = backend.atomic_put("a/1/", b"one", None).await.unwrap();
        backend.atomic_put("a/1/", b"two", Some(&p1)).await.unwrap();

        let err = backend.atomic_put("a/1/", b"x", None).await.unwrap_err();
        assert!(matches!(err, BackendError::KeyExists(_)));

        let err = backend.atomic_put("a/1/", b"x", Some(&p1)).await.unwrap_err();
        assert!(matches!(err, BackendError::KeyModified(_)));

        let err = backend.atomic_delete("a/1/", &p1).await.unwrap_err();
        assert!(matches!(err, BackendError::KeyModified(_)));

        // The losing writes left the value alone
        assert_eq!(backend.get("a/1/").await.unwrap().value.as_ref(), b"two");
    }

    #[tokio::test]
    async fn test_delete_and_missing_key() {
        let backend = open();
        let p1 = backend.atomic_put("a/1/", b"one", None).await.unwrap();

        backend.atomic_delete("a/1/", &p1).await.unwrap();
        backend.atomic_delete("a/1/", &p1).await.unwrap();

        let err = backend.get("a/1/").await.unwrap_err();
        assert!(matches!(err, BackendError::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_prefix_includes_placeholder() {
        let backend = open();
        backend.put("root/a/", b"").await.unwrap();
        backend.put("root/a/2/", b"2").await.unwrap();
        backend.put("root/a/1/", b"1").await.unwrap();
        backend.put("root/ab/", b"x").await.unwrap();
        backend.put("root/b/1/", b"3").await.unwrap();

        let keys: Vec<String> = backend
            .list("root/a/")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.key)
            .collect();
        assert_eq!(keys, vec!["root/a/", "root/a/1/", "root/a/2/"]);

        assert!(matches!(
            backend.list("root/c/").await,
            Err(BackendError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("local-kv.db");

        {
            let backend = SqliteBackend::open(&path, &BackendConfig::default()).unwrap();
            backend.atomic_put("k/", b"v", None).await.unwrap();
            backend.close().await.unwrap();
        }

        let backend = SqliteBackend::open(&path, &BackendConfig::default()).unwrap();
        let pair = backend.get("k/").await.unwrap();
        assert_eq!(pair.value.as_ref(), b"v");
        assert_eq!(pair.last_index, 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let backend = open();
        backend.close().await.unwrap();
        backend.close().await.unwrap();

        assert!(matches!(backend.exists("k/").await, Err(BackendError::Closed)));
    }

    #[test]
    fn test_invalid_bucket_rejected() {
        let config = BackendConfig {
            bucket: "bad name".into(),
            ..Default::default()
        };
        assert!(matches!(
            SqliteBackend::open_memory(&config),
            Err(BackendError::InvalidConfig(_))
        ));
    }
}
