//! Database schema migrations for SQLite.
//!
//! Each bucket is its own table and carries its own schema version, so
//! several buckets can share one database file. Each migration transforms a
//! bucket's schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{BackendError, Result};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the schema of `bucket`.
///
/// The bucket name must already be validated as an identifier.
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection, bucket: &str) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            bucket TEXT NOT NULL,
            version INTEGER NOT NULL,
            applied_at INTEGER NOT NULL,
            PRIMARY KEY (bucket, version)
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations WHERE bucket = ?1",
        [bucket],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, bucket, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (bucket, version, applied_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![bucket, version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(bucket, version = CURRENT_VERSION, "migrated bucket schema");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, bucket: &str, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn, bucket),
        _ => Err(BackendError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: one row per key with its per-key version.
fn apply_v1(conn: &Connection, bucket: &str) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE "{bucket}" (
            key TEXT PRIMARY KEY,             -- rendered, separator-terminated key
            value BLOB NOT NULL,              -- opaque serialized object, empty for placeholders
            version INTEGER NOT NULL          -- per-key version, 1 on create
        );
        "#
    ))?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, "libnetwork").unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"libnetwork".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, "libnetwork").unwrap();
        migrate(&mut conn, "libnetwork").unwrap();

        let version: u32 = conn
            .query_row(
                "SELECT MAX(version) FROM schema_migrations WHERE bucket = 'libnetwork'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_buckets_migrate_independently() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, "local_scope").unwrap();
        migrate(&mut conn, "global_scope").unwrap();

        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
