//! Durable key-value storage for client state.
//!
//! A single SQLite table holds string values under fixed keys (the persisted
//! session lives here). The schema is version-gated: each migration checks
//! the recorded version, runs inside a transaction and records the new
//! version, so re-opening an existing store is idempotent.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{PortalError, Result};

/// Current schema version for portal.db
/// Increment this when adding a new migration
pub const STORE_DB_VERSION: i32 = 1;

/// Bearer token returned by /login
pub const SESSION_TOKEN_KEY: &str = "session_token";
/// Serialized `User`
pub const USER_DATA_KEY: &str = "user_data";
/// Serialized `Profile`
pub const USER_PROFILE_KEY: &str = "user_profile";

/// Every key that belongs to the session; cleared together on logout
pub const SESSION_KEYS: [&str; 3] = [SESSION_TOKEN_KEY, USER_DATA_KEY, USER_PROFILE_KEY];

/// Shared handle to the key-value store.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Open (or create) the store file and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PortalError::Storage(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Non-durable store, used by tests and one-shot runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_: PoisonError<_>| {
            tracing::error!("Store mutex poisoned - a thread panicked while holding the lock");
            PortalError::Storage("store unavailable".to_string())
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.remove_many(&[key])
    }

    /// Remove several keys atomically.
    pub fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }
}

// ============================================================
// VERSION-GATED MIGRATIONS
// ============================================================

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    // Bootstrap: ensure db_version table exists (needed to check version)
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS db_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL,
            description TEXT
        );
        "#,
    )?;

    let current_version = get_schema_version(conn)?;
    tracing::debug!("portal.db schema version: {}", current_version);

    if current_version < 1 {
        migrate_v0_to_v1(conn)?;
    }
    Ok(())
}

fn get_schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM db_version",
        [],
        |row| row.get(0),
    )
}

/// v0→v1: Create the kv_store table
fn migrate_v0_to_v1(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("Running migration v0→v1: Create kv_store");

    conn.execute_batch(
        r#"
        BEGIN;
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        COMMIT;
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        params![1, Utc::now().to_rfc3339(), "Create kv_store"],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let store = LocalStore::open_in_memory().unwrap();
        assert_eq!(store.get("missing").unwrap(), None);

        store.set(SESSION_TOKEN_KEY, "tok-1").unwrap();
        store.set(SESSION_TOKEN_KEY, "tok-2").unwrap();
        assert_eq!(store.get(SESSION_TOKEN_KEY).unwrap().as_deref(), Some("tok-2"));

        store.remove(SESSION_TOKEN_KEY).unwrap();
        assert_eq!(store.get(SESSION_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_remove_many_leaves_other_keys() {
        let store = LocalStore::open_in_memory().unwrap();
        for key in SESSION_KEYS {
            store.set(key, "x").unwrap();
        }
        store.set("theme", "dark").unwrap();

        store.remove_many(&SESSION_KEYS).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["theme".to_string()]);
    }

    #[test]
    fn test_reopen_is_durable_and_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("portal.db");
        {
            let store = LocalStore::open(&path).unwrap();
            store.set(USER_DATA_KEY, r#"{"id":"u1"}"#).unwrap();
        }
        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.get(USER_DATA_KEY).unwrap().as_deref(), Some(r#"{"id":"u1"}"#));

        let conn = store.lock().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), STORE_DB_VERSION);
    }
}
