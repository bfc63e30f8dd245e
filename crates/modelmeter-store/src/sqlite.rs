//! SQLite-backed key-value store

use crate::kv::{KvStore, StoreError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable backend for the demo harness.
///
/// One connection behind a mutex: the store is the single shared mutable
/// resource, and every call is bounded by the connection's busy timeout.
/// Expiry is lazy: expired rows are dropped when the key is next touched.
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(db_path).map_err(unavailable)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS kv_list (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL,
                value TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_kv_list_key ON kv_list(key);
            CREATE TABLE IF NOT EXISTS kv_list_expiry (
                key TEXT PRIMARY KEY,
                expires_at INTEGER NOT NULL
            );
            ",
        )
        .map_err(unavailable)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection mutex poisoned".to_string()))
    }

    fn drop_expired_list(conn: &Connection, key: &str, now: i64) -> Result<bool, StoreError> {
        let expires_at: Option<i64> = conn
            .query_row(
                "SELECT expires_at FROM kv_list_expiry WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable)?;

        if expires_at.is_some_and(|at| now >= at) {
            conn.execute("DELETE FROM kv_list WHERE key = ?1", params![key])
                .map_err(unavailable)?;
            conn.execute("DELETE FROM kv_list_expiry WHERE key = ?1", params![key])
                .map_err(unavailable)?;
            return Ok(true);
        }
        Ok(false)
    }
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl KvStore for SqliteKv {
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;
        conn.execute(
            "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, expires_at = ?3",
            params![key, value, expires_at],
        )
        .map_err(unavailable)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, expires_at FROM kv WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(unavailable)?;

        match row {
            Some((_, expires_at)) if Utc::now().timestamp() >= expires_at => {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                    .map_err(unavailable)?;
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    fn list_push(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        Self::drop_expired_list(&conn, key, Utc::now().timestamp())?;
        conn.execute(
            "INSERT INTO kv_list (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(unavailable)?;
        Ok(())
    }

    fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        if Self::drop_expired_list(&conn, key, Utc::now().timestamp())? {
            return Ok(Vec::new());
        }

        let mut stmt = conn
            .prepare("SELECT value FROM kv_list WHERE key = ?1 ORDER BY id")
            .map_err(unavailable)?;
        let rows = stmt
            .query_map(params![key], |row| row.get(0))
            .map_err(unavailable)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(unavailable)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;

        conn.execute(
            "UPDATE kv SET expires_at = ?2 WHERE key = ?1",
            params![key, expires_at],
        )
        .map_err(unavailable)?;

        let has_list: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM kv_list WHERE key = ?1)",
                params![key],
                |row| row.get(0),
            )
            .map_err(unavailable)?;
        if has_list {
            conn.execute(
                "INSERT INTO kv_list_expiry (key, expires_at) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET expires_at = ?2",
                params![key, expires_at],
            )
            .map_err(unavailable)?;
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(unavailable)?;
        conn.execute("DELETE FROM kv_list WHERE key = ?1", params![key])
            .map_err(unavailable)?;
        conn.execute("DELETE FROM kv_list_expiry WHERE key = ?1", params![key])
            .map_err(unavailable)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_sqlite_set_get_roundtrip() {
        let kv = SqliteKv::open_in_memory().unwrap();
        kv.set_ex("request:r1", "{\"ok\":true}", HOUR).unwrap();
        assert_eq!(kv.get("request:r1").unwrap().as_deref(), Some("{\"ok\":true}"));
        assert_eq!(kv.get("request:r2").unwrap(), None);
    }

    #[test]
    fn test_sqlite_zero_ttl_expires() {
        let kv = SqliteKv::open_in_memory().unwrap();
        kv.set_ex("request:r1", "v", Duration::ZERO).unwrap();
        assert_eq!(kv.get("request:r1").unwrap(), None);
    }

    #[test]
    fn test_sqlite_list_order_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("telemetry.db");

        {
            let kv = SqliteKv::open(&db_path).unwrap();
            for id in ["r1", "r2", "r3"] {
                kv.list_push("requests:2026-08-06", id).unwrap();
            }
            kv.expire("requests:2026-08-06", HOUR).unwrap();
        }

        let kv = SqliteKv::open(&db_path).unwrap();
        assert_eq!(
            kv.list_range("requests:2026-08-06").unwrap(),
            vec!["r1", "r2", "r3"]
        );
    }

    #[test]
    fn test_sqlite_list_expiry() {
        let kv = SqliteKv::open_in_memory().unwrap();
        kv.list_push("day", "r1").unwrap();
        kv.expire("day", Duration::ZERO).unwrap();
        assert!(kv.list_range("day").unwrap().is_empty());
        // pushing again starts a fresh, unexpired list
        kv.list_push("day", "r2").unwrap();
        assert_eq!(kv.list_range("day").unwrap(), vec!["r2"]);
    }

    #[test]
    fn test_sqlite_delete() {
        let kv = SqliteKv::open_in_memory().unwrap();
        kv.set_ex("k", "v", HOUR).unwrap();
        kv.list_push("l", "a").unwrap();
        kv.delete("k").unwrap();
        kv.delete("l").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
        assert!(kv.list_range("l").unwrap().is_empty());
    }
}
