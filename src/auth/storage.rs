//! Key/value storage capability behind the coach session.
//!
//! The session never talks to a concrete backend; it is handed something
//! implementing [`KeyValueStore`]. Every method is infallible from the
//! caller's point of view: a backend fault reads as "absent" and a failed
//! write or delete reports `false`. Nothing here panics or returns an error
//! once the store is open.
//!
//! ## Backends
//! - [`MemoryStore`]: process-local map, used by tests and embedders
//! - [`SqliteStore`]: file-backed table that several processes can share,
//!   last write wins per key, no multi-key transactions

use parking_lot::Mutex;
use rusqlite::OptionalExtension;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Fixed key names. Other collaborators read these directly, so they are
/// part of the storage contract.
pub struct StorageKeys;

impl StorageKeys {
    /// Pending one-time login code.
    pub const LOGIN_CODE: &'static str = "coachLoginCode";
    /// Expiry of the pending code, decimal epoch milliseconds.
    pub const LOGIN_EXPIRES: &'static str = "coachLoginExpires";
    /// Authenticated-session marker, only ever `"true"` or absent.
    pub const IS_LOGGED_IN: &'static str = "isCoachLoggedIn";
}

/// String-keyed storage with fail-safe semantics.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `None` when absent or when the backend failed.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, overwriting any previous one. `false` on failure.
    fn set(&self, key: &str, value: &str) -> bool;

    /// Delete a key. Deleting an absent key succeeds. `false` on failure.
    fn remove(&self, key: &str) -> bool;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> bool {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> bool {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> bool {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> bool {
        (**self).remove(key)
    }
}

// ── In-memory backend ───────────────────────────────────────────────

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.entries.lock().insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key);
        true
    }
}

// ── SQLite backend ──────────────────────────────────────────────────

/// SQLite-backed store. Point several processes at the same file to share
/// one coach session between them.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    /// Open (or create) a file-backed store.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = rusqlite::Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
        Self::init_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_tables(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock();
        match conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = key, "Storage read failed: {e}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> bool {
        let conn = self.conn.lock();
        match conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        ) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(key = key, "Storage write failed: {e}");
                false
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        let conn = self.conn.lock();
        match conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key]) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(key = key, "Storage delete failed: {e}");
                false
            }
        }
    }
}
