//! Durable key/value storage trait and its SQLite and in-memory implementations.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors reported by a durable store.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("storage quota exceeded ({capacity} entries)")]
  QuotaExceeded { capacity: usize },
  #[error("storage backend error: {0}")]
  Backend(#[from] rusqlite::Error),
  #[error("storage lock poisoned")]
  Poisoned,
}

/// A byte-string key/value store that survives process restarts.
///
/// Keys are enumerable by index so callers can scan the store without
/// knowing the backend.
pub trait PersistentStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

  fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

  /// Remove a key. Removing a missing key is not an error.
  fn remove(&self, key: &str) -> Result<(), StoreError>;

  fn count(&self) -> Result<usize, StoreError>;

  /// Key at `index` in the store's stable enumeration order.
  fn key_at(&self, index: usize) -> Result<Option<String>, StoreError>;

  /// All keys that start with `prefix`.
  fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
    let mut keys = Vec::new();
    for index in 0..self.count()? {
      if let Some(key) = self.key_at(index)? {
        if key.starts_with(prefix) {
          keys.push(key);
        }
      }
    }
    Ok(keys)
  }
}

macro_rules! forward_store {
  ($wrapper:ty) => {
    impl<T: PersistentStore + ?Sized> PersistentStore for $wrapper {
      fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
      }

      fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).set(key, value)
      }

      fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
      }

      fn count(&self) -> Result<usize, StoreError> {
        (**self).count()
      }

      fn key_at(&self, index: usize) -> Result<Option<String>, StoreError> {
        (**self).key_at(index)
      }

      fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).keys_with_prefix(prefix)
      }
    }
  };
}

forward_store!(Box<T>);
forward_store!(Arc<T>);

/// In-process store with an optional entry quota.
/// Used when the on-disk cache is disabled, and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<BTreeMap<String, Vec<u8>>>,
  capacity: Option<usize>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reject writes of new keys once `capacity` entries are held.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Mutex::new(BTreeMap::new()),
      capacity: Some(capacity),
    }
  }
}

impl PersistentStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
    let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
    if let Some(capacity) = self.capacity {
      if !entries.contains_key(key) && entries.len() >= capacity {
        return Err(StoreError::QuotaExceeded { capacity });
      }
    }
    entries.insert(key.to_string(), value.to_vec());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
    entries.remove(key);
    Ok(())
  }

  fn count(&self) -> Result<usize, StoreError> {
    let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(entries.len())
  }

  fn key_at(&self, index: usize) -> Result<Option<String>, StoreError> {
    let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(entries.keys().nth(index).cloned())
  }
}

/// SQLite-based durable store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

/// Schema for the key/value table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
);
"#;

impl SqliteStore {
  /// Open (or create) the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open a private store that lives only as long as this value.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
    self.conn.lock().map_err(|_| StoreError::Poisoned)
  }
}

impl PersistentStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
    let conn = self.conn()?;
    let value = conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
    let conn = self.conn()?;
    conn.execute(
      "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
      params![key, value],
    )?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let conn = self.conn()?;
    conn.execute("DELETE FROM kv_store WHERE key = ?", params![key])?;
    Ok(())
  }

  fn count(&self) -> Result<usize, StoreError> {
    let conn = self.conn()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))?;
    Ok(count as usize)
  }

  fn key_at(&self, index: usize) -> Result<Option<String>, StoreError> {
    let conn = self.conn()?;
    let key = conn
      .query_row(
        "SELECT key FROM kv_store ORDER BY key LIMIT 1 OFFSET ?",
        params![index as i64],
        |row| row.get(0),
      )
      .optional()?;
    Ok(key)
  }

  fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
    let conn = self.conn()?;
    let mut stmt = conn.prepare(
      "SELECT key FROM kv_store WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
    )?;
    let keys = stmt
      .query_map(params![prefix], |row| row.get(0))?
      .collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
  }
}
