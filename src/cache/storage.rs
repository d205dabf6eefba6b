//! Snapshot storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A persisted query result.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
  /// JSON-encoded entities in order
  pub data: Vec<u8>,
  /// When the snapshot was written
  pub cached_at: DateTime<Utc>,
  pub result_count: usize,
}

/// Trait for snapshot storage backends.
///
/// Entries are opaque JSON blobs so the trait stays object safe; the cache
/// handles (de)serialization.
pub trait CacheStorage: Send + Sync {
  /// Store (replace) the snapshot for a query.
  fn store(
    &self,
    query_hash: &str,
    description: &str,
    entity_type: &str,
    data: &[u8],
    result_count: usize,
  ) -> Result<()>;

  /// Load the snapshot for a query, if one was stored for this entity type.
  fn load(&self, query_hash: &str, entity_type: &str) -> Result<Option<StoredSnapshot>>;

  /// Drop a stored snapshot.
  fn remove(&self, query_hash: &str) -> Result<()>;
}

/// Storage implementation that doesn't persist anything.
/// Used when persistence is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn store(&self, _: &str, _: &str, _: &str, _: &[u8], _: usize) -> Result<()> {
    Ok(()) // Discard
  }

  fn load(&self, _query_hash: &str, _entity_type: &str) -> Result<Option<StoredSnapshot>> {
    Ok(None) // Always miss
  }

  fn remove(&self, _query_hash: &str) -> Result<()> {
    Ok(())
  }
}

/// SQLite-based snapshot storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the snapshot database at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the snapshot database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// In-memory storage, lost when dropped.
  #[cfg(test)]
  pub fn in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("lexis").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS query_cache (
    query_hash TEXT PRIMARY KEY,
    query_description TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    data BLOB NOT NULL,
    result_count INTEGER NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl CacheStorage for SqliteStorage {
  fn store(
    &self,
    query_hash: &str,
    description: &str,
    entity_type: &str,
    data: &[u8],
    result_count: usize,
  ) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO query_cache
           (query_hash, query_description, entity_type, data, result_count, cached_at)
         VALUES (?, ?, ?, ?, ?, datetime('now'))",
        params![query_hash, description, entity_type, data, result_count as i64],
      )
      .map_err(|e| eyre!("Failed to store query snapshot: {}", e))?;

    Ok(())
  }

  fn load(&self, query_hash: &str, entity_type: &str) -> Result<Option<StoredSnapshot>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(Vec<u8>, i64, String)> = conn
      .query_row(
        "SELECT data, result_count, cached_at FROM query_cache
         WHERE query_hash = ? AND entity_type = ?",
        params![query_hash, entity_type],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to load query snapshot: {}", e))?;

    match row {
      Some((data, result_count, cached_at)) => Ok(Some(StoredSnapshot {
        data,
        cached_at: parse_datetime(&cached_at)?,
        result_count: usize::try_from(result_count).unwrap_or_default(),
      })),
      None => Ok(None),
    }
  }

  fn remove(&self, query_hash: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM query_cache WHERE query_hash = ?",
        params![query_hash],
      )
      .map_err(|e| eyre!("Failed to remove query snapshot: {}", e))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_store_and_load_roundtrip() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage
      .store("abc", "all words", "word", b"[1,2]", 2)
      .unwrap();

    let snapshot = storage.load("abc", "word").unwrap().unwrap();
    assert_eq!(snapshot.data, b"[1,2]");
    assert_eq!(snapshot.result_count, 2);
  }

  #[test]
  fn test_load_checks_entity_type() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.store("abc", "all words", "word", b"[]", 0).unwrap();
    assert!(storage.load("abc", "account").unwrap().is_none());
  }

  #[test]
  fn test_store_replaces_and_remove_deletes() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.store("abc", "all words", "word", b"[1]", 1).unwrap();
    storage.store("abc", "all words", "word", b"[]", 0).unwrap();
    assert_eq!(storage.load("abc", "word").unwrap().unwrap().result_count, 0);

    storage.remove("abc").unwrap();
    assert!(storage.load("abc", "word").unwrap().is_none());
  }

  #[test]
  fn test_parse_sqlite_datetime() {
    let dt = parse_datetime("2025-03-14 09:30:00").unwrap();
    assert_eq!(dt.to_rfc3339(), "2025-03-14T09:30:00+00:00");
  }
}
