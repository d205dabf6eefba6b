//! Local SQLite backend used by `--sandbox`.

mod accounts;
pub mod schema;
mod seed;
mod store;

pub use store::LocalWordsStore;

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::types::Type;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Database connection wrapper for the sandbox
pub struct Database {
  conn: Mutex<Connection>,
}

impl Database {
  /// Open or create the database at the default location
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the database at `path`
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Fresh database living only as long as this value
  #[cfg(test)]
  pub fn in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    // Cascades only fire with enforcement switched on, per connection
    conn
      .pragma_update(None, "foreign_keys", true)
      .map_err(|e| eyre!("Failed to enable foreign keys: {}", e))?;

    let db = Self {
      conn: Mutex::new(conn),
    };
    db.run_migrations()?;
    Ok(db)
  }

  /// Get the default database path
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("lexis").join("sandbox.db"))
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    self
      .conn()?
      .execute_batch(schema::SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(())
  }

  /// Lock the connection
  pub fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Number of rows in the words table
  pub fn word_count(&self) -> Result<usize> {
    let count: i64 = self
      .conn()?
      .query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to count words: {}", e))?;
    Ok(usize::try_from(count).unwrap_or_default())
  }
}

fn to_sql_time(at: &DateTime<Utc>) -> String {
  at.to_rfc3339()
}

/// Read an RFC 3339 TEXT column.
fn time_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
  let raw: String = row.get(idx)?;
  DateTime::parse_from_rfc3339(&raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_time_column(
  row: &rusqlite::Row<'_>,
  idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
  let raw: Option<String> = row.get(idx)?;
  raw
    .map(|raw| {
      DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_migrations_are_idempotent() {
    let db = Database::in_memory().unwrap();
    db.run_migrations().unwrap();
    assert_eq!(db.word_count().unwrap(), 0);
  }

  #[test]
  fn test_foreign_keys_enforced() {
    let db = Database::in_memory().unwrap();
    let result = db.conn().unwrap().execute(
      "INSERT INTO words (id, literal, category, user_id, created_at, updated_at)
       VALUES ('w1', 'aws', 'cloud', 'nobody', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
      [],
    );
    assert!(result.is_err());
  }
}
