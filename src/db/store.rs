//! `WordsApi` implementation over the sandbox database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::seed::SESSION_USERNAME;
use super::{time_column, to_sql_time, Database};
use crate::api::{Account, ApiError, Word, WordInput, WordsApi};

const LITERAL_LEN: std::ops::RangeInclusive<usize> = 1..=255;
const CATEGORY_LEN: std::ops::RangeInclusive<usize> = 2..=50;

const WORD_COLUMNS: &str =
  "id, literal, category, translated, language, user_id, created_at, updated_at";

fn word_from_row(row: &Row<'_>) -> rusqlite::Result<Word> {
  Ok(Word {
    id: row.get(0)?,
    literal: row.get(1)?,
    category: row.get(2)?,
    translated: row.get(3)?,
    language: row.get(4)?,
    user_id: row.get(5)?,
    created_at: time_column(row, 6)?,
    updated_at: time_column(row, 7)?,
  })
}

fn storage_error(e: impl std::fmt::Display) -> ApiError {
  ApiError::server(500, format!("sandbox database error: {e}"))
}

/// Length limits the words endpoints enforce server-side
fn check_limits(input: &WordInput) -> Result<(), ApiError> {
  if !LITERAL_LEN.contains(&input.literal.chars().count()) {
    return Err(ApiError::validation("literal must be between 1 and 255 chars"));
  }
  if !CATEGORY_LEN.contains(&input.category.chars().count()) {
    return Err(ApiError::validation("category must be between 2 and 50 chars"));
  }
  Ok(())
}

fn load_word(conn: &Connection, id: &str) -> rusqlite::Result<Option<Word>> {
  conn
    .query_row(
      &format!("SELECT {WORD_COLUMNS} FROM words WHERE id = ?"),
      params![id],
      word_from_row,
    )
    .optional()
}

/// Words store acting on behalf of one account.
///
/// Every word is listed; new words are owned by the session account.
#[derive(Clone)]
pub struct LocalWordsStore {
  db: Arc<Database>,
  account_id: String,
}

impl LocalWordsStore {
  pub fn new(db: Arc<Database>, account_id: impl Into<String>) -> Self {
    Self {
      db,
      account_id: account_id.into(),
    }
  }

  /// Store acting as the seeded session account
  pub fn for_session(db: Arc<Database>) -> Result<Self> {
    let account = db
      .account_by_username(SESSION_USERNAME)?
      .ok_or_else(|| {
        eyre!(
          "Sandbox session account {} missing, start with --reset to restore it",
          SESSION_USERNAME
        )
      })?;
    Ok(Self::new(db, account.id))
  }

  pub fn account_id(&self) -> &str {
    &self.account_id
  }

  pub fn session_account(&self) -> Result<Option<Account>> {
    self.db.account(&self.account_id)
  }

  /// Sign the session account in with a freshly issued one-time code.
  pub fn sign_in(&self) -> Result<Account> {
    let account = self
      .session_account()?
      .ok_or_else(|| eyre!("Sandbox account {} no longer exists", self.account_id))?;
    if !account.is_active {
      return Err(eyre!("Sandbox account {} is deactivated", account.username));
    }

    let now = Utc::now();
    let otp = self.db.issue_otp(&account.id)?;
    if !self.db.consume_otp(&account.id, &otp.code, now)? {
      return Err(eyre!("One-time code for {} was rejected", account.username));
    }
    self.db.record_login(&account.id, now)?;

    info!(account = %account.username, "signed in");
    Ok(Account {
      last_login_at: Some(now),
      ..account
    })
  }
}

#[async_trait]
impl WordsApi for LocalWordsStore {
  async fn list_all(&self) -> Result<Vec<Word>, ApiError> {
    let conn = self.db.conn().map_err(storage_error)?;
    let mut stmt = conn
      .prepare(&format!(
        "SELECT {WORD_COLUMNS} FROM words ORDER BY created_at, id"
      ))
      .map_err(storage_error)?;
    let words = stmt
      .query_map([], word_from_row)
      .map_err(storage_error)?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(storage_error)?;
    debug!(count = words.len(), "listed sandbox words");
    Ok(words)
  }

  async fn create(&self, input: &WordInput) -> Result<Word, ApiError> {
    check_limits(input)?;
    let now = Utc::now();
    let word = Word {
      id: Uuid::new_v4().to_string(),
      literal: input.literal.clone(),
      category: input.category.clone(),
      translated: None,
      language: None,
      user_id: self.account_id.clone(),
      created_at: now,
      updated_at: now,
    };

    let conn = self.db.conn().map_err(storage_error)?;
    conn
      .execute(
        "INSERT INTO words (id, literal, category, user_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
          word.id,
          word.literal,
          word.category,
          word.user_id,
          to_sql_time(&word.created_at),
          to_sql_time(&word.updated_at)
        ],
      )
      .map_err(storage_error)?;
    Ok(word)
  }

  async fn update(&self, id: &str, input: &WordInput) -> Result<Word, ApiError> {
    check_limits(input)?;
    let conn = self.db.conn().map_err(storage_error)?;
    let changed = conn
      .execute(
        "UPDATE words SET literal = ?, category = ?, updated_at = ? WHERE id = ?",
        params![input.literal, input.category, to_sql_time(&Utc::now()), id],
      )
      .map_err(storage_error)?;
    if changed == 0 {
      return Err(ApiError::not_found(id));
    }
    load_word(&conn, id)
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found(id))
  }

  async fn delete(&self, id: &str) -> Result<(), ApiError> {
    let conn = self.db.conn().map_err(storage_error)?;
    let removed = conn
      .execute("DELETE FROM words WHERE id = ?", params![id])
      .map_err(storage_error)?;
    if removed == 0 {
      return Err(ApiError::not_found(id));
    }
    Ok(())
  }
}
