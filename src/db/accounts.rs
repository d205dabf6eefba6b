//! Sandbox accounts and their one-time sign-in codes.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

use super::seed::generate_otp;
use super::{optional_time_column, time_column, to_sql_time, Database};
use crate::api::{Account, OtpCode};

/// Lifetime of an issued OTP code
const OTP_TTL_MINUTES: i64 = 5;

const ACCOUNT_COLUMNS: &str = "id, username, email, first_name, last_name, avatar_url, \
   password_hash, is_active, settings, last_login_at, created_at, updated_at";

const OTP_COLUMNS: &str = "id, code, user_id, is_active, expires_at, created_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
  let settings: String = row.get(8)?;
  Ok(Account {
    id: row.get(0)?,
    username: row.get(1)?,
    email: row.get(2)?,
    first_name: row.get(3)?,
    last_name: row.get(4)?,
    avatar_url: row.get(5)?,
    password_hash: row.get(6)?,
    is_active: row.get(7)?,
    settings: serde_json::from_str(&settings).unwrap_or_default(),
    last_login_at: optional_time_column(row, 9)?,
    created_at: time_column(row, 10)?,
    updated_at: time_column(row, 11)?,
  })
}

fn otp_from_row(row: &Row<'_>) -> rusqlite::Result<OtpCode> {
  Ok(OtpCode {
    id: row.get(0)?,
    code: row.get(1)?,
    user_id: row.get(2)?,
    is_active: row.get(3)?,
    expires_at: time_column(row, 4)?,
    created_at: time_column(row, 5)?,
  })
}

impl Database {
  fn find_account(&self, column: &str, value: &str) -> Result<Option<Account>> {
    self
      .conn()?
      .query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE {column} = ?"),
        params![value],
        account_from_row,
      )
      .optional()
      .map_err(|e| eyre!("Failed to load account {}: {}", value, e))
  }

  pub fn account(&self, id: &str) -> Result<Option<Account>> {
    self.find_account("id", id)
  }

  pub fn account_by_username(&self, username: &str) -> Result<Option<Account>> {
    self.find_account("username", username)
  }

  /// Delete an account together with its words and OTP codes.
  /// Returns the number of words that went with it, or `None` when no such account exists.
  pub fn delete_account(&self, id: &str) -> Result<Option<usize>> {
    let conn = self.conn()?;
    let words: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM words WHERE user_id = ?",
        params![id],
        |row| row.get(0),
      )
      .map_err(|e| eyre!("Failed to count words of {}: {}", id, e))?;
    let removed = conn
      .execute("DELETE FROM users WHERE id = ?", params![id])
      .map_err(|e| eyre!("Failed to delete account {}: {}", id, e))?;
    if removed == 0 {
      return Ok(None);
    }
    info!(account = id, words, "deleted account");
    Ok(Some(usize::try_from(words).unwrap_or_default()))
  }

  /// Issue a fresh code for an account, valid for a few minutes.
  pub fn issue_otp(&self, user_id: &str) -> Result<OtpCode> {
    let now = Utc::now();
    let otp = OtpCode {
      id: Uuid::new_v4().to_string(),
      code: generate_otp(),
      user_id: user_id.to_string(),
      is_active: true,
      expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
      created_at: now,
    };
    self
      .conn()?
      .execute(
        &format!("INSERT INTO otp_codes ({OTP_COLUMNS}) VALUES (?, ?, ?, 1, ?, ?)"),
        params![
          otp.id,
          otp.code,
          otp.user_id,
          to_sql_time(&otp.expires_at),
          to_sql_time(&otp.created_at)
        ],
      )
      .map_err(|e| eyre!("Failed to issue OTP code: {}", e))?;
    Ok(otp)
  }

  /// Consume a code. Succeeds once per code, and only while it is active and unexpired.
  pub fn consume_otp(&self, user_id: &str, code: &str, now: DateTime<Utc>) -> Result<bool> {
    let conn = self.conn()?;
    let candidates = {
      let mut stmt = conn
        .prepare(&format!(
          "SELECT {OTP_COLUMNS} FROM otp_codes WHERE user_id = ? AND code = ?"
        ))
        .map_err(|e| eyre!("Failed to query OTP codes: {}", e))?;
      let rows = stmt
        .query_map(params![user_id, code], otp_from_row)
        .map_err(|e| eyre!("Failed to query OTP codes: {}", e))?;
      rows
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| eyre!("Failed to read OTP codes: {}", e))?
    };

    let Some(otp) = candidates.into_iter().find(|otp| otp.is_usable(now)) else {
      return Ok(false);
    };

    conn
      .execute(
        "UPDATE otp_codes SET is_active = 0 WHERE id = ?",
        params![otp.id],
      )
      .map_err(|e| eyre!("Failed to consume OTP code: {}", e))?;
    Ok(true)
  }

  pub fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
    self
      .conn()?
      .execute(
        "UPDATE users SET last_login_at = ? WHERE id = ?",
        params![to_sql_time(&at), user_id],
      )
      .map_err(|e| eyre!("Failed to record login for {}: {}", user_id, e))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::seed::SESSION_USERNAME;

  fn seeded() -> Database {
    let db = Database::in_memory().unwrap();
    db.seed().unwrap();
    db
  }

  #[test]
  fn test_account_lookup() {
    let db = seeded();
    let account = db.account_by_username(SESSION_USERNAME).unwrap().unwrap();
    assert_eq!(account.display_name(), "John Doe");
    assert_eq!(account.settings["theme"], "dark");
    assert_eq!(db.account(&account.id).unwrap(), Some(account));
    assert!(db.account_by_username("nobody").unwrap().is_none());
  }

  #[test]
  fn test_delete_account_cascades() {
    let db = seeded();
    let account = db.account_by_username(SESSION_USERNAME).unwrap().unwrap();

    assert_eq!(db.delete_account(&account.id).unwrap(), Some(3));
    assert_eq!(db.delete_account(&account.id).unwrap(), None);
    assert_eq!(db.word_count().unwrap(), 6);

    let orphans: i64 = db
      .conn()
      .unwrap()
      .query_row(
        "SELECT COUNT(*) FROM otp_codes WHERE user_id = ?",
        params![account.id],
        |row| row.get(0),
      )
      .unwrap();
    assert_eq!(orphans, 0);
  }

  #[test]
  fn test_otp_consumed_once() {
    let db = seeded();
    let user = db.account_by_username(SESSION_USERNAME).unwrap().unwrap().id;
    let otp = db.issue_otp(&user).unwrap();
    let now = Utc::now();
    assert!(otp.is_usable(now));

    assert!(!db.consume_otp(&user, "000000x", now).unwrap());
    assert!(db.consume_otp(&user, &otp.code, now).unwrap());
    assert!(!db.consume_otp(&user, &otp.code, now).unwrap());
  }

  #[test]
  fn test_expired_otp_is_rejected() {
    let db = seeded();
    let user = db.account_by_username(SESSION_USERNAME).unwrap().unwrap().id;
    let otp = db.issue_otp(&user).unwrap();
    let later = Utc::now() + Duration::minutes(OTP_TTL_MINUTES + 1);
    assert!(!db.consume_otp(&user, &otp.code, later).unwrap());
  }

  #[test]
  fn test_record_login() {
    let db = seeded();
    let user = db.account_by_username(SESSION_USERNAME).unwrap().unwrap().id;
    let at = Utc::now();
    db.record_login(&user, at).unwrap();
    let seen = db.account(&user).unwrap().unwrap().last_login_at.unwrap();
    assert_eq!(seen.timestamp(), at.timestamp());
  }
}
