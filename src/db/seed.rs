//! Sample data for the sandbox database.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use super::{to_sql_time, Database};

/// Password every seeded account shares
pub const SEED_PASSWORD: &str = "password123";

/// Username of the account sandbox sessions act as
pub const SESSION_USERNAME: &str = "johndoe";

/// Rows written by [`Database::seed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
  pub users: usize,
  pub words: usize,
  pub otp_codes: usize,
}

struct SeedUser {
  username: &'static str,
  first_name: &'static str,
  last_name: &'static str,
  is_active: bool,
  theme: &'static str,
  notifications: bool,
  created_days_ago: i64,
  last_login_days_ago: i64,
}

const USERS: &[SeedUser] = &[
  SeedUser {
    username: "johndoe",
    first_name: "John",
    last_name: "Doe",
    is_active: true,
    theme: "dark",
    notifications: true,
    created_days_ago: 85,
    last_login_days_ago: 0,
  },
  SeedUser {
    username: "janesmith",
    first_name: "Jane",
    last_name: "Smith",
    is_active: true,
    theme: "light",
    notifications: false,
    created_days_ago: 70,
    last_login_days_ago: 1,
  },
  SeedUser {
    username: "bobjohnson",
    first_name: "Bob",
    last_name: "Johnson",
    is_active: false,
    theme: "dark",
    notifications: true,
    created_days_ago: 60,
    last_login_days_ago: 30,
  },
  SeedUser {
    username: "alicewilliams",
    first_name: "Alice",
    last_name: "Williams",
    is_active: true,
    theme: "auto",
    notifications: true,
    created_days_ago: 45,
    last_login_days_ago: 0,
  },
];

/// (owner, category, literal, translated)
const WORDS: &[(&str, &str, &str, &str)] = &[
  ("johndoe", "cloud", "aws", "أمازون ويب سيرفيسز"),
  ("johndoe", "cloud", "azure", "مايكروسوفت أزور"),
  ("johndoe", "cloud", "gcp", "منصة جوجل السحابية"),
  ("janesmith", "framework", "react", "ريأكت"),
  ("janesmith", "framework", "vue", "فيو"),
  ("janesmith", "framework", "svelte", "سفيلت"),
  ("bobjohnson", "tool", "docker", "دوكر"),
  ("bobjohnson", "tool", "kubernetes", "كوبرنتس"),
  ("bobjohnson", "tool", "terraform", "تيرافورم"),
];

/// (owner, minutes until expiry, active)
const OTP_CODES: &[(&str, i64, bool)] = &[
  ("johndoe", 10, true),
  ("janesmith", 15, true),
  ("johndoe", -5, false),
];

/// Hex-encoded SHA-256 of a password. Good enough for sample data only.
pub fn hash_password(password: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(password.as_bytes());
  hex::encode(hasher.finalize())
}

/// Random six digit code
pub fn generate_otp() -> String {
  let n = Uuid::new_v4().as_u128() % 900_000 + 100_000;
  n.to_string()
}

fn user_id(conn: &Connection, username: &str) -> rusqlite::Result<String> {
  conn.query_row(
    "SELECT id FROM users WHERE username = ?",
    params![username],
    |row| row.get(0),
  )
}

fn insert_all(conn: &Connection, now: DateTime<Utc>) -> rusqlite::Result<SeedSummary> {
  conn.execute_batch("DELETE FROM words; DELETE FROM otp_codes; DELETE FROM users;")?;

  let password_hash = hash_password(SEED_PASSWORD);
  for user in USERS {
    let created_at = now - Duration::days(user.created_days_ago);
    let settings = json!({ "notifications": user.notifications, "theme": user.theme });
    conn.execute(
      "INSERT INTO users
         (id, username, email, first_name, last_name, avatar_url, password_hash,
          is_active, settings, last_login_at, created_at, updated_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
      params![
        Uuid::new_v4().to_string(),
        user.username,
        format!(
          "{}.{}@example.com",
          user.first_name.to_lowercase(),
          user.last_name.to_lowercase()
        ),
        user.first_name,
        user.last_name,
        format!(
          "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
          user.first_name.to_lowercase()
        ),
        password_hash,
        user.is_active,
        settings.to_string(),
        to_sql_time(&(now - Duration::days(user.last_login_days_ago))),
        to_sql_time(&created_at),
        to_sql_time(&created_at),
      ],
    )?;
  }

  for (i, (owner, category, literal, translated)) in WORDS.iter().enumerate() {
    // Spread creation dates so the list has a visible order
    let created_at = now - Duration::days((WORDS.len() - i) as i64);
    conn.execute(
      "INSERT INTO words
         (id, literal, category, translated, language, user_id, created_at, updated_at)
       VALUES (?, ?, ?, ?, 'ar', ?, ?, ?)",
      params![
        Uuid::new_v4().to_string(),
        literal,
        category,
        translated,
        user_id(conn, owner)?,
        to_sql_time(&created_at),
        to_sql_time(&created_at),
      ],
    )?;
  }

  for (owner, expires_in, active) in OTP_CODES {
    conn.execute(
      "INSERT INTO otp_codes (id, code, user_id, is_active, expires_at, created_at)
       VALUES (?, ?, ?, ?, ?, ?)",
      params![
        Uuid::new_v4().to_string(),
        generate_otp(),
        user_id(conn, owner)?,
        active,
        to_sql_time(&(now + Duration::minutes(*expires_in))),
        to_sql_time(&now),
      ],
    )?;
  }

  Ok(SeedSummary {
    users: USERS.len(),
    words: WORDS.len(),
    otp_codes: OTP_CODES.len(),
  })
}

impl Database {
  /// Replace every row with the sample data set.
  pub fn seed(&self) -> Result<SeedSummary> {
    let mut conn = self.conn()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to start seed transaction: {}", e))?;
    let summary = insert_all(&tx, Utc::now()).map_err(|e| eyre!("Failed to seed database: {}", e))?;
    tx.commit()
      .map_err(|e| eyre!("Failed to commit seed data: {}", e))?;

    info!(
      users = summary.users,
      words = summary.words,
      otp_codes = summary.otp_codes,
      "seeded sandbox database"
    );
    Ok(summary)
  }

  /// Seed only when the database holds no accounts yet.
  pub fn seed_if_empty(&self) -> Result<Option<SeedSummary>> {
    let users: i64 = self
      .conn()?
      .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to count users: {}", e))?;
    if users > 0 {
      return Ok(None);
    }
    self.seed().map(Some)
  }
}
