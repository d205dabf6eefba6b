use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vocabulary entry as returned by the words API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
  pub id: String,
  pub literal: String,
  pub category: String,
  #[serde(default)]
  pub translated: Option<String>,
  #[serde(default)]
  pub language: Option<String>,
  pub user_id: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Word {
  /// Case-insensitive match against literal and category, used by the list filter
  pub fn matches(&self, needle: &str) -> bool {
    if needle.is_empty() {
      return true;
    }
    let needle = needle.to_lowercase();
    self.literal.to_lowercase().contains(&needle) || self.category.to_lowercase().contains(&needle)
  }
}

/// Body of create and update requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordInput {
  pub literal: String,
  pub category: String,
}

impl WordInput {
  pub fn new(literal: impl Into<String>, category: impl Into<String>) -> Self {
    Self {
      literal: literal.into(),
      category: category.into(),
    }
  }

  /// Pre-populate an edit form from the word's current values
  pub fn from_word(word: &Word) -> Self {
    Self::new(word.literal.clone(), word.category.clone())
  }
}

/// Account that owns words and OTP codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
  pub id: String,
  pub username: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub avatar_url: Option<String>,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub is_active: bool,
  #[serde(default)]
  pub settings: serde_json::Value,
  pub last_login_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Account {
  pub fn display_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

/// One-time authentication code issued to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpCode {
  pub id: String,
  pub code: String,
  pub user_id: String,
  pub is_active: bool,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

impl OtpCode {
  /// A code can be consumed only while active and before expiry
  pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
    self.is_active && now < self.expires_at
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fixtures::word;
  use chrono::Duration;

  #[test]
  fn test_word_deserializes_nullable_fields() {
    let json = r#"{
      "id": "1",
      "literal": "aws",
      "category": "cloud",
      "translated": null,
      "language": "ar",
      "user_id": "u1",
      "created_at": "2025-01-02T03:04:05Z",
      "updated_at": "2025-01-02T03:04:05Z"
    }"#;

    let word: Word = serde_json::from_str(json).unwrap();
    assert_eq!(word.literal, "aws");
    assert_eq!(word.translated, None);
    assert_eq!(word.language.as_deref(), Some("ar"));
  }

  #[test]
  fn test_word_matches_literal_or_category() {
    let w = word("1", "Docker", "tool");
    assert!(w.matches(""));
    assert!(w.matches("dock"));
    assert!(w.matches("TOO"));
    assert!(!w.matches("cloud"));
  }

  #[test]
  fn test_input_from_word() {
    let w = word("1", "aws", "cloud");
    assert_eq!(WordInput::from_word(&w), WordInput::new("aws", "cloud"));
  }

  #[test]
  fn test_otp_usable_window() {
    let now = Utc::now();
    let mut otp = OtpCode {
      id: "o1".to_string(),
      code: "123456".to_string(),
      user_id: "u1".to_string(),
      is_active: true,
      expires_at: now + Duration::minutes(10),
      created_at: now,
    };
    assert!(otp.is_usable(now));
    assert!(!otp.is_usable(now + Duration::minutes(11)));
    otp.is_active = false;
    assert!(!otp.is_usable(now));
  }
}
