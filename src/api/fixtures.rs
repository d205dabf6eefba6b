//! Shared builders for tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::client::WordsApi;
use super::error::ApiError;
use super::types::{Word, WordInput};

pub fn word(id: &str, literal: &str, category: &str) -> Word {
  let created = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
  Word {
    id: id.to_string(),
    literal: literal.to_string(),
    category: category.to_string(),
    translated: None,
    language: None,
    user_id: "u1".to_string(),
    created_at: created,
    updated_at: created,
  }
}

/// Backend whose request tasks die before producing a result
pub struct PanickingApi;

#[async_trait]
impl WordsApi for PanickingApi {
  async fn list_all(&self) -> Result<Vec<Word>, ApiError> {
    panic!("transport task died")
  }

  async fn create(&self, _input: &WordInput) -> Result<Word, ApiError> {
    panic!("transport task died")
  }

  async fn update(&self, _id: &str, _input: &WordInput) -> Result<Word, ApiError> {
    panic!("transport task died")
  }

  async fn delete(&self, _id: &str) -> Result<(), ApiError> {
    panic!("transport task died")
  }
}
