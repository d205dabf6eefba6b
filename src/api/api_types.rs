//! Serde types for the words API wire format.
//!
//! Every endpoint wraps its payload in the same envelope. Domain types live in
//! `types.rs`; this module only knows about the transport shape.

use serde::{Deserialize, Serialize};

// ============================================================================
// Response envelope
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiStatus {
  Ok,
  Error,
}

/// `{ data, message, status }` wrapper returned by every endpoint.
///
/// `message` is a machine-readable code such as `WordCreateSuccess` or
/// `WordNotFound`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
  pub data: Option<T>,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub status: Option<ApiStatus>,
}

/// Message code the server uses when the target word is missing
pub const WORD_NOT_FOUND: &str = "WordNotFound";

// ============================================================================
// Error bodies
// ============================================================================

/// Best-effort decoding of an error body: only the message code matters.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: Option<String>,
}

impl ApiErrorBody {
  pub fn parse(body: &[u8]) -> Self {
    serde_json::from_slice(body).unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Word;

  #[test]
  fn test_envelope_with_list() {
    let body = r#"{
      "data": [{
        "id": "1", "literal": "aws", "category": "cloud",
        "translated": null, "language": null, "user_id": "u1",
        "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-01T00:00:00Z"
      }],
      "message": "WordGetSuccess",
      "status": "Ok"
    }"#;

    let envelope: ApiEnvelope<Vec<Word>> = serde_json::from_str(body).unwrap();
    assert_eq!(envelope.status, Some(ApiStatus::Ok));
    assert_eq!(envelope.data.unwrap()[0].id, "1");
  }

  #[test]
  fn test_envelope_null_data() {
    let envelope: ApiEnvelope<serde_json::Value> =
      serde_json::from_str(r#"{ "data": null }"#).unwrap();
    assert!(envelope.data.is_none());
    assert!(envelope.message.is_none());
  }

  #[test]
  fn test_error_body_tolerates_garbage() {
    assert_eq!(
      ApiErrorBody::parse(br#"{"data":null,"message":"WordNotFound","status":"Error"}"#).message,
      Some(WORD_NOT_FOUND.to_string())
    );
    assert!(ApiErrorBody::parse(b"<html>502</html>").message.is_none());
  }
}
