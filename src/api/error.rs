use thiserror::Error;

/// Errors surfaced by a words API backend.
///
/// Local form validation never produces these; see `FieldErrors`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// The server rejected the input.
  #[error("validation failed: {message}")]
  Validation { message: String },
  /// Transport failed before a response arrived.
  #[error("network error: {message}")]
  Network { message: String },
  /// Non-success response, or a body that could not be decoded.
  #[error("server error ({status}): {message}")]
  Server { status: u16, message: String },
  /// The target word does not exist on the server.
  #[error("word {id} not found")]
  NotFound { id: String },
}

impl ApiError {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation {
      message: message.into(),
    }
  }

  pub fn network(message: impl Into<String>) -> Self {
    Self::Network {
      message: message.into(),
    }
  }

  pub fn server(status: u16, message: impl Into<String>) -> Self {
    Self::Server {
      status,
      message: message.into(),
    }
  }

  pub fn not_found(id: impl Into<String>) -> Self {
    Self::NotFound { id: id.into() }
  }
}
