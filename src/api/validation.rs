//! Validation contract shared by the create and edit forms.
//!
//! This is a local fast path only. The server re-validates every request and
//! remains the authority (it may still answer with a validation error).

use std::fmt;

use super::types::WordInput;

pub const LITERAL_REQUIRED: &str = "Word literal is required";
pub const CATEGORY_REQUIRED: &str = "Category is required";

/// Input fields that can carry a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
  Literal,
  Category,
}

impl Field {
  pub fn label(self) -> &'static str {
    match self {
      Field::Literal => "Word",
      Field::Category => "Category",
    }
  }
}

/// Field-level validation errors, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
  errors: Vec<(Field, &'static str)>,
}

impl FieldErrors {
  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn get(&self, field: Field) -> Option<&'static str> {
    self
      .errors
      .iter()
      .find(|(f, _)| *f == field)
      .map(|(_, message)| *message)
  }

  pub fn clear(&mut self, field: Field) {
    self.errors.retain(|(f, _)| *f != field);
  }

  fn push(&mut self, field: Field, message: &'static str) {
    self.errors.push((field, message));
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let messages: Vec<&str> = self.errors.iter().map(|(_, m)| *m).collect();
    write!(f, "{}", messages.join(", "))
  }
}

impl WordInput {
  /// Check the input and return a normalized copy (surrounding whitespace trimmed).
  ///
  /// Whitespace-only values count as empty.
  pub fn validate(&self) -> Result<WordInput, FieldErrors> {
    let literal = self.literal.trim();
    let category = self.category.trim();

    let mut errors = FieldErrors::default();
    if literal.is_empty() {
      errors.push(Field::Literal, LITERAL_REQUIRED);
    }
    if category.is_empty() {
      errors.push(Field::Category, CATEGORY_REQUIRED);
    }

    if errors.is_empty() {
      Ok(WordInput::new(literal, category))
    } else {
      Err(errors)
    }
  }
}
