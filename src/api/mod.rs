pub mod api_types;
pub mod cache;
pub mod client;
pub mod error;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod fixtures;

pub use client::{HttpWordsClient, WordsApi};
pub use error::ApiError;
pub use types::{Account, OtpCode, Word, WordInput};
