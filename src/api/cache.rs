//! Caching implementations for words.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::client::WordsApi;
use super::types::Word;
use crate::cache::{Cacheable, QueryCache, QueryKey};
use crate::query::Query;

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Word {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn entity_type() -> &'static str {
    "word"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Query keys for the words collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WordsQueryKey {
  /// Every word visible to the session, in server order
  All,
}

impl QueryKey for WordsQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::All => "words:all",
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::All => "all words".to_string(),
    }
  }
}

/// The process-wide words cache
pub type WordsCache = QueryCache<WordsQueryKey, Word>;

/// Subscribe to the full words list, fetching it through `api` when needed.
pub fn all_words(cache: &WordsCache, api: Arc<dyn WordsApi>) -> Query<WordsQueryKey, Word> {
  Query::new(cache.clone(), WordsQueryKey::All, move || {
    let api = Arc::clone(&api);
    async move { api.list_all().await }
  })
}
