//! Core traits and types for the caching system.

use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for entities that can be cached.
///
/// Implementors provide a unique key so collections can be patched by id.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Unique identifier for this entity
  fn cache_key(&self) -> String;

  /// Entity type name for storage organization (e.g., "word")
  fn entity_type() -> &'static str;
}

/// Logical identifier of a cached query result.
pub trait QueryKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
  /// Stable, fixed-length key used by persistent storage
  fn cache_hash(&self) -> String;

  /// Human readable description, stored alongside persisted snapshots
  fn description(&self) -> String;
}

/// Indicates where the currently held data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Nothing has been loaded yet
  Empty,
  /// Last set by a successful fetch
  Network,
  /// Last set by a local patch after a confirmed mutation
  Local,
  /// Loaded from a persisted snapshot, a refresh is pending or has not run yet
  Persisted,
  /// The last fetch failed, serving what we already had
  Offline,
}

/// Point-in-time view of one cache entry.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<T> {
  /// `None` while the entry is absent (nothing fetched, nothing persisted)
  pub data: Option<Vec<T>>,
  /// Entry was invalidated or outlived its stale time
  pub stale: bool,
  /// A fetch for this key is in flight
  pub fetching: bool,
  /// Error message of the last failed fetch, cleared on success
  pub error: Option<String>,
  pub source: CacheSource,
  /// When the data was last confirmed by the server
  pub fetched_at: Option<DateTime<Utc>>,
  /// Bumped on every change to the entry
  pub version: u64,
}

impl<T> CacheSnapshot<T> {
  pub fn absent() -> Self {
    Self {
      data: None,
      stale: false,
      fetching: false,
      error: None,
      source: CacheSource::Empty,
      fetched_at: None,
      version: 0,
    }
  }
}
