//! Generic query cache shared by every view.
//!
//! This module provides a domain-agnostic caching mechanism that:
//! - Keeps one entry per query key, holding an ordered collection
//! - Serves stale data while a background refresh runs
//! - Deduplicates concurrent fetches of the same key
//! - Persists snapshots so a restart (or a dead network) still has data

mod layer;
mod storage;
mod traits;

pub use layer::QueryCache;
pub use storage::{CacheStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheSnapshot, CacheSource, Cacheable, QueryKey};
