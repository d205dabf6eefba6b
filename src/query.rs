//! View-side handles for cached queries and one-shot mutations.
//!
//! Inspired by TanStack Query: a `Query<K, T>` reads one key of a shared
//! `QueryCache`, fetching it when absent or stale, and a `Mutation<T, E>`
//! runs a single write request in the background.
//!
//! # Example
//!
//! ```ignore
//! let api = words_api.clone();
//! let mut query = Query::new(cache.clone(), WordsQueryKey::All, move || {
//!     let api = api.clone();
//!     async move { api.list_all().await }
//! });
//!
//! // In event loop tick
//! if query.poll() {
//!     // Cache entry changed, trigger re-render
//! }
//!
//! // In render
//! if query.is_loading() {
//!     render_skeleton();
//! } else if let Some(words) = query.data() {
//!     render_table(words);
//! }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{oneshot, watch};

use crate::cache::{CacheSnapshot, CacheSource, Cacheable, QueryCache, QueryKey};

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<T>, String>> + Send + Sync>;

/// Subscription to one key of a `QueryCache`.
///
/// Query<K, T> encapsulates:
/// - The fetching logic (via a closure)
/// - The last snapshot read from the cache
/// - Change notifications, polled on tick
pub struct Query<K, T> {
  cache: QueryCache<K, T>,
  key: K,
  fetcher: FetcherFn<T>,
  changes: watch::Receiver<u64>,
  snapshot: CacheSnapshot<T>,
}

impl<K: QueryKey, T: Cacheable> Query<K, T> {
  /// Create a query for `key` and read it right away.
  ///
  /// The fetcher is only called when the cache decides a fetch is needed;
  /// concurrent queries for the same key share one request.
  pub fn new<F, Fut, E>(cache: QueryCache<K, T>, key: K, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    E: Display + Send + 'static,
  {
    let fetcher: FetcherFn<T> = Arc::new(move || {
      let request = fetcher();
      async move { request.await.map_err(|e| e.to_string()) }.boxed()
    });
    let changes = cache.subscribe(&key);
    let mut query = Self {
      cache,
      key,
      fetcher,
      changes,
      snapshot: CacheSnapshot::absent(),
    };
    query.read();
    query
  }

  fn read(&mut self) {
    let fetcher = Arc::clone(&self.fetcher);
    self.snapshot = self.cache.read(&self.key, move || fetcher());
    // Our own read may have started a fetch; that notification is already reflected
    self.changes.borrow_and_update();
  }

  /// Pick up cache changes. Returns `true` if the snapshot changed.
  ///
  /// Call this in your event loop tick handler. Data that outlived the
  /// cache's stale time is refreshed in the background from here too.
  pub fn poll(&mut self) -> bool {
    let changed = self.changes.has_changed().unwrap_or(false);
    if changed || self.is_expired() {
      let before = self.snapshot.version;
      self.read();
      return changed || self.snapshot.version != before;
    }
    false
  }

  fn is_expired(&self) -> bool {
    if self.snapshot.stale || self.snapshot.fetching || self.snapshot.error.is_some() {
      return false;
    }
    self
      .snapshot
      .fetched_at
      .is_some_and(|at| Utc::now() - at > self.cache.stale_time())
  }

  /// Invalidate the key and start a background refresh.
  pub fn refetch(&mut self) {
    let fetcher = Arc::clone(&self.fetcher);
    self.snapshot = self.cache.refetch(&self.key, move || fetcher());
    self.changes.borrow_and_update();
  }

  /// Held data, possibly stale. `None` until the first fetch (or snapshot) lands.
  pub fn data(&self) -> Option<&[T]> {
    self.snapshot.data.as_deref()
  }

  /// Nothing to show yet and a fetch is running. A retry after a failed
  /// first fetch counts as loading again.
  pub fn is_loading(&self) -> bool {
    self.snapshot.data.is_none() && (self.snapshot.error.is_none() || self.snapshot.fetching)
  }

  /// A fetch is in flight, with or without data on screen.
  pub fn is_fetching(&self) -> bool {
    self.snapshot.fetching
  }

  pub fn is_stale(&self) -> bool {
    self.snapshot.stale
  }

  /// Error of the last failed fetch.
  pub fn error(&self) -> Option<&str> {
    self.snapshot.error.as_deref()
  }

  pub fn source(&self) -> CacheSource {
    self.snapshot.source
  }
}

impl<K: std::fmt::Debug, T> std::fmt::Debug for Query<K, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("version", &self.snapshot.version)
      .field("stale", &self.snapshot.stale)
      .field("fetching", &self.snapshot.fetching)
      .finish_non_exhaustive()
  }
}

/// Why a mutation settled without the request's own result
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MutationError<E> {
  #[error("{0}")]
  Failed(E),
  /// The request task ended (panicked or was cancelled) before sending
  #[error("request task ended without a result")]
  Aborted,
}

/// A single write request running in the background.
///
/// The request runs on its own task. Dropping the mutation (or calling
/// `reset`) discards its result but does not abort the request.
pub struct Mutation<T, E> {
  receiver: Option<oneshot::Receiver<Result<T, E>>>,
}

impl<T, E> Default for Mutation<T, E> {
  fn default() -> Self {
    Self { receiver: None }
  }
}

impl<T: Send + 'static, E: Send + 'static> Mutation<T, E> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start the request. Any result still pending from an earlier start is discarded.
  pub fn start<Fut>(&mut self, request: Fut)
  where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    tokio::spawn(async move {
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(request.await);
    });
  }

  /// Take the outcome once the request has settled. A request whose task
  /// died settles as [`MutationError::Aborted`].
  pub fn poll(&mut self) -> Option<Result<T, MutationError<E>>> {
    let receiver = self.receiver.as_mut()?;
    let outcome = match receiver.try_recv() {
      Ok(result) => result.map_err(MutationError::Failed),
      Err(oneshot::error::TryRecvError::Empty) => return None,
      Err(oneshot::error::TryRecvError::Closed) => Err(MutationError::Aborted),
    };
    self.receiver = None;
    Some(outcome)
  }

  /// Forget the pending request, if any.
  pub fn reset(&mut self) {
    self.receiver = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::NoopStorage;
  use serde::{Deserialize, Serialize};
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Num(u32);

  impl Cacheable for Num {
    fn cache_key(&self) -> String {
      self.0.to_string()
    }

    fn entity_type() -> &'static str {
      "num"
    }
  }

  #[derive(Debug, Clone, PartialEq, Eq, Hash)]
  struct Key;

  impl QueryKey for Key {
    fn cache_hash(&self) -> String {
      "nums".to_string()
    }

    fn description(&self) -> String {
      "nums".to_string()
    }
  }

  fn cache() -> QueryCache<Key, Num> {
    QueryCache::new(Arc::new(NoopStorage))
  }

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(cache(), Key, || async {
      Ok::<_, String>(vec![Num(1), Num(2), Num(3)])
    });

    assert!(query.is_loading());
    assert!(query.is_fetching());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(!query.is_loading());
    assert_eq!(query.data(), Some(&[Num(1), Num(2), Num(3)][..]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query = Query::new(cache(), Key, || async {
      Err::<Vec<Num>, _>("Something went wrong")
    });

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(!query.is_loading());
    assert!(query.data().is_none());
    assert_eq!(query.error(), Some("Something went wrong"));
  }

  #[tokio::test]
  async fn test_retry_after_error_is_loading() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = Query::new(cache(), Key, {
      let calls = Arc::clone(&calls);
      move || {
        let first = calls.fetch_add(1, Ordering::SeqCst) == 0;
        async move {
          if first {
            Err("offline".to_string())
          } else {
            Ok(vec![Num(1)])
          }
        }
      }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(!query.is_loading());
    assert_eq!(query.error(), Some("offline"));

    query.refetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(!query.is_loading());
    assert_eq!(query.data(), Some(&[Num(1)][..]));
  }

  #[tokio::test]
  async fn test_queries_share_cache_entry() {
    let counter = Arc::new(AtomicU32::new(0));
    let shared = cache();
    let fetcher = {
      let counter = Arc::clone(&counter);
      move || {
        let counter = Arc::clone(&counter);
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(20)).await;
          Ok::<_, String>(vec![Num(7)])
        }
      }
    };

    let mut a = Query::new(shared.clone(), Key, fetcher.clone());
    let mut b = Query::new(shared.clone(), Key, fetcher);
    tokio::time::sleep(Duration::from_millis(40)).await;

    a.poll();
    b.poll();
    assert_eq!(a.data(), b.data());
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // A write through the cache reaches both subscribers
    shared.write(&Key, |_| Some(vec![Num(8)]));
    assert!(a.poll());
    assert!(b.poll());
    assert_eq!(b.data(), Some(&[Num(8)][..]));
  }

  #[tokio::test]
  async fn test_invalidate_refreshes_on_poll() {
    let counter = Arc::new(AtomicU32::new(0));
    let shared = cache();
    let mut query = Query::new(shared.clone(), Key, {
      let counter = Arc::clone(&counter);
      move || {
        let counter = Arc::clone(&counter);
        async move { Ok::<_, String>(vec![Num(counter.fetch_add(1, Ordering::SeqCst))]) }
      }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&[Num(0)][..]));

    shared.invalidate(&Key);
    assert!(query.poll());
    assert!(query.is_stale());
    assert_eq!(query.data(), Some(&[Num(0)][..]));

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(!query.is_stale());
    assert_eq!(query.data(), Some(&[Num(1)][..]));
  }

  #[tokio::test]
  async fn test_mutation_delivers_result_once() {
    let mut mutation: Mutation<u32, String> = Mutation::new();
    assert_eq!(mutation.poll(), None);

    mutation.start(async { Ok(42) });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(mutation.poll(), Some(Ok(42)));
    assert_eq!(mutation.poll(), None);
  }

  #[tokio::test]
  async fn test_mutation_failure_is_wrapped() {
    let mut mutation: Mutation<u32, String> = Mutation::new();
    mutation.start(async { Err("conflict".to_string()) });

    tokio::time::sleep(Duration::from_millis(10)).await;
    let err = mutation.poll().unwrap().unwrap_err();
    assert_eq!(err, MutationError::Failed("conflict".to_string()));
    assert_eq!(err.to_string(), "conflict");
  }

  #[tokio::test]
  async fn test_mutation_settles_when_task_panics() {
    async fn exploding() -> Result<u32, String> {
      panic!("request blew up")
    }

    let mut mutation: Mutation<u32, String> = Mutation::new();
    mutation.start(exploding());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(mutation.poll(), Some(Err(MutationError::Aborted)));
    assert_eq!(mutation.poll(), None);
  }

  #[tokio::test]
  async fn test_mutation_reset_discards_result() {
    let mut mutation: Mutation<u32, String> = Mutation::new();
    mutation.start(async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Err("late".to_string())
    });
    mutation.reset();

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(mutation.poll(), None);
  }
}
