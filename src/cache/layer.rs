//! Process-wide keyed query cache with stale-while-revalidate reads.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::traits::{CacheSnapshot, CacheSource, Cacheable, QueryKey};

type FetchResult<T> = Result<Vec<T>, String>;

/// Pending fetch shared by every caller that asked while it was in flight
pub type SharedFetch<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

struct Entry<T> {
  data: Option<Vec<T>>,
  stale: bool,
  error: Option<String>,
  source: CacheSource,
  fetched_at: Option<DateTime<Utc>>,
  version: u64,
  /// Bumped by `invalidate`; a fetch that started before the bump leaves the entry stale
  invalidations: u64,
  in_flight: Option<SharedFetch<T>>,
  notify: watch::Sender<u64>,
}

impl<T: Cacheable> Entry<T> {
  fn new() -> Self {
    let (notify, _) = watch::channel(0);
    Self {
      data: None,
      stale: false,
      error: None,
      source: CacheSource::Empty,
      fetched_at: None,
      version: 0,
      invalidations: 0,
      in_flight: None,
      notify,
    }
  }

  fn bump(&mut self) {
    self.version += 1;
    self.notify.send_replace(self.version);
  }

  fn expired(&self, now: DateTime<Utc>, stale_time: Duration) -> bool {
    match self.fetched_at {
      Some(at) => now - at > stale_time,
      None => self.data.is_some(),
    }
  }

  /// A read starts a fetch when nothing is held yet, or the held data is stale.
  /// Failed fetches are never retried implicitly.
  fn needs_fetch(&self, now: DateTime<Utc>, stale_time: Duration) -> bool {
    if self.in_flight.is_some() {
      return false;
    }
    if self.stale {
      return true;
    }
    self.error.is_none() && (self.data.is_none() || self.expired(now, stale_time))
  }

  fn snapshot(&self) -> CacheSnapshot<T> {
    CacheSnapshot {
      data: self.data.clone(),
      stale: self.stale,
      fetching: self.in_flight.is_some(),
      error: self.error.clone(),
      source: self.source,
      fetched_at: self.fetched_at,
      version: self.version,
    }
  }
}

struct CacheInner<K, T> {
  entries: Mutex<HashMap<K, Entry<T>>>,
  storage: Arc<dyn CacheStorage>,
}

/// Keyed store of query results shared by every view in the process.
///
/// Handles are cheap to clone and all point at the same entries. Writes are
/// applied immediately and in call order (last write wins); no lock is held
/// across an await.
pub struct QueryCache<K, T> {
  inner: Arc<CacheInner<K, T>>,
  /// How long before fetched data is considered stale
  stale_time: Duration,
}

impl<K, T> Clone for QueryCache<K, T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      stale_time: self.stale_time,
    }
  }
}

impl<K: QueryKey, T: Cacheable> QueryCache<K, T> {
  /// Create a new cache persisting snapshots to the given storage backend.
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      inner: Arc::new(CacheInner {
        entries: Mutex::new(HashMap::new()),
        storage,
      }),
      stale_time: Duration::minutes(5),
    }
  }

  /// Set the stale time for fetched data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn stale_time(&self) -> Duration {
    self.stale_time
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<T>>> {
    self
      .inner
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  /// Get or create the entry for `key`, hydrating it from storage on creation.
  fn entry<'a>(&self, entries: &'a mut HashMap<K, Entry<T>>, key: &K) -> &'a mut Entry<T> {
    entries
      .entry(key.clone())
      .or_insert_with(|| self.hydrate(key))
  }

  fn hydrate(&self, key: &K) -> Entry<T> {
    let mut entry = Entry::new();
    match self.inner.storage.load(&key.cache_hash(), T::entity_type()) {
      Ok(Some(stored)) => match serde_json::from_slice::<Vec<T>>(&stored.data) {
        Ok(data) => {
          debug!(key = ?key, count = data.len(), "hydrated cache entry from snapshot");
          entry.data = Some(data);
          entry.stale = true;
          entry.source = CacheSource::Persisted;
          entry.fetched_at = Some(stored.cached_at);
        }
        Err(e) => warn!(key = ?key, error = %e, "discarding unreadable cache snapshot"),
      },
      Ok(None) => {}
      Err(e) => warn!(key = ?key, error = %e, "failed to load cache snapshot"),
    }
    entry
  }

  fn persist(&self, key: &K, data: &[T]) {
    let bytes = match serde_json::to_vec(data) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!(key = ?key, error = %e, "failed to serialize cache snapshot");
        return;
      }
    };
    if let Err(e) = self.inner.storage.store(
      &key.cache_hash(),
      &key.description(),
      T::entity_type(),
      &bytes,
      data.len(),
    ) {
      warn!(key = ?key, error = %e, "failed to persist cache snapshot");
    }
  }

  /// Subscribe to change notifications for `key`.
  ///
  /// The receiver starts with the current version marked as seen.
  pub fn subscribe(&self, key: &K) -> watch::Receiver<u64> {
    let mut entries = self.lock();
    self.entry(&mut entries, key).notify.subscribe()
  }

  /// Current state of `key` without triggering a fetch.
  pub fn snapshot(&self, key: &K) -> CacheSnapshot<T> {
    self
      .lock()
      .get(key)
      .map(Entry::snapshot)
      .unwrap_or_else(CacheSnapshot::absent)
  }

  /// Read `key`, starting a background fetch if the entry is absent or stale.
  ///
  /// Stale data stays in the returned snapshot while the refresh runs.
  pub fn read<F, Fut, E>(&self, key: &K, fetcher: F) -> CacheSnapshot<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    E: Display + Send + 'static,
  {
    let should_fetch = {
      let mut entries = self.lock();
      let entry = self.entry(&mut entries, key);
      let now = Utc::now();
      let should_fetch = entry.needs_fetch(now, self.stale_time);
      if should_fetch && entry.data.is_some() && !entry.stale {
        // Outlived its stale time
        entry.stale = true;
      }
      should_fetch
    };

    if should_fetch {
      // Runs on its own task; the handle is only needed by callers that await it.
      drop(self.fetch(key, fetcher));
    }

    self.snapshot(key)
  }

  /// Fetch `key`, or join the fetch already in flight for it.
  ///
  /// The fetch runs on a spawned task, so it completes and updates the
  /// cache even if every caller drops the returned future.
  pub fn fetch<F, Fut, E>(&self, key: &K, fetcher: F) -> SharedFetch<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    E: Display + Send + 'static,
  {
    let mut entries = self.lock();
    let entry = self.entry(&mut entries, key);
    if let Some(pending) = &entry.in_flight {
      return pending.clone();
    }

    debug!(key = ?key, "starting fetch");
    let generation = entry.invalidations;
    let request = fetcher();
    let cache = self.clone();
    let key = key.clone();
    let shared = async move {
      let result = request.await.map_err(|e| e.to_string());
      cache.complete_fetch(&key, generation, &result);
      result
    }
    .boxed()
    .shared();

    entry.in_flight = Some(shared.clone());
    entry.bump();
    tokio::spawn(shared.clone());
    shared
  }

  fn complete_fetch(&self, key: &K, generation: u64, result: &FetchResult<T>) {
    let mut entries = self.lock();
    let entry = self.entry(&mut entries, key);
    entry.in_flight = None;

    match result {
      Ok(data) => {
        debug!(key = ?key, count = data.len(), "fetch completed");
        entry.data = Some(data.clone());
        entry.error = None;
        entry.source = CacheSource::Network;
        entry.fetched_at = Some(Utc::now());
        // Invalidated while we were fetching: the result may predate the change
        entry.stale = entry.invalidations != generation;
        self.persist(key, data);
      }
      Err(message) => {
        warn!(key = ?key, error = %message, "fetch failed");
        entry.error = Some(message.clone());
        entry.stale = false;
        if entry.data.is_some() {
          entry.source = CacheSource::Offline;
        }
      }
    }
    entry.bump();
  }

  /// Replace the data held for `key` synchronously.
  ///
  /// The updater receives the current data (`None` when absent) and returns
  /// the new data. Staleness is left untouched. Clearing the data also drops
  /// the persisted snapshot.
  pub fn write<F>(&self, key: &K, updater: F)
  where
    F: FnOnce(Option<Vec<T>>) -> Option<Vec<T>>,
  {
    let mut entries = self.lock();
    let entry = self.entry(&mut entries, key);
    entry.data = updater(entry.data.take());
    match &entry.data {
      Some(data) => {
        entry.source = CacheSource::Local;
        self.persist(key, data);
      }
      None => {
        entry.source = CacheSource::Empty;
        if let Err(e) = self.inner.storage.remove(&key.cache_hash()) {
          warn!(key = ?key, error = %e, "failed to drop cache snapshot");
        }
      }
    }
    entry.bump();
  }

  /// Append `item` to a held collection, replacing an item with the same key
  /// instead if one is already there. An absent entry stays absent.
  pub fn append(&self, key: &K, item: T) {
    self.write(key, |old| {
      old.map(|mut items| {
        match items.iter().position(|i| i.cache_key() == item.cache_key()) {
          Some(idx) => items[idx] = item,
          None => items.push(item),
        }
        items
      })
    });
  }

  /// Replace the item with the same key in place, keeping order.
  pub fn replace(&self, key: &K, item: T) {
    self.write(key, |old| {
      old.map(|items| {
        items
          .into_iter()
          .map(|i| {
            if i.cache_key() == item.cache_key() {
              item.clone()
            } else {
              i
            }
          })
          .collect()
      })
    });
  }

  /// Drop the item whose key is `item_key`.
  pub fn remove(&self, key: &K, item_key: &str) {
    self.write(key, |old| {
      old.map(|mut items| {
        items.retain(|i| i.cache_key() != item_key);
        items
      })
    });
  }

  /// Mark `key` stale; the next read refetches in the background.
  pub fn invalidate(&self, key: &K) {
    let mut entries = self.lock();
    let entry = self.entry(&mut entries, key);
    entry.stale = true;
    entry.invalidations += 1;
    entry.bump();
    debug!(key = ?key, "invalidated");
  }

  /// Invalidate and read again, so a refresh starts right away.
  pub fn refetch<F, Fut, E>(&self, key: &K, fetcher: F) -> CacheSnapshot<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    E: Display + Send + 'static,
  {
    self.invalidate(key);
    self.read(key, fetcher)
  }
}
