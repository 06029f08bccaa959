//! Two-tier read-through cache.
//!
//! The fast tier is an in-process map holding already-parsed values. The
//! durable tier is a [`PersistentStore`] holding JSON-serialized entries that
//! survive a restart. Reads fall through from fast to durable and promote
//! durable hits back into the fast tier. Durability is best-effort: write
//! failures are logged and never surface to the caller.

use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::key::{CacheKey, CACHE_PREFIX};
use super::storage::{PersistentStore, StoreError};
use super::traits::{CacheEntry, Cacheable, Clock, SystemClock};

/// Failures recovered inside the cache service.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("durable tier rejected write for {key}: {source}")]
  StorageWrite {
    key: String,
    #[source]
    source: StoreError,
  },
  #[error("durable tier unavailable: {0}")]
  Storage(#[from] StoreError),
  #[error("corrupt cache entry {key}: {source}")]
  CorruptEntry {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Number of entries removed from each tier by a sweep or clear.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Evicted {
  pub memory: usize,
  pub durable: usize,
}

/// Read-through, write-through cache over a fast tier and a durable tier.
pub struct CacheService<S, V> {
  store: S,
  memory: Mutex<HashMap<String, CacheEntry<V>>>,
  clock: Arc<dyn Clock>,
}

impl<S: PersistentStore, V: Cacheable> CacheService<S, V> {
  /// Create a cache over `store` using wall-clock time.
  pub fn new(store: S) -> Self {
    Self::with_clock(store, Arc::new(SystemClock))
  }

  pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
    Self {
      store,
      memory: Mutex::new(HashMap::new()),
      clock,
    }
  }

  /// Create a cache and purge entries that expired while the process was not running.
  pub fn open(store: S) -> Self {
    let cache = Self::new(store);
    cache.sweep_expired();
    cache
  }

  /// Look up a fresh value, checking the fast tier before the durable tier.
  pub fn get(&self, key: &CacheKey) -> Option<V> {
    let now = self.clock.now();

    {
      let mut memory = self.memory();
      if let Some(entry) = memory.get(key.as_str()) {
        if !entry.is_stale(now) {
          debug!(key = %key, kind = entry.value.kind(), "fast tier hit");
          return Some(entry.value.clone());
        }
        memory.remove(key.as_str());
      }
    }

    match self.read_durable(key.as_str()) {
      Ok(Some(entry)) if !entry.is_stale(now) => {
        debug!(key = %key, kind = entry.value.kind(), "durable tier hit, promoting");
        let value = entry.value.clone();
        self.memory().insert(key.as_str().to_string(), entry);
        Some(value)
      }
      Ok(Some(_)) => {
        debug!(key = %key, "durable entry stale, evicting");
        self.delete(key);
        None
      }
      Ok(None) => {
        debug!(key = %key, "cache miss");
        None
      }
      Err(err @ CacheError::CorruptEntry { .. }) => {
        warn!(error = %err, "evicting corrupt cache entry");
        self.delete(key);
        None
      }
      Err(err) => {
        warn!(error = %err, "durable tier read failed");
        None
      }
    }
  }

  /// Write a fresh entry into both tiers.
  ///
  /// A rejected durable write triggers a sweep; the fast-tier write stands either way.
  pub fn set(&self, key: &CacheKey, value: V, ttl: Duration) {
    let entry = CacheEntry::new(value, self.clock.now(), ttl);

    if let Err(err) = self.write_durable(key.as_str(), &entry) {
      warn!(error = %err, "durable cache write failed, sweeping expired entries");
      self.sweep_expired();
    }

    self.memory().insert(key.as_str().to_string(), entry);
  }

  /// Remove a key from both tiers.
  pub fn delete(&self, key: &CacheKey) {
    self.memory().remove(key.as_str());
    self.remove_durable(key.as_str());
  }

  /// Evict every stale entry from both tiers. Unparsable durable entries count as stale.
  pub fn sweep_expired(&self) -> Evicted {
    let now = self.clock.now();
    let mut evicted = Evicted::default();

    {
      let mut memory = self.memory();
      let before = memory.len();
      memory.retain(|_, entry| !entry.is_stale(now));
      evicted.memory = before - memory.len();
    }

    let keys = match self.owned_durable_keys() {
      Ok(keys) => keys,
      Err(err) => {
        warn!(error = %err, "could not enumerate durable cache keys");
        return evicted;
      }
    };

    for key in keys {
      let stale = match self.read_durable(&key) {
        Ok(Some(entry)) => entry.is_stale(now),
        Ok(None) => false,
        Err(CacheError::CorruptEntry { .. }) => true,
        Err(err) => {
          warn!(error = %err, key = %key, "skipping unreadable cache entry");
          false
        }
      };
      if stale {
        self.remove_durable(&key);
        evicted.durable += 1;
      }
    }

    if evicted != Evicted::default() {
      info!(memory = evicted.memory, durable = evicted.durable, "swept expired cache entries");
    }
    evicted
  }

  /// Remove every entry under the cache's namespace, fresh or not.
  pub fn clear_namespace(&self) -> Evicted {
    let mut evicted = Evicted::default();

    {
      let mut memory = self.memory();
      let before = memory.len();
      memory.retain(|key, _| !CacheKey::is_owned(key));
      evicted.memory = before - memory.len();
    }

    match self.owned_durable_keys() {
      Ok(keys) => {
        for key in keys {
          self.remove_durable(&key);
          evicted.durable += 1;
        }
      }
      Err(err) => warn!(error = %err, "could not enumerate durable cache keys"),
    }

    info!(memory = evicted.memory, durable = evicted.durable, "cleared cache namespace");
    evicted
  }

  fn memory(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
    self.memory.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn owned_durable_keys(&self) -> Result<Vec<String>, CacheError> {
    let prefix = format!("{}:", CACHE_PREFIX);
    Ok(self.store.keys_with_prefix(&prefix)?)
  }

  fn read_durable(&self, key: &str) -> Result<Option<CacheEntry<V>>, CacheError> {
    let Some(bytes) = self.store.get(key)? else {
      return Ok(None);
    };
    serde_json::from_slice(&bytes)
      .map(Some)
      .map_err(|source| CacheError::CorruptEntry {
        key: key.to_string(),
        source,
      })
  }

  fn write_durable(&self, key: &str, entry: &CacheEntry<V>) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec(entry).map_err(|source| CacheError::CorruptEntry {
      key: key.to_string(),
      source,
    })?;
    self
      .store
      .set(key, &bytes)
      .map_err(|source| CacheError::StorageWrite {
        key: key.to_string(),
        source,
      })
  }

  fn remove_durable(&self, key: &str) {
    if let Err(err) = self.store.remove(key) {
      warn!(error = %err, key = %key, "failed to remove durable cache entry");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::key::Namespace;
  use crate::cache::storage::MemoryStore;
  use crate::cache::traits::testing::ManualClock;
  use chrono::{TimeZone, Utc};
  use serde::{Deserialize, Serialize};
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct TestData {
    name: String,
    value: i32,
  }

  impl Cacheable for TestData {
    fn kind(&self) -> &'static str {
      "test_data"
    }
  }

  fn data(name: &str) -> TestData {
    TestData {
      name: name.to_string(),
      value: 42,
    }
  }

  /// Store wrapper that counts durable reads.
  #[derive(Default)]
  struct CountingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
  }

  impl PersistentStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
      self.reads.fetch_add(1, Ordering::SeqCst);
      self.inner.get(key)
    }
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
      self.inner.set(key, value)
    }
    fn remove(&self, key: &str) -> Result<(), StoreError> {
      self.inner.remove(key)
    }
    fn count(&self) -> Result<usize, StoreError> {
      self.inner.count()
    }
    fn key_at(&self, index: usize) -> Result<Option<String>, StoreError> {
      self.inner.key_at(index)
    }
  }

  fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
      Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
    ))
  }

  fn cache_with<S: PersistentStore>(store: S, clock: &Arc<ManualClock>) -> CacheService<S, TestData> {
    CacheService::with_clock(store, clock.clone())
  }

  #[test]
  fn test_get_returns_fresh_value_and_expires_after_ttl() {
    let clock = clock();
    let cache = cache_with(MemoryStore::new(), &clock);
    let key = CacheKey::by_id(1);
    let ttl = Duration::seconds(30);

    cache.set(&key, data("bulbasaur"), ttl);

    clock.advance(ttl - Duration::milliseconds(1));
    assert_eq!(cache.get(&key), Some(data("bulbasaur")));

    clock.advance(Duration::milliseconds(2));
    assert_eq!(cache.get(&key), None);
  }

  #[test]
  fn test_expired_entry_is_evicted_from_both_tiers_on_read() {
    let clock = clock();
    let cache = cache_with(MemoryStore::new(), &clock);
    let key = CacheKey::by_id(2);

    cache.set(&key, data("ivysaur"), Duration::seconds(1));
    clock.advance(Duration::seconds(2));

    assert_eq!(cache.get(&key), None);
    assert!(cache.memory().is_empty());
    assert_eq!(cache.store.count().unwrap(), 0);
  }

  #[test]
  fn test_durable_hit_is_promoted_to_fast_tier() {
    let clock = clock();
    let store = CountingStore::default();
    let key = CacheKey::by_name("pikachu");

    // Seed the durable tier as a previous process would have left it
    let entry = CacheEntry::new(data("pikachu"), clock.now(), Duration::minutes(15));
    store
      .inner
      .set(key.as_str(), &serde_json::to_vec(&entry).unwrap())
      .unwrap();

    let cache = cache_with(store, &clock);

    assert_eq!(cache.get(&key), Some(data("pikachu")));
    assert_eq!(cache.store.reads.load(Ordering::SeqCst), 1);

    clock.advance(Duration::minutes(5));
    assert_eq!(cache.get(&key), Some(data("pikachu")));
    assert_eq!(cache.get(&key), Some(data("pikachu")));
    assert_eq!(cache.store.reads.load(Ordering::SeqCst), 1);

    // Once the promoted copy expires the durable tier is consulted again
    clock.advance(Duration::minutes(11));
    assert_eq!(cache.get(&key), None);
    assert_eq!(cache.store.reads.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn test_promoted_entry_keeps_original_write_time() {
    let clock = clock();
    let store = MemoryStore::new();
    let key = CacheKey::by_id(3);
    let entry = CacheEntry::new(data("venusaur"), clock.now(), Duration::minutes(1));
    store
      .set(key.as_str(), &serde_json::to_vec(&entry).unwrap())
      .unwrap();
    let cache = cache_with(store, &clock);

    clock.advance(Duration::seconds(50));
    assert!(cache.get(&key).is_some());

    clock.advance(Duration::seconds(11));
    assert_eq!(cache.get(&key), None);
  }

  #[test]
  fn test_corrupt_durable_entry_reads_as_miss_and_is_removed() {
    let clock = clock();
    let store = MemoryStore::new();
    let key = CacheKey::by_id(4);
    store.set(key.as_str(), b"{not json").unwrap();
    let cache = cache_with(store, &clock);

    assert_eq!(cache.get(&key), None);
    assert_eq!(cache.store.get(key.as_str()).unwrap(), None);
  }

  #[test]
  fn test_entry_of_wrong_shape_is_corrupt() {
    let clock = clock();
    let store = MemoryStore::new();
    let key = CacheKey::by_id(5);
    let entry = CacheEntry::new(vec![1, 2, 3], clock.now(), Duration::minutes(1));
    store
      .set(key.as_str(), &serde_json::to_vec(&entry).unwrap())
      .unwrap();
    let cache = cache_with(store, &clock);

    let err = cache.read_durable(key.as_str()).unwrap_err();
    assert!(matches!(err, CacheError::CorruptEntry { .. }));
    assert_eq!(cache.get(&key), None);
  }

  #[test]
  fn test_failed_durable_write_keeps_fast_tier_and_sweeps() {
    let clock = clock();
    let cache = cache_with(MemoryStore::with_capacity(1), &clock);
    let old = CacheKey::by_id(6);
    let new = CacheKey::by_id(7);

    cache.set(&old, data("charmander"), Duration::seconds(1));
    clock.advance(Duration::seconds(5));

    // Store is full of a stale entry: the write is rejected and the sweep frees it
    cache.set(&new, data("charmeleon"), Duration::minutes(1));

    assert_eq!(cache.get(&new), Some(data("charmeleon")));
    assert_eq!(cache.store.get(old.as_str()).unwrap(), None);
    assert_eq!(cache.store.get(new.as_str()).unwrap(), None);
  }

  #[test]
  fn test_delete_tolerates_missing_keys() {
    let clock = clock();
    let cache = cache_with(MemoryStore::new(), &clock);
    let key = CacheKey::by_id(8);

    cache.delete(&key);

    cache.set(&key, data("charizard"), Duration::minutes(1));
    cache.memory().clear();
    cache.delete(&key);

    assert_eq!(cache.get(&key), None);
    assert_eq!(cache.store.count().unwrap(), 0);
  }

  #[test]
  fn test_sweep_removes_stale_and_corrupt_entries_only() {
    let clock = clock();
    let store = MemoryStore::new();
    store.set("pokemon:id:id=99", b"garbage").unwrap();
    store.set("unrelated", b"garbage").unwrap();
    let cache = cache_with(store, &clock);

    let fresh = CacheKey::by_id(10);
    let stale = CacheKey::list(20, 0);
    cache.set(&stale, data("list"), Duration::seconds(10));
    cache.set(&fresh, data("squirtle"), Duration::minutes(10));
    clock.advance(Duration::minutes(1));

    let evicted = cache.sweep_expired();

    assert_eq!(evicted, Evicted { memory: 1, durable: 2 });
    assert!(cache.store.get(fresh.as_str()).unwrap().is_some());
    assert_eq!(cache.store.get(stale.as_str()).unwrap(), None);
    assert_eq!(cache.store.get("pokemon:id:id=99").unwrap(), None);
    assert_eq!(cache.store.get("unrelated").unwrap(), Some(b"garbage".to_vec()));
  }

  #[test]
  fn test_clear_namespace_leaves_unrelated_keys() {
    let clock = clock();
    let store = MemoryStore::new();
    store.set("settings:theme", b"dark").unwrap();
    let cache = cache_with(store, &clock);

    cache.set(&CacheKey::list(20, 0), data("page"), Namespace::List.default_ttl());
    cache.set(&CacheKey::by_name("mew"), data("mew"), Namespace::Name.default_ttl());
    cache.set(&CacheKey::by_id(151), data("mew"), Namespace::Id.default_ttl());

    let evicted = cache.clear_namespace();

    assert_eq!(evicted, Evicted { memory: 3, durable: 3 });
    assert_eq!(cache.get(&CacheKey::by_id(151)), None);
    assert_eq!(cache.store.count().unwrap(), 1);
    assert_eq!(cache.store.get("settings:theme").unwrap(), Some(b"dark".to_vec()));
  }

  #[test]
  fn test_open_purges_entries_expired_while_offline() {
    let store = MemoryStore::new();
    let written_at = Utc::now() - Duration::hours(1);
    let entry = CacheEntry::new(data("old"), written_at, Duration::minutes(10));
    store
      .set("pokemon:id:id=1", &serde_json::to_vec(&entry).unwrap())
      .unwrap();

    let cache: CacheService<_, TestData> = CacheService::open(store);

    assert_eq!(cache.store.count().unwrap(), 0);
  }

  #[test]
  fn test_overwrite_replaces_entry() {
    let clock = clock();
    let cache = cache_with(MemoryStore::new(), &clock);
    let key = CacheKey::by_id(12);

    cache.set(&key, data("first"), Duration::seconds(5));
    clock.advance(Duration::seconds(4));
    cache.set(&key, data("second"), Duration::seconds(5));
    clock.advance(Duration::seconds(4));

    assert_eq!(cache.get(&key), Some(data("second")));
  }
}
