//! Core traits and types for the caching system.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Trait for values that can be held by the cache.
///
/// Values travel through the durable tier as JSON, so they must round-trip
/// through serde. Each cached value is one of a closed set of entity kinds.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Entity kind name for log lines (e.g., "list_page", "detail")
  fn kind(&self) -> &'static str;
}

/// Source of the current time for expiration checks.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A cached value along with when it was written and how long it lives.
///
/// Entries are never mutated in place; a new write replaces the old entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub value: T,
  pub written_at: DateTime<Utc>,
  /// Time-to-live, stored as whole milliseconds
  #[serde(with = "ttl_millis")]
  pub ttl: Duration,
}

impl<T> CacheEntry<T> {
  /// Create an entry written at `written_at`. Negative TTLs are clamped to zero.
  pub fn new(value: T, written_at: DateTime<Utc>, ttl: Duration) -> Self {
    Self {
      value,
      written_at,
      ttl: ttl.max(Duration::zero()),
    }
  }

  /// An entry is stale once its age exceeds its TTL.
  pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
    now - self.written_at > self.ttl
  }
}

mod ttl_millis {
  use chrono::Duration;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(ttl.num_milliseconds())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let millis = i64::deserialize(deserializer)?;
    if millis < 0 {
      return Err(serde::de::Error::custom("ttl must not be negative"));
    }
    Ok(Duration::milliseconds(millis))
  }
}
