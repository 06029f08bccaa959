//! Two-tier response cache with per-entry expiration.
//!
//! This module provides a catalog-agnostic caching mechanism that:
//! - Derives stable, namespaced keys from unordered parameter sets
//! - Serves fresh values from an in-process tier, then from a durable store
//! - Promotes durable hits into the in-process tier
//! - Sweeps stale and corrupt entries, on startup and after failed writes

mod key;
mod service;
mod storage;
mod traits;

pub use key::{normalize_name, CacheKey, Namespace};
pub use service::{CacheService, Evicted};
pub use storage::{MemoryStore, PersistentStore, SqliteStore};
pub use traits::Cacheable;

#[cfg(test)]
pub use traits::testing;
