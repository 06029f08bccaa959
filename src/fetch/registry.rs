//! In-flight request registry.
//!
//! At most one remote call may be outstanding per [`RequestKey`]. A caller
//! acquires an [`InFlightGuard`] before issuing the call; the key is released
//! when the guard drops, whether the call succeeded, failed, or was cancelled.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Identity of a remote request, tagged by the lookup it performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestKey {
  /// A page of the catalog listing (1-based)
  Page { page: u32 },
  /// A lookup by normalized name
  Search { name: String },
  /// A lookup by numeric id
  Detail { id: u32 },
}

impl fmt::Display for RequestKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Page { page } => write!(f, "page:{}", page),
      Self::Search { name } => write!(f, "search:{}", name),
      Self::Detail { id } => write!(f, "detail:{}", id),
    }
  }
}

/// Called with the number of outstanding requests after every change.
type Observer = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Clone, Default)]
pub struct InFlightRegistry {
  keys: Arc<Mutex<HashSet<RequestKey>>>,
  observer: Option<Observer>,
}

impl InFlightRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Notify `observer` of the outstanding count whenever it changes.
  pub fn with_observer(mut self, observer: impl Fn(usize) + Send + Sync + 'static) -> Self {
    self.observer = Some(Arc::new(observer));
    self
  }

  /// Claim `key`, or return `None` if a request for it is already outstanding.
  pub fn try_acquire(&self, key: RequestKey) -> Option<InFlightGuard> {
    let outstanding = {
      let mut keys = self.keys();
      if !keys.insert(key.clone()) {
        return None;
      }
      keys.len()
    };
    self.notify(outstanding);

    Some(InFlightGuard {
      registry: self.clone(),
      key,
    })
  }

  #[cfg(test)]
  pub fn contains(&self, key: &RequestKey) -> bool {
    self.keys().contains(key)
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.keys().len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.keys().is_empty()
  }

  fn release(&self, key: &RequestKey) {
    let outstanding = {
      let mut keys = self.keys();
      keys.remove(key);
      keys.len()
    };
    self.notify(outstanding);
  }

  fn notify(&self, outstanding: usize) {
    if let Some(observer) = &self.observer {
      observer(outstanding);
    }
  }

  fn keys(&self) -> MutexGuard<'_, HashSet<RequestKey>> {
    self.keys.lock().unwrap_or_else(|e| e.into_inner())
  }
}

/// Marks a key as in flight until dropped.
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct InFlightGuard {
  registry: InFlightRegistry,
  key: RequestKey,
}

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    self.registry.release(&self.key);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn test_second_acquire_is_refused_until_release() {
    let registry = InFlightRegistry::new();
    let key = RequestKey::Detail { id: 25 };

    let guard = registry.try_acquire(key.clone()).expect("first acquire");
    assert!(registry.try_acquire(key.clone()).is_none());
    assert!(registry.contains(&key));

    drop(guard);
    assert!(!registry.contains(&key));
    assert!(registry.try_acquire(key).is_some());
  }

  #[test]
  fn test_distinct_keys_are_independent() {
    let registry = InFlightRegistry::new();

    let _page = registry.try_acquire(RequestKey::Page { page: 1 }).unwrap();
    let _search = registry
      .try_acquire(RequestKey::Search {
        name: "1".to_string(),
      })
      .unwrap();
    let _detail = registry.try_acquire(RequestKey::Detail { id: 1 }).unwrap();

    assert_eq!(registry.len(), 3);
  }

  #[test]
  fn test_observer_sees_outstanding_count() {
    let last = Arc::new(AtomicUsize::new(usize::MAX));
    let seen = last.clone();
    let registry =
      InFlightRegistry::new().with_observer(move |count| seen.store(count, Ordering::SeqCst));

    let first = registry.try_acquire(RequestKey::Page { page: 1 }).unwrap();
    assert_eq!(last.load(Ordering::SeqCst), 1);

    let second = registry.try_acquire(RequestKey::Page { page: 2 }).unwrap();
    assert_eq!(last.load(Ordering::SeqCst), 2);

    drop(first);
    assert_eq!(last.load(Ordering::SeqCst), 1);
    drop(second);
    assert_eq!(last.load(Ordering::SeqCst), 0);
    assert!(registry.is_empty());
  }

  #[test]
  fn test_refused_acquire_does_not_notify() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry = InFlightRegistry::new().with_observer(move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
    });

    let _guard = registry.try_acquire(RequestKey::Detail { id: 7 }).unwrap();
    assert!(registry.try_acquire(RequestKey::Detail { id: 7 }).is_none());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_key_display() {
    assert_eq!(RequestKey::Page { page: 3 }.to_string(), "page:3");
    assert_eq!(RequestKey::Detail { id: 25 }.to_string(), "detail:25");
  }
}
