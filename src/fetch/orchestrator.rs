//! The single entry point the presentation layer uses to request data.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{normalize_name, Evicted, PersistentStore};
use crate::pokeapi::cache::CatalogCache;
use crate::pokeapi::client::CatalogApi;
use crate::pokeapi::error::FetchError;
use crate::pokeapi::types::{Detail, ListItem, ListPage};

use super::debounce::Debouncer;
use super::registry::{InFlightRegistry, RequestKey};
use super::state::{CatalogState, Pagination, PAGE_SIZE};

/// Quiet period a search term must hold before it is looked up.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// What an orchestrator operation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  /// Served from cache, no remote call
  Cached,
  /// Fetched remotely and published
  Published,
  /// Dropped because an identical request is already in flight
  Deduplicated,
  /// Refused locally before any fetch
  Rejected,
  /// Settled after a newer request of the same kind; cached but not published
  Superseded,
  /// Remote call failed and the error was published
  Failed,
}

/// Composes the catalog cache and the remote client, and owns [`CatalogState`].
///
/// Cloning is cheap and every clone drives the same state.
pub struct Orchestrator<A, S> {
  inner: Arc<Inner<A, S>>,
}

struct Inner<A, S> {
  api: A,
  cache: Arc<CatalogCache<S>>,
  registry: InFlightRegistry,
  debouncer: Debouncer,
  state: Arc<watch::Sender<CatalogState>>,
  /// Most recent list-producing request; only its result may publish items
  latest_list: Mutex<Option<RequestKey>>,
  /// Most recently selected id; `None` once the selection is cleared
  latest_detail: Mutex<Option<u32>>,
  /// Last page shown while browsing, restored when a search is cleared
  browse_page: AtomicU32,
}

impl<A, S> Clone for Orchestrator<A, S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<A, S> Orchestrator<A, S>
where
  A: CatalogApi + 'static,
  S: PersistentStore + 'static,
{
  pub fn new(api: A, cache: Arc<CatalogCache<S>>) -> Self {
    let (tx, _rx) = watch::channel(CatalogState::default());
    let state = Arc::new(tx);

    let loading_state = Arc::clone(&state);
    let registry = InFlightRegistry::new().with_observer(move |outstanding| {
      loading_state.send_if_modified(|s| {
        let loading = outstanding > 0;
        let changed = s.loading != loading;
        s.loading = loading;
        changed
      });
    });

    Self {
      inner: Arc::new(Inner {
        api,
        cache,
        registry,
        debouncer: Debouncer::new(DEBOUNCE_DELAY),
        state,
        latest_list: Mutex::new(None),
        latest_detail: Mutex::new(None),
        browse_page: AtomicU32::new(1),
      }),
    }
  }

  /// Receiver that is notified on every state change.
  pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
    self.inner.state.subscribe()
  }

  /// A copy of the current state.
  #[cfg(test)]
  pub fn snapshot(&self) -> CatalogState {
    self.inner.state.borrow().clone()
  }

  /// Show `page` of the listing. Pages outside the known range are refused.
  pub async fn fetch_page(&self, page: u32) -> FetchOutcome {
    let accepted = self.inner.state.borrow().pagination.accepts(page);
    if !accepted {
      debug!(page, "page out of range, ignoring");
      return FetchOutcome::Rejected;
    }
    self.load_page(page).await
  }

  /// Update the search term.
  ///
  /// The selection is cleared right away. The lookup itself waits for the
  /// debounce quiet period; an empty term re-fetches the page being browsed.
  pub fn search(&self, term: &str) {
    let term = term.to_string();

    *self.latest_detail() = None;
    self.inner.state.send_modify(|s| {
      s.search_term = term.clone();
      s.selected = None;
    });

    let this = self.clone();
    self.inner.debouncer.schedule(Box::pin(async move {
      this.run_search(&term).await;
    }));
  }

  /// Load the detail record for `item` into the selection.
  pub async fn select_detail(&self, item: &ListItem) -> FetchOutcome {
    let inner = &self.inner;
    let id = item.id;
    let key = RequestKey::Detail { id };
    *self.latest_detail() = Some(id);

    if let Some(record) = inner.cache.get_by_id(id) {
      debug!(id, "detail served from cache");
      self.publish_detail(record);
      return FetchOutcome::Cached;
    }

    let Some(_guard) = inner.registry.try_acquire(key.clone()) else {
      debug!(%key, "request already in flight");
      return FetchOutcome::Deduplicated;
    };
    self.clear_error();

    match inner.api.by_id(id).await {
      Ok(record) => {
        inner.cache.remember_detail(&record, None);
        if !self.is_latest_detail(id) {
          return FetchOutcome::Superseded;
        }
        self.publish_detail(record);
        FetchOutcome::Published
      }
      Err(err) => {
        warn!(%key, status = ?err.status(), error = %err, "detail fetch failed");
        if !self.is_latest_detail(id) {
          return FetchOutcome::Superseded;
        }
        // The listed items stay put; only the error is shown
        inner
          .state
          .send_modify(|s| s.error = Some(err.to_string()));
        FetchOutcome::Failed
      }
    }
  }

  pub fn clear_selection(&self) {
    *self.latest_detail() = None;
    self.inner.state.send_modify(|s| s.selected = None);
  }

  /// Drop every cached entry. Does not re-fetch.
  pub fn clear_cache(&self) -> Evicted {
    let evicted = self.inner.cache.clear_namespace();
    info!(memory = evicted.memory, durable = evicted.durable, "cache cleared by user");
    evicted
  }

  /// Re-issue the most recent list request, typically after an error.
  pub async fn retry(&self) -> FetchOutcome {
    let last = self.latest_list().clone();
    match last {
      Some(RequestKey::Search { name }) => self.lookup_name(name).await,
      Some(RequestKey::Page { page }) => self.load_page(page).await,
      _ => self.load_page(self.browse_page()).await,
    }
  }

  async fn run_search(&self, term: &str) -> FetchOutcome {
    let name = normalize_name(term);
    if name.is_empty() {
      return self.load_page(self.browse_page()).await;
    }
    self.lookup_name(name).await
  }

  async fn load_page(&self, page: u32) -> FetchOutcome {
    let inner = &self.inner;
    let Some(offset) = Pagination::offset_of(page) else {
      debug!(page, "page offset out of range, ignoring");
      return FetchOutcome::Rejected;
    };
    let key = RequestKey::Page { page };
    self.mark_latest_list(&key);

    if let Some(list) = inner.cache.get_list(PAGE_SIZE, offset) {
      debug!(page, "page served from cache");
      self.publish_page(page, list);
      return FetchOutcome::Cached;
    }

    let Some(_guard) = inner.registry.try_acquire(key.clone()) else {
      debug!(%key, "request already in flight");
      return FetchOutcome::Deduplicated;
    };
    self.clear_error();

    match inner.api.list_page(PAGE_SIZE, offset).await {
      Ok(list) => {
        inner.cache.set_list(PAGE_SIZE, offset, &list);
        if !self.is_latest_list(&key) {
          return FetchOutcome::Superseded;
        }
        self.publish_page(page, list);
        FetchOutcome::Published
      }
      Err(err) => {
        warn!(%key, status = ?err.status(), error = %err, "list fetch failed");
        if !self.is_latest_list(&key) {
          return FetchOutcome::Superseded;
        }
        self.publish_list_error(&err);
        FetchOutcome::Failed
      }
    }
  }

  async fn lookup_name(&self, name: String) -> FetchOutcome {
    let inner = &self.inner;
    let key = RequestKey::Search { name: name.clone() };
    self.mark_latest_list(&key);

    if let Some(record) = inner.cache.get_by_name(&name) {
      debug!(%name, "search served from cache");
      self.publish_search_hit(&record);
      return FetchOutcome::Cached;
    }

    let Some(_guard) = inner.registry.try_acquire(key.clone()) else {
      debug!(%key, "request already in flight");
      return FetchOutcome::Deduplicated;
    };
    self.clear_error();

    match inner.api.by_name(&name).await {
      Ok(record) => {
        inner.cache.remember_detail(&record, Some(&name));
        if !self.is_latest_list(&key) {
          return FetchOutcome::Superseded;
        }
        self.publish_search_hit(&record);
        FetchOutcome::Published
      }
      Err(err) => {
        warn!(%key, status = ?err.status(), error = %err, "search failed");
        if !self.is_latest_list(&key) {
          return FetchOutcome::Superseded;
        }
        self.publish_list_error(&err);
        FetchOutcome::Failed
      }
    }
  }

  fn publish_page(&self, page: u32, list: ListPage) {
    self.inner.browse_page.store(page, Ordering::Relaxed);
    self.inner.state.send_modify(|s| {
      s.pagination = Pagination::for_page(page, list.total_count);
      s.items = list.items;
      s.error = None;
    });
  }

  fn publish_search_hit(&self, record: &Detail) {
    self.inner.state.send_modify(|s| {
      s.items = vec![record.to_list_item()];
      s.pagination = Pagination::single_result();
      s.error = None;
    });
  }

  fn publish_detail(&self, record: Detail) {
    self.inner.state.send_modify(|s| {
      s.selected = Some(record);
      s.error = None;
    });
  }

  fn publish_list_error(&self, err: &FetchError) {
    self.inner.state.send_modify(|s| {
      s.error = Some(err.to_string());
      s.items.clear();
    });
  }

  fn clear_error(&self) {
    self.inner.state.send_if_modified(|s| s.error.take().is_some());
  }

  fn browse_page(&self) -> u32 {
    self.inner.browse_page.load(Ordering::Relaxed).max(1)
  }

  fn mark_latest_list(&self, key: &RequestKey) {
    *self.latest_list() = Some(key.clone());
  }

  fn is_latest_list(&self, key: &RequestKey) -> bool {
    self.latest_list().as_ref() == Some(key)
  }

  fn is_latest_detail(&self, id: u32) -> bool {
    *self.latest_detail() == Some(id)
  }

  fn latest_list(&self) -> MutexGuard<'_, Option<RequestKey>> {
    self.inner.latest_list.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn latest_detail(&self) -> MutexGuard<'_, Option<u32>> {
    self.inner.latest_detail.lock().unwrap_or_else(|e| e.into_inner())
  }
}
