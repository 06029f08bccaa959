//! Caching implementations for catalog types.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, CacheService, Cacheable, Namespace, PersistentStore};

use super::types::{Detail, ListPage};

/// Values the catalog cache holds, one variant per entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CachedValue {
  ListPage(ListPage),
  Detail(Detail),
}

impl Cacheable for CachedValue {
  fn kind(&self) -> &'static str {
    match self {
      Self::ListPage(_) => "list_page",
      Self::Detail(_) => "detail",
    }
  }
}

/// The cache service specialized to catalog values.
pub type CatalogCache<S> = CacheService<S, CachedValue>;

// ============================================================================
// Entity wrappers
// ============================================================================

impl<S: PersistentStore> CacheService<S, CachedValue> {
  pub fn get_list(&self, limit: u32, offset: u32) -> Option<ListPage> {
    match self.get(&CacheKey::list(limit, offset))? {
      CachedValue::ListPage(page) => Some(page),
      CachedValue::Detail(_) => None,
    }
  }

  pub fn set_list(&self, limit: u32, offset: u32, page: &ListPage) {
    self.set(
      &CacheKey::list(limit, offset),
      CachedValue::ListPage(page.clone()),
      Namespace::List.default_ttl(),
    );
  }

  pub fn get_by_name(&self, name: &str) -> Option<Detail> {
    detail(self.get(&CacheKey::by_name(name))?)
  }

  pub fn set_by_name(&self, name: &str, record: &Detail) {
    self.set(
      &CacheKey::by_name(name),
      CachedValue::Detail(record.clone()),
      Namespace::Name.default_ttl(),
    );
  }

  pub fn get_by_id(&self, id: u32) -> Option<Detail> {
    detail(self.get(&CacheKey::by_id(id))?)
  }

  pub fn set_by_id(&self, id: u32, record: &Detail) {
    self.set(
      &CacheKey::by_id(id),
      CachedValue::Detail(record.clone()),
      Namespace::Id.default_ttl(),
    );
  }

  /// Store a record under its id and name so either lookup path finds it.
  ///
  /// `looked_up_as` is the name the caller searched for, when it differs from
  /// the record's canonical name.
  pub fn remember_detail(&self, record: &Detail, looked_up_as: Option<&str>) {
    self.set_by_id(record.id, record);
    self.set_by_name(&record.name, record);
    if let Some(name) = looked_up_as {
      if CacheKey::by_name(name) != CacheKey::by_name(&record.name) {
        self.set_by_name(name, record);
      }
    }
  }
}

fn detail(value: CachedValue) -> Option<Detail> {
  match value {
    CachedValue::Detail(record) => Some(record),
    CachedValue::ListPage(_) => None,
  }
}
