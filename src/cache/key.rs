//! Cache namespaces and deterministic key derivation.

use chrono::Duration;
use std::collections::BTreeMap;
use std::fmt;

/// Umbrella prefix shared by every key the cache owns in the durable tier.
pub const CACHE_PREFIX: &str = "pokemon";

/// Entity kinds that get their own slice of the key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
  /// One page of the catalog listing
  List,
  /// Detail record looked up by name
  Name,
  /// Detail record looked up by numeric id
  Id,
}

impl Namespace {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::List => "pokemon:list",
      Self::Name => "pokemon:name",
      Self::Id => "pokemon:id",
    }
  }

  /// Lists churn more often than a single record, so they expire sooner.
  pub fn default_ttl(&self) -> Duration {
    match self {
      Self::List => Duration::minutes(10),
      Self::Name | Self::Id => Duration::minutes(15),
    }
  }
}

/// A cache key derived from a namespace and an unordered parameter set.
///
/// Parameter names are sorted before concatenation, so the same parameter set
/// always yields the same key no matter the order it was supplied in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn derive<I, K, V>(namespace: Namespace, params: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: fmt::Display,
  {
    let sorted: BTreeMap<String, String> = params
      .into_iter()
      .map(|(name, value)| (name.into(), value.to_string()))
      .collect();

    let joined = sorted
      .iter()
      .map(|(name, value)| format!("{}={}", name, value))
      .collect::<Vec<_>>()
      .join("&");

    Self(format!("{}:{}", namespace.as_str(), joined))
  }

  pub fn list(limit: u32, offset: u32) -> Self {
    Self::derive(Namespace::List, [("limit", limit), ("offset", offset)])
  }

  pub fn by_name(name: &str) -> Self {
    Self::derive(Namespace::Name, [("name", normalize_name(name))])
  }

  pub fn by_id(id: u32) -> Self {
    Self::derive(Namespace::Id, [("id", id)])
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether a raw durable-tier key lives under the cache's umbrella namespace.
  pub fn is_owned(raw: &str) -> bool {
    raw
      .strip_prefix(CACHE_PREFIX)
      .is_some_and(|rest| rest.starts_with(':'))
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Normalize a name for lookups and keys.
/// Trims whitespace and lowercases, since the service matches names case-insensitively.
pub fn normalize_name(name: &str) -> String {
  name.trim().to_lowercase()
}
