use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;

use super::api_types::{ApiErrorBody, ApiListResponse, ApiPokemon};
use super::error::FetchError;
use super::types::{Detail, ListPage};

/// Read operations against the catalog service.
#[async_trait]
pub trait CatalogApi: Send + Sync {
  /// Fetch `limit` list entries starting at `offset`.
  async fn list_page(&self, limit: u32, offset: u32) -> Result<ListPage, FetchError>;

  /// Look up a single entry by name.
  async fn by_name(&self, name: &str) -> Result<Detail, FetchError>;

  /// Look up a single entry by numeric id.
  async fn by_id(&self, id: u32) -> Result<Detail, FetchError>;
}

#[async_trait]
impl<T: CatalogApi + ?Sized> CatalogApi for Arc<T> {
  async fn list_page(&self, limit: u32, offset: u32) -> Result<ListPage, FetchError> {
    (**self).list_page(limit, offset).await
  }

  async fn by_name(&self, name: &str) -> Result<Detail, FetchError> {
    (**self).by_name(name).await
  }

  async fn by_id(&self, id: u32) -> Result<Detail, FetchError> {
    (**self).by_id(id).await
  }
}

/// PokeAPI client wrapper
#[derive(Clone)]
pub struct PokeApiClient {
  http: reqwest::Client,
  base_url: Url,
}

impl PokeApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    // Url::join drops the last path segment unless the base ends with a slash
    let mut base = config.base_url.trim_end_matches('/').to_string();
    base.push('/');
    let base_url =
      Url::parse(&base).map_err(|e| eyre!("Invalid API base URL {}: {}", config.base_url, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
    self
      .base_url
      .join(path)
      .map_err(|e| FetchError::transport(format!("Invalid request path {}: {}", path, e), None))
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, FetchError> {
    debug!(%url, "GET");

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| FetchError::transport(format!("Error fetching {}: {}", what, e), None))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      return Err(FetchError::not_found(what));
    }
    if !status.is_success() {
      let detail = response
        .json::<ApiErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .map(|message| format!(" ({})", message))
        .unwrap_or_default();
      return Err(FetchError::transport(
        format!("Error fetching {}: {}{}", what, status.as_u16(), detail),
        Some(status.as_u16()),
      ));
    }

    response.json::<T>().await.map_err(|e| {
      FetchError::transport(
        format!("Failed to parse {}: {}", what, e),
        Some(status.as_u16()),
      )
    })
  }
}

#[async_trait]
impl CatalogApi for PokeApiClient {
  async fn list_page(&self, limit: u32, offset: u32) -> Result<ListPage, FetchError> {
    let mut url = self.endpoint("pokemon")?;
    url
      .query_pairs_mut()
      .append_pair("limit", &limit.to_string())
      .append_pair("offset", &offset.to_string());

    let response: ApiListResponse = self.get_json(url, "Pokémon list").await?;
    Ok(response.into_page(offset))
  }

  async fn by_name(&self, name: &str) -> Result<Detail, FetchError> {
    let name = name.trim().to_lowercase();
    let url = self.endpoint(&format!("pokemon/{}", name))?;

    let pokemon: ApiPokemon = self.get_json(url, &format!("Pokémon '{}'", name)).await?;
    Ok(pokemon.into())
  }

  async fn by_id(&self, id: u32) -> Result<Detail, FetchError> {
    let url = self.endpoint(&format!("pokemon/{}", id))?;

    let pokemon: ApiPokemon = self.get_json(url, &format!("Pokémon #{}", id)).await?;
    Ok(pokemon.into())
  }
}
