//! Serde-deserializable types matching PokeAPI responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;
use url::Url;

use super::types::{Detail, ListItem, ListPage};

// ============================================================================
// List endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiNamedResource {
  pub name: String,
  pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  #[serde(default)]
  pub count: u32,
  // Some mirrors of the API name the list field after the entity
  #[serde(default, alias = "pokemons")]
  pub results: Vec<ApiNamedResource>,
}

// ============================================================================
// Detail endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiArtwork {
  pub front_default: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiOtherSprites {
  #[serde(rename = "official-artwork")]
  pub official_artwork: Option<ApiArtwork>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSprites {
  pub front_default: Option<String>,
  pub other: Option<ApiOtherSprites>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTypeSlot {
  #[serde(rename = "type")]
  pub type_ref: ApiNamedResource,
}

#[derive(Debug, Deserialize)]
pub struct ApiAbilitySlot {
  pub ability: ApiNamedResource,
}

#[derive(Debug, Deserialize)]
pub struct ApiPokemon {
  pub id: u32,
  pub name: String,
  #[serde(default)]
  pub height: u32,
  #[serde(default)]
  pub weight: u32,
  pub base_experience: Option<u32>,
  #[serde(default)]
  pub sprites: ApiSprites,
  #[serde(default)]
  pub types: Vec<ApiTypeSlot>,
  #[serde(default)]
  pub abilities: Vec<ApiAbilitySlot>,
}

/// Error body some deployments return alongside a non-success status
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl ApiListResponse {
  /// Convert to a page, numbering items from `offset` when their URL carries no id.
  pub fn into_page(self, offset: u32) -> ListPage {
    let items = self
      .results
      .into_iter()
      .enumerate()
      .map(|(index, resource)| {
        let id = resource
          .url
          .as_deref()
          .and_then(id_from_url)
          .unwrap_or(offset + index as u32 + 1);
        ListItem {
          id,
          name: resource.name,
          url: resource.url,
        }
      })
      .collect();

    ListPage {
      total_count: self.count,
      items,
    }
  }
}

impl From<ApiPokemon> for Detail {
  fn from(api: ApiPokemon) -> Self {
    let artwork_url = api
      .sprites
      .other
      .and_then(|other| other.official_artwork)
      .and_then(|artwork| artwork.front_default);

    Detail {
      id: api.id,
      name: api.name,
      height: api.height,
      weight: api.weight,
      base_experience: api.base_experience,
      types: api.types.into_iter().map(|slot| slot.type_ref.name).collect(),
      abilities: api
        .abilities
        .into_iter()
        .map(|slot| slot.ability.name)
        .collect(),
      sprite_url: api.sprites.front_default,
      artwork_url,
    }
  }
}

/// Extract the numeric id from a resource URL such as `.../pokemon/25/`.
fn id_from_url(raw: &str) -> Option<u32> {
  let url = Url::parse(raw).ok()?;
  url
    .path_segments()?
    .filter(|segment| !segment.is_empty())
    .last()?
    .parse()
    .ok()
}
