//! PokeAPI access: the remote client, its wire types and the typed cache views.

pub mod api_types;
pub mod cache;
pub mod client;
pub mod error;
pub mod types;

pub use client::PokeApiClient;
