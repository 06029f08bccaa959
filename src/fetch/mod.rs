//! Fetch orchestration between the presentation layer, the cache, and the remote service.
//!
//! - Deduplicates concurrent identical requests via a typed in-flight registry
//! - Debounces search-term changes behind a single cancellable task
//! - Publishes a single observable [`CatalogState`]

mod debounce;
mod orchestrator;
mod registry;
mod state;

pub use orchestrator::{FetchOutcome, Orchestrator};
pub use state::CatalogState;
