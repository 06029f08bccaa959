mod app;
mod cache;
mod config;
mod event;
mod fetch;
mod logging;
mod pokeapi;
mod ui;

use cache::{CacheService, MemoryStore, PersistentStore, SqliteStore};
use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pokedex9s")]
#[command(about = "A terminal Pokédex with an offline-friendly response cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pokedex9s/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the API base URL
  #[arg(long)]
  base_url: Option<String>,

  /// Page to open on start
  #[arg(short, long, default_value_t = 1)]
  page: u32,

  /// Remove every cached response and exit
  #[arg(long)]
  clear_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }

  let _log_guard = logging::init(&config.log_dir()?)?;

  let store: Box<dyn PersistentStore> = if config.cache.enabled {
    let path = config.cache_path()?;
    info!(path = %path.display(), "opening response cache");
    Box::new(SqliteStore::open(&path)?)
  } else {
    Box::new(MemoryStore::new())
  };
  let cache: Arc<pokeapi::cache::CatalogCache<_>> = Arc::new(CacheService::open(store));

  if args.clear_cache {
    let evicted = cache.clear_namespace();
    println!(
      "Removed {} cached responses",
      evicted.memory.max(evicted.durable)
    );
    return Ok(());
  }

  let client = pokeapi::PokeApiClient::new(&config.api)?;
  let dex = fetch::Orchestrator::new(client, cache);

  let mut app = app::App::new(dex);
  app.run(args.page).await?;

  Ok(())
}
