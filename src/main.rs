mod api;
mod app;
mod cache;
mod commands;
mod config;
mod db;
mod event;
mod logging;
mod query;
mod ui;

use api::cache::WordsCache;
use api::{HttpWordsClient, WordsApi};
use cache::{CacheStorage, NoopStorage, SqliteStorage};
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use config::Config;
use db::{Database, LocalWordsStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "lexis")]
#[command(about = "A terminal admin UI for a vocabulary words API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/lexis/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Serve words from a seeded local SQLite database instead of the API
  #[arg(long)]
  sandbox: bool,

  /// API base URL, overrides the config file
  #[arg(short, long)]
  url: Option<String>,

  /// Replace the sandbox database contents with fresh sample data
  #[arg(long, requires = "sandbox")]
  reset: bool,

  /// Delete a sandbox account and its words, then exit
  #[arg(long, value_name = "USERNAME", requires = "sandbox")]
  delete_account: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = if args.sandbox {
    Config::load_or_else(args.config.as_deref(), || Ok(Config::sandbox()))?
  } else {
    Config::load(args.config.as_deref())?
  };

  // Override API url if specified on command line
  if let Some(url) = args.url {
    config.api.url = url;
  }

  let _log_guard = logging::init(&config.log.level)?;

  let (api, host): (Arc<dyn WordsApi>, String) = if args.sandbox {
    let db = Arc::new(Database::open()?);
    if args.reset {
      db.seed()?;
    } else {
      db.seed_if_empty()?;
    }

    if let Some(username) = args.delete_account {
      return delete_account(&db, &username);
    }

    let store = LocalWordsStore::for_session(Arc::clone(&db))?;
    let account = store.sign_in()?;
    info!(words = db.word_count()?, "sandbox ready");
    let host = format!("sandbox · {}", account.display_name());
    (Arc::new(store), host)
  } else {
    let client = HttpWordsClient::from_config(&config)?;
    let host = client.host();
    (Arc::new(client), host)
  };

  let storage: Arc<dyn CacheStorage> = if config.cache.persist && !args.sandbox {
    match SqliteStorage::open() {
      Ok(storage) => Arc::new(storage),
      Err(e) => {
        warn!(error = %e, "snapshot storage unavailable, caching in memory only");
        Arc::new(NoopStorage)
      }
    }
  } else {
    Arc::new(NoopStorage)
  };
  let cache = WordsCache::new(storage).with_stale_time(config.cache.stale_time()?);

  // Initialize and run the app
  let mut app = app::App::new(api, cache, config.title.clone(), host);
  app.run().await?;

  Ok(())
}

fn delete_account(db: &Database, username: &str) -> Result<()> {
  let account = db
    .account_by_username(username)?
    .ok_or_else(|| eyre!("No sandbox account named {}", username))?;
  let words = db
    .delete_account(&account.id)?
    .ok_or_else(|| eyre!("Sandbox account {} vanished before deletion", username))?;
  println!("Deleted {} ({}) and {} word(s)", username, account.email, words);
  Ok(())
}
