use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL the words endpoints hang off, e.g. "https://vocab.example.com/api"
  pub url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds before fetched data is refreshed on the next read
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Keep a SQLite snapshot of query results under the data directory
  #[serde(default = "default_true")]
  pub persist: bool,
}

impl CacheConfig {
  /// `stale_secs` as a duration, rejecting values chrono cannot represent
  pub fn stale_time(&self) -> Result<chrono::Duration> {
    i64::try_from(self.stale_secs)
      .ok()
      .and_then(chrono::Duration::try_seconds)
      .ok_or_else(|| eyre!("cache.stale_secs is out of range: {}", self.stale_secs))
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      persist: true,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Default filter directive; RUST_LOG takes precedence
  #[serde(default = "default_log_level")]
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

fn default_timeout_secs() -> u64 {
  15
}

fn default_stale_secs() -> u64 {
  300
}

fn default_true() -> bool {
  true
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./lexis.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/lexis/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    Self::load_or_else(explicit_path, || {
      Err(eyre!(
        "No configuration file found. Create one at ~/.config/lexis/config.yaml\n\
                 or start with --sandbox to use local sample data."
      ))
    })
  }

  /// Like [`Config::load`], but calls `fallback` when no file exists at all.
  /// A file that exists but fails to read or parse is still an error.
  pub fn load_or_else(
    explicit_path: Option<&Path>,
    fallback: impl FnOnce() -> Result<Self>,
  ) -> Result<Self> {
    let path = match explicit_path {
      Some(p) if p.exists() => Some(p.to_path_buf()),
      Some(p) => return Err(eyre!("Config file not found: {}", p.display())),
      None => Self::find_config_file(),
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => fallback(),
    }
  }

  /// Configuration used by `--sandbox` when no file is found.
  pub fn sandbox() -> Self {
    Self {
      api: ApiConfig {
        url: "sqlite://sandbox".to_string(),
        timeout_secs: default_timeout_secs(),
      },
      title: Some("Sandbox".to_string()),
      cache: CacheConfig {
        persist: false,
        ..CacheConfig::default()
      },
      log: LogConfig::default(),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("lexis.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("lexis").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Get the API token from the environment.
  ///
  /// The token is optional; requests go out unauthenticated without it.
  pub fn get_api_token() -> Option<String> {
    std::env::var("LEXIS_API_TOKEN")
      .ok()
      .filter(|token| !token.trim().is_empty())
  }
}
