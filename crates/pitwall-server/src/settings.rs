//! Server configuration, layered from `pitwall.toml` and `PITWALL_*`
//! environment variables over built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use pitwall_core::config::IngestConfig;
use pitwall_ingest::SourceConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub source:     SourceConfig,
  pub ingest:     IngestConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_owned(),
      port:       8080,
      store_path: PathBuf::from("pitwall.db"),
      source:     SourceConfig::default(),
      ingest:     IngestConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and the environment. Nested keys use a
  /// double underscore, e.g. `PITWALL_INGEST__BATCH_SIZE=50`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("PITWALL")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
