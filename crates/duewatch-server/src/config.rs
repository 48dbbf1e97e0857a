//! Server configuration: an optional TOML file layered under `DUEWATCH_*`
//! environment variables.

use std::path::{Path, PathBuf};

use duewatch_classroom::OAuthConfig;
use duewatch_notify::DiscordConfig;
use duewatch_scheduler::SchedulerConfig;
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `DUEWATCH_GOOGLE__CLIENT_ID`.
pub const ENV_PREFIX: &str = "DUEWATCH";

/// Runtime configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub google:     OAuthConfig,
  pub discord:    DiscordConfig,
  pub scheduler:  SchedulerConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "0.0.0.0".into(),
      port:       8080,
      store_path: PathBuf::from("duewatch.sqlite"),
      google:     OAuthConfig::default(),
      discord:    DiscordConfig::default(),
      scheduler:  SchedulerConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Read `path` if it exists, then apply environment overrides.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
