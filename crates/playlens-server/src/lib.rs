//! Server wiring for Playlens: configuration and router assembly.
//!
//! The binary in `main.rs` only parses the CLI, initialises tracing, and
//! calls into this module, so everything here can be exercised in tests.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use config::{Config, ConfigError, Environment, File, FileFormat};
use playlens_analytics::{AnalyticsService, DEFAULT_OVEREXPOSURE_THRESHOLD};
use playlens_api::{AppState, DEFAULT_WINDOW_DAYS, SnapshotCache, params::MAX_WINDOW_DAYS};
use playlens_core::{
  calendar::{DEFAULT_TIME_ZONE, ReportingCalendar},
  store::EventStore,
};
use serde::Deserialize;
use thiserror::Error;

/// Prefix for environment overrides, e.g. `PLAYLENS_PORT=9000`.
pub const ENV_PREFIX: &str = "PLAYLENS";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub store_path:             PathBuf,
  /// IANA zone that defines "a day" for every metric.
  pub timezone:               String,
  pub overexposure_threshold: u32,
  /// Staleness window for cached metric bodies; 0 disables the cache.
  pub cache_ttl_secs:         u64,
  pub default_window_days:    u32,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                   "127.0.0.1".to_string(),
      port:                   8080,
      store_path:             PathBuf::from("playlens.db"),
      timezone:               DEFAULT_TIME_ZONE.to_string(),
      overexposure_threshold: DEFAULT_OVEREXPOSURE_THRESHOLD,
      cache_ttl_secs:         120,
      default_window_days:    DEFAULT_WINDOW_DAYS,
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigInvalid {
  #[error(transparent)]
  Source(#[from] ConfigError),

  #[error(transparent)]
  TimeZone(#[from] playlens_core::Error),

  #[error("overexposure_threshold must be at least 1")]
  Threshold,

  #[error("default_window_days must be between 1 and {MAX_WINDOW_DAYS}")]
  WindowDays,
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `PLAYLENS_*` variables.
  pub fn load(path: PathBuf) -> Result<Self, ConfigInvalid> {
    let builder = Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(Environment::with_prefix(ENV_PREFIX));
    Self::from_builder(builder)
  }

  /// Parse a TOML document, without environment overrides.
  pub fn from_toml(toml: &str) -> Result<Self, ConfigInvalid> {
    Self::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> Result<Self, ConfigInvalid> {
    let cfg: Self = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
  }

  fn validate(&self) -> Result<(), ConfigInvalid> {
    self.calendar()?;
    if self.overexposure_threshold == 0 {
      return Err(ConfigInvalid::Threshold);
    }
    if !(1..=MAX_WINDOW_DAYS).contains(&self.default_window_days) {
      return Err(ConfigInvalid::WindowDays);
    }
    Ok(())
  }

  pub fn calendar(&self) -> Result<ReportingCalendar, playlens_core::Error> {
    ReportingCalendar::from_name(&self.timezone)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router for `store` under `cfg`.
pub fn app<S>(store: Arc<S>, cfg: &ServerConfig) -> Result<Router, ConfigInvalid>
where
  S: EventStore + 'static,
{
  let service = AnalyticsService::new(store, cfg.calendar()?)
    .with_threshold(cfg.overexposure_threshold);
  let state = AppState::new(service)
    .with_cache(SnapshotCache::new(Duration::from_secs(cfg.cache_ttl_secs)))
    .with_window_days(cfg.default_window_days);
  Ok(playlens_api::metrics_router(state))
}
