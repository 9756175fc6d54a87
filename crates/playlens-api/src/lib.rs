//! JSON REST API for Playlens.
//!
//! Exposes an axum [`Router`] serving every analytics metric from any
//! [`playlens_core::store::EventStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", playlens_api::metrics_router(state))
//! ```

pub mod cache;
pub mod error;
pub mod etag;
pub mod metrics;
pub mod params;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use chrono::{NaiveDate, Utc};
use playlens_analytics::AnalyticsService;
use playlens_core::store::EventStore;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use cache::SnapshotCache;
pub use error::ApiError;

use params::MetricParams;

/// Window length used when a request gives no `days`.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub service:     AnalyticsService<S>,
  pub cache:       SnapshotCache,
  pub window_days: u32,
}

impl<S: EventStore> AppState<S> {
  pub fn new(service: AnalyticsService<S>) -> Self {
    Self {
      service,
      cache: SnapshotCache::default(),
      window_days: DEFAULT_WINDOW_DAYS,
    }
  }

  pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
    self.cache = cache;
    self
  }

  pub fn with_window_days(mut self, days: u32) -> Self {
    self.window_days = days;
    self
  }

  /// The requested date, or today in the reporting zone.
  fn reference_date(&self, params: &MetricParams) -> NaiveDate {
    params.date_or(self.service.calendar().today(Utc::now()))
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised metrics router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn metrics_router<S>(state: AppState<S>) -> Router<()>
where
  S: EventStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .route("/metrics/quality", get(metrics::quality::<S>))
    .route("/metrics/exposure", get(metrics::exposure::<S>))
    .route("/metrics/exposure/users/{user_id}", get(metrics::exposure_for_user::<S>))
    .route("/metrics/repetition", get(metrics::repetition::<S>))
    .route("/metrics/coverage", get(metrics::coverage::<S>))
    .route("/metrics/cohorts", get(metrics::cohorts::<S>))
    .route("/metrics/dau", get(metrics::dau::<S>))
    .route("/metrics/daypart", get(metrics::daypart::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(Arc::new(state))
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests;
