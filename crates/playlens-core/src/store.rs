//! The `EventStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `playlens-store-sqlite`).
//! The analytics service depends on this abstraction, never on a concrete
//! backend. Every method returns a tagged `Result`; deciding what a failed
//! query means for a metric is the caller's job, not the store's.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  calendar::TimeWindow,
  content::ContentItem,
  delivery::{DeliveryEvent, DeliveryMetric},
  session::{Round, Session},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`EventStore::sessions`].
///
/// Time bounds are half-open: `started_from` inclusive, `started_before`
/// exclusive. `None` leaves that side unbounded.
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
  pub started_from:   Option<DateTime<Utc>>,
  pub started_before: Option<DateTime<Utc>>,
  pub game_key:       Option<String>,
  /// Restrict to these sessions. `Some(vec![])` matches nothing.
  pub session_ids:    Option<Vec<Uuid>>,
}

impl SessionQuery {
  /// Sessions started within `window`.
  pub fn in_window(window: TimeWindow) -> Self {
    Self {
      started_from: Some(window.start),
      started_before: Some(window.end),
      ..Self::default()
    }
  }

  /// Every session started before `end`: the full history a cohort or
  /// first-seen computation needs.
  pub fn history_until(end: DateTime<Utc>) -> Self {
    Self { started_before: Some(end), ..Self::default() }
  }

  pub fn with_game(mut self, game_key: Option<String>) -> Self {
    self.game_key = game_key;
    self
  }
}

/// Parameters for [`EventStore::rounds`].
#[derive(Debug, Clone, Default)]
pub struct RoundQuery {
  pub started_from:   Option<DateTime<Utc>>,
  pub started_before: Option<DateTime<Utc>>,
  /// Restrict to rounds of these sessions. `Some(vec![])` matches nothing.
  pub session_ids:    Option<Vec<Uuid>>,
}

impl RoundQuery {
  pub fn in_window(window: TimeWindow) -> Self {
    Self {
      started_from: Some(window.start),
      started_before: Some(window.end),
      session_ids: None,
    }
  }

  pub fn for_sessions(session_ids: Vec<Uuid>) -> Self {
    Self { session_ids: Some(session_ids), ..Self::default() }
  }
}

/// Parameters for [`EventStore::content_items`].
#[derive(Debug, Clone, Default)]
pub struct ContentQuery {
  pub game_key: Option<String>,
}

/// Parameters for [`EventStore::delivery_events`].
#[derive(Debug, Clone, Default)]
pub struct DeliveryQuery {
  pub occurred_from:   Option<DateTime<Utc>>,
  pub occurred_before: Option<DateTime<Utc>>,
  pub metric:          Option<DeliveryMetric>,
  pub campaign_id:     Option<Uuid>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Read-only access to the platform's play and delivery records.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Sessions matching `query`, ordered by `started_at`.
  fn sessions<'a>(
    &'a self,
    query: &'a SessionQuery,
  ) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + 'a;

  /// Rounds matching `query`, ordered by `started_at`. Rounds with a null
  /// `session_id` are only returned when no session filter is given.
  fn rounds<'a>(
    &'a self,
    query: &'a RoundQuery,
  ) -> impl Future<Output = Result<Vec<Round>, Self::Error>> + Send + 'a;

  /// The current content catalog snapshot.
  fn content_items<'a>(
    &'a self,
    query: &'a ContentQuery,
  ) -> impl Future<Output = Result<Vec<ContentItem>, Self::Error>> + Send + 'a;

  /// Campaign delivery events matching `query`.
  fn delivery_events<'a>(
    &'a self,
    query: &'a DeliveryQuery,
  ) -> impl Future<Output = Result<Vec<DeliveryEvent>, Self::Error>> + Send + 'a;
}
