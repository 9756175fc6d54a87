//! Play sessions and the rounds presented within them.
//!
//! Both record types are owned by the event store. The analytics core only
//! reads snapshots of them; nothing in this workspace mutates a session after
//! it has ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Session ─────────────────────────────────────────────────────────────────

/// One continuous play of a game by one user on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub session_id: Uuid,
  pub user_id:    Uuid,
  /// Identifier of the game being played, e.g. `"quiz"`.
  pub game_key:   String,
  pub device_id:  Option<String>,
  pub started_at: DateTime<Utc>,
  /// Set when the session completes; `None` while it is still running.
  pub ended_at:   Option<DateTime<Utc>>,
}

impl Session {
  pub fn is_ended(&self) -> bool { self.ended_at.is_some() }
}

// ─── Round ───────────────────────────────────────────────────────────────────

/// One content item presented and resolved within a session.
///
/// `session_id` and `item_id` are optional because the upstream store does
/// not enforce them. Rounds missing either are malformed and are excluded
/// from every aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
  pub round_id:         Uuid,
  pub session_id:       Option<Uuid>,
  pub item_id:          Option<Uuid>,
  pub started_at:       DateTime<Utc>,
  pub ended_at:         Option<DateTime<Utc>>,
  pub duration_seconds: Option<f64>,
  /// The player's answer or choice, as recorded by the game.
  pub decision:         Option<String>,
  pub outcome:          Option<String>,
  pub winners:          Option<Vec<String>>,
}

impl Round {
  /// Convenience constructor for a well-formed round with no resolution data.
  pub fn new(session_id: Uuid, item_id: Uuid, started_at: DateTime<Utc>) -> Self {
    Self {
      round_id: Uuid::new_v4(),
      session_id: Some(session_id),
      item_id: Some(item_id),
      started_at,
      ended_at: None,
      duration_seconds: None,
      decision: None,
      outcome: None,
      winners: None,
    }
  }
}
