//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 UTC strings so that `<` and `>=` in
//! SQL agree with chronological order. UUIDs are hyphenated lowercase
//! strings. Enum columns hold the snake_case names the domain types render.

use chrono::{DateTime, SecondsFormat, Utc};
use playlens_core::{
  content::{ContentItem, ContentStatus},
  delivery::{DeliveryEvent, DeliveryMetric},
  session::{Round, Session},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<ContentStatus> { Ok(ContentStatus::from_name(s)?) }

pub fn decode_metric(s: &str) -> Result<DeliveryMetric> { Ok(DeliveryMetric::from_name(s)?) }

// ─── JSON lists ──────────────────────────────────────────────────────────────

pub fn encode_strings(values: &[String]) -> Result<String> {
  Ok(serde_json::to_string(values)?)
}

pub fn decode_strings(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `sessions` row.
pub struct RawSession {
  pub session_id: String,
  pub user_id:    String,
  pub game_key:   String,
  pub device_id:  Option<String>,
  pub started_at: String,
  pub ended_at:   Option<String>,
}

impl RawSession {
  pub const COLUMNS: &'static str =
    "session_id, user_id, game_key, device_id, started_at, ended_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id: row.get(0)?,
      user_id:    row.get(1)?,
      game_key:   row.get(2)?,
      device_id:  row.get(3)?,
      started_at: row.get(4)?,
      ended_at:   row.get(5)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_id: decode_uuid(&self.session_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      game_key:   self.game_key,
      device_id:  self.device_id,
      started_at: decode_dt(&self.started_at)?,
      ended_at:   decode_opt_dt(self.ended_at.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `rounds` row.
pub struct RawRound {
  pub round_id:         String,
  pub session_id:       Option<String>,
  pub item_id:          Option<String>,
  pub started_at:       String,
  pub ended_at:         Option<String>,
  pub duration_seconds: Option<f64>,
  pub decision:         Option<String>,
  pub outcome:          Option<String>,
  pub winners:          Option<String>,
}

impl RawRound {
  pub const COLUMNS: &'static str = "round_id, session_id, item_id, started_at, ended_at, \
                                     duration_seconds, decision, outcome, winners";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      round_id:         row.get(0)?,
      session_id:       row.get(1)?,
      item_id:          row.get(2)?,
      started_at:       row.get(3)?,
      ended_at:         row.get(4)?,
      duration_seconds: row.get(5)?,
      decision:         row.get(6)?,
      outcome:          row.get(7)?,
      winners:          row.get(8)?,
    })
  }

  pub fn into_round(self) -> Result<Round> {
    Ok(Round {
      round_id:         decode_uuid(&self.round_id)?,
      session_id:       decode_opt_uuid(self.session_id.as_deref())?,
      item_id:          decode_opt_uuid(self.item_id.as_deref())?,
      started_at:       decode_dt(&self.started_at)?,
      ended_at:         decode_opt_dt(self.ended_at.as_deref())?,
      duration_seconds: self.duration_seconds,
      decision:         self.decision,
      outcome:          self.outcome,
      winners:          self.winners.as_deref().map(decode_strings).transpose()?,
    })
  }
}

/// Raw strings read directly from a `content_items` row.
pub struct RawContentItem {
  pub item_id:    String,
  pub game_key:   String,
  pub status:     String,
  pub active:     bool,
  pub tags:       String,
  pub difficulty: Option<String>,
}

impl RawContentItem {
  pub const COLUMNS: &'static str = "item_id, game_key, status, active, tags, difficulty";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:    row.get(0)?,
      game_key:   row.get(1)?,
      status:     row.get(2)?,
      active:     row.get(3)?,
      tags:       row.get(4)?,
      difficulty: row.get(5)?,
    })
  }

  pub fn into_item(self) -> Result<ContentItem> {
    Ok(ContentItem {
      item_id:    decode_uuid(&self.item_id)?,
      game_key:   self.game_key,
      status:     decode_status(&self.status)?,
      active:     self.active,
      tags:       decode_strings(&self.tags)?,
      difficulty: self.difficulty,
    })
  }
}

/// Raw strings read directly from a `delivery_events` row.
pub struct RawDeliveryEvent {
  pub event_id:    String,
  pub campaign_id: Option<String>,
  pub metric:      String,
  pub occurred_at: String,
  pub value:       i64,
}

impl RawDeliveryEvent {
  pub const COLUMNS: &'static str = "event_id, campaign_id, metric, occurred_at, value";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      campaign_id: row.get(1)?,
      metric:      row.get(2)?,
      occurred_at: row.get(3)?,
      value:       row.get(4)?,
    })
  }

  pub fn into_event(self) -> Result<DeliveryEvent> {
    let value = u64::try_from(self.value).map_err(|_| Error::UnknownValue {
      column: "delivery_events.value",
      value:  self.value.to_string(),
    })?;
    Ok(DeliveryEvent {
      event_id: decode_uuid(&self.event_id)?,
      campaign_id: decode_opt_uuid(self.campaign_id.as_deref())?,
      metric: decode_metric(&self.metric)?,
      occurred_at: decode_dt(&self.occurred_at)?,
      value,
    })
  }
}
