//! Query-string parameters shared by the `/metrics` routes.
//!
//! Every route accepts the same parameter struct and ignores the fields it
//! has no use for; validation happens when a handler asks for a field.

use chrono::NaiveDate;
use playlens_core::delivery::DeliveryMetric;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Longest accepted `days` window.
pub const MAX_WINDOW_DAYS: u32 = 366;

#[derive(Debug, Default, Deserialize)]
pub struct MetricParams {
  /// Reference date (`YYYY-MM-DD`) in the reporting zone; defaults to today.
  pub date:        Option<NaiveDate>,
  pub days:        Option<u32>,
  pub game_key:    Option<String>,
  pub threshold:   Option<u32>,
  pub metric:      Option<String>,
  pub campaign_id: Option<Uuid>,
}

impl MetricParams {
  pub fn date_or(&self, today: NaiveDate) -> NaiveDate { self.date.unwrap_or(today) }

  pub fn days_or(&self, default: u32) -> Result<u32, ApiError> {
    match self.days.unwrap_or(default) {
      0 => Err(ApiError::BadRequest("days must be at least 1".into())),
      n if n > MAX_WINDOW_DAYS => Err(ApiError::BadRequest(format!(
        "days must be at most {MAX_WINDOW_DAYS}"
      ))),
      n => Ok(n),
    }
  }

  /// An empty `game_key` means "all games".
  pub fn game_key(&self) -> Option<&str> { self.game_key.as_deref().filter(|g| !g.is_empty()) }

  pub fn threshold(&self) -> Result<Option<u32>, ApiError> {
    match self.threshold {
      Some(0) => Err(ApiError::BadRequest("threshold must be at least 1".into())),
      other => Ok(other),
    }
  }

  /// `metric` is optional; an absent or empty value sums all metrics.
  pub fn metric(&self) -> Result<Option<DeliveryMetric>, ApiError> {
    match self.metric.as_deref() {
      None | Some("") => Ok(None),
      Some(name) => Ok(Some(DeliveryMetric::from_name(name)?)),
    }
  }
}
