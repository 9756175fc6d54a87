//! Error types for `playlens-core`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown time zone: {0:?}")]
  UnknownTimeZone(String),

  #[error("window end {end} precedes start {start}")]
  InvalidWindow {
    start: DateTime<Utc>,
    end:   DateTime<Utc>,
  },

  #[error("unknown content status: {0:?}")]
  UnknownContentStatus(String),

  #[error("unknown delivery metric: {0:?}")]
  UnknownDeliveryMetric(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
