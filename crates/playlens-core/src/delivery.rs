//! Campaign delivery log entries, consumed by the daypart heatmap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Which delivery counter an event contributes to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryMetric {
  Impression,
  Click,
  Conversion,
}

impl DeliveryMetric {
  /// Parse the snake_case name used in storage and query strings.
  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownDeliveryMetric(name.to_owned()))
  }
}

/// One timestamped delivery event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEvent {
  pub event_id:    Uuid,
  pub campaign_id: Option<Uuid>,
  pub metric:      DeliveryMetric,
  pub occurred_at: DateTime<Utc>,
  /// Usually 1 per impression/click; conversions may carry an explicit count.
  pub value:       u64,
}

impl DeliveryEvent {
  /// A single-count event with no campaign attribution.
  pub fn unit(metric: DeliveryMetric, occurred_at: DateTime<Utc>) -> Self {
    Self {
      event_id: Uuid::new_v4(),
      campaign_id: None,
      metric,
      occurred_at,
      value: 1,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn metric_names_parse() {
    assert_eq!(DeliveryMetric::from_name("click").unwrap(), DeliveryMetric::Click);
    assert_eq!(DeliveryMetric::Conversion.to_string(), "conversion");
    assert!(matches!(
      DeliveryMetric::from_name("views"),
      Err(Error::UnknownDeliveryMetric(_))
    ));
  }
}
