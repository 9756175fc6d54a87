//! Day-of-week × hour-of-day heatmap of delivery events.

use playlens_core::{
  calendar::{ReportingCalendar, TimeWindow},
  delivery::{DeliveryEvent, DeliveryMetric},
};
use serde::{Deserialize, Serialize};

pub const DAYS_PER_WEEK: usize = 7;
pub const HOURS_PER_DAY: usize = 24;

/// Summed event values per local `(weekday, hour)` cell.
///
/// Rows are weekdays with Monday at index 0; columns are local hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaypartHeatmap {
  /// The metric that was bucketed; `None` means every metric was summed.
  pub metric:    Option<DeliveryMetric>,
  pub grid:      [[u64; HOURS_PER_DAY]; DAYS_PER_WEEK],
  /// Largest single cell, or 1 when the grid is all zeros, so it can always
  /// be used as a colour-scale divisor.
  pub max_value: u64,
  pub total:     u64,
}

impl DaypartHeatmap {
  pub fn cell(&self, weekday: usize, hour: usize) -> u64 { self.grid[weekday][hour] }

  /// Sum across every cell; always equal to `total`.
  pub fn grid_sum(&self) -> u64 {
    self.grid.iter().flatten().sum()
  }
}

/// Bucket the events in `window` matching `metric` by their local weekday and
/// hour in the reporting zone.
pub fn bucket(
  events:   &[DeliveryEvent],
  metric:   Option<DeliveryMetric>,
  window:   TimeWindow,
  calendar: &ReportingCalendar,
) -> DaypartHeatmap {
  let mut grid = [[0_u64; HOURS_PER_DAY]; DAYS_PER_WEEK];
  let mut total: u64 = 0;

  for event in events
    .iter()
    .filter(|e| metric.is_none_or(|m| e.metric == m))
    .filter(|e| window.contains(e.occurred_at))
  {
    let (weekday, hour) = calendar.weekday_hour(event.occurred_at);
    grid[weekday][hour] = grid[weekday][hour].saturating_add(event.value);
    total = total.saturating_add(event.value);
  }

  let max_value = grid.iter().flatten().copied().max().filter(|&m| m > 0).unwrap_or(1);

  DaypartHeatmap { metric, grid, max_value, total }
}
