//! Daily active users, split into new and returning.

use std::collections::HashMap;

use chrono::NaiveDate;
use playlens_core::{calendar::ReportingCalendar, session::Session};
use serde::{Deserialize, Serialize};

use crate::{activity::Activity, ratio::round1};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActiveUsers {
  pub date:            NaiveDate,
  /// Distinct users with at least one session started that day.
  pub dau:             usize,
  /// Users whose first session ever started that day.
  pub new_users:       usize,
  pub returning_users: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DauReport {
  /// Oldest first; the last entry is the reference date.
  pub days:    Vec<DailyActiveUsers>,
  /// Percentage change from the previous day to the reference date.
  pub trend:   f64,
  pub avg_dau: f64,
}

/// Count active users for each of the `days` local dates ending at
/// `reference_date`.
///
/// `sessions` must include each user's full history up to the reference
/// date; otherwise a returning user whose earlier sessions were left out is
/// reported as new.
pub fn compute(
  sessions:       &[Session],
  calendar:       &ReportingCalendar,
  reference_date: NaiveDate,
  days:           u32,
) -> DauReport {
  let activity = Activity::build(sessions, calendar, reference_date);

  let mut new_on: HashMap<NaiveDate, usize> = HashMap::new();
  for first in activity.first_seen.values() {
    *new_on.entry(*first).or_default() += 1;
  }

  let series: Vec<DailyActiveUsers> = calendar
    .trailing_days(reference_date, days)
    .into_iter()
    .map(|date| {
      let dau = activity.active_count(date);
      let new_users = new_on.get(&date).copied().unwrap_or(0);
      DailyActiveUsers {
        date,
        dau,
        new_users,
        returning_users: dau - new_users,
      }
    })
    .collect();

  let trend = match series.as_slice() {
    [.., yesterday, today] if yesterday.dau > 0 => round1(
      (today.dau as f64 - yesterday.dau as f64) * 100.0 / yesterday.dau as f64,
    ),
    _ => 0.0,
  };

  let avg_dau = if series.is_empty() {
    0.0
  } else {
    series.iter().map(|d| d.dau).sum::<usize>() as f64 / series.len() as f64
  };

  DauReport { days: series, trend, avg_dau }
}
