//! Acquisition cohorts and day-N retention.
//!
//! A user belongs to the cohort of the local date of their first-ever
//! session. Retention at offset `d` is the share of that cohort with at least
//! one session on exactly `cohort_start_date + d`.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use playlens_core::{calendar::ReportingCalendar, session::Session};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::Activity;

/// Day offsets at which retention is measured. Offset 0 is the cohort day
/// itself and is always 1.0 for a non-empty cohort.
pub const RETENTION_OFFSETS: [u32; 5] = [0, 1, 7, 14, 30];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
  pub cohort_start_date: NaiveDate,
  pub users_count:       usize,
  /// Offset in days → fraction of the cohort active that day. Offsets that
  /// fall after the reference date are not observable yet and are absent.
  pub retention:         BTreeMap<u32, f64>,
}

impl Cohort {
  pub fn day(&self, offset: u32) -> Option<f64> { self.retention.get(&offset).copied() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortReport {
  /// One cohort per local date in the window, oldest first.
  pub cohorts:             Vec<Cohort>,
  pub avg_day1_retention:  Option<f64>,
  pub avg_day7_retention:  Option<f64>,
  pub avg_day14_retention: Option<f64>,
  pub avg_day30_retention: Option<f64>,
  /// Start date of the cohort with the highest day-7 retention.
  pub best_cohort:         Option<NaiveDate>,
}

/// Build the cohorts whose start dates are the `days` local dates ending at
/// `reference_date`.
///
/// `sessions` must hold each user's full history, since a user's cohort is
/// decided by their first session ever. Sessions after the reference date
/// are ignored.
pub fn compute(
  sessions:       &[Session],
  calendar:       &ReportingCalendar,
  reference_date: NaiveDate,
  days:           u32,
) -> CohortReport {
  let activity = Activity::build(sessions, calendar, reference_date);

  let mut members: HashMap<NaiveDate, Vec<Uuid>> = HashMap::new();
  for (user, first) in &activity.first_seen {
    members.entry(*first).or_default().push(*user);
  }

  let cohorts: Vec<Cohort> = calendar
    .trailing_days(reference_date, days)
    .into_iter()
    .map(|start| {
      let users = members.get(&start).map(Vec::as_slice).unwrap_or_default();
      let retention = if users.is_empty() {
        BTreeMap::new()
      } else {
        RETENTION_OFFSETS
          .iter()
          .filter_map(|&offset| {
            let target = start.checked_add_days(Days::new(offset.into()))?;
            if target > reference_date {
              return None;
            }
            let returned = activity
              .active_on
              .get(&target)
              .map(|active| users.iter().filter(|u| active.contains(*u)).count())
              .unwrap_or(0);
            Some((offset, returned as f64 / users.len() as f64))
          })
          .collect()
      };
      Cohort { cohort_start_date: start, users_count: users.len(), retention }
    })
    .collect();

  CohortReport {
    avg_day1_retention:  average_retention(&cohorts, 1),
    avg_day7_retention:  average_retention(&cohorts, 7),
    avg_day14_retention: average_retention(&cohorts, 14),
    avg_day30_retention: average_retention(&cohorts, 30),
    best_cohort:         best_by_day7(&cohorts),
    cohorts,
  }
}

/// Unweighted mean over non-empty cohorts that can observe `offset`.
fn average_retention(cohorts: &[Cohort], offset: u32) -> Option<f64> {
  let values: Vec<f64> = cohorts
    .iter()
    .filter(|c| c.users_count > 0)
    .filter_map(|c| c.day(offset))
    .collect();
  if values.is_empty() {
    return None;
  }
  Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Ties keep the earliest cohort.
fn best_by_day7(cohorts: &[Cohort]) -> Option<NaiveDate> {
  let mut best: Option<(NaiveDate, f64)> = None;
  for c in cohorts {
    let Some(day7) = c.day(7) else { continue };
    if best.is_none_or(|(_, top)| day7 > top) {
      best = Some((c.cohort_start_date, day7));
    }
  }
  best.map(|(date, _)| date)
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::fixtures::{date, session, utc, utc_calendar};

  #[test]
  fn hundred_user_cohort_with_forty_back_on_day_seven() {
    let users: Vec<Uuid> = (0..100).map(|_| Uuid::new_v4()).collect();
    let mut sessions: Vec<Session> =
      users.iter().map(|u| session(*u, utc(2024, 1, 1, 12))).collect();
    sessions.extend(users[..40].iter().map(|u| session(*u, utc(2024, 1, 8, 18))));
    // Day 6 activity must not leak into day 7.
    sessions.extend(users[40..50].iter().map(|u| session(*u, utc(2024, 1, 7, 18))));

    let report = compute(&sessions, &utc_calendar(), date(2024, 1, 31), 31);
    let cohort = &report.cohorts[0];

    assert_eq!(cohort.cohort_start_date, date(2024, 1, 1));
    assert_eq!(cohort.users_count, 100);
    assert_eq!(cohort.day(0), Some(1.0));
    assert_eq!(cohort.day(1), Some(0.0));
    assert_eq!(cohort.day(7), Some(0.40));
    assert_eq!(cohort.day(30), Some(0.0));
  }

  #[test]
  fn returning_users_stay_in_their_first_cohort() {
    let user = Uuid::new_v4();
    let sessions = vec![
      session(user, utc(2024, 1, 2, 9)),
      session(user, utc(2024, 1, 3, 9)),
    ];
    let report = compute(&sessions, &utc_calendar(), date(2024, 1, 3), 3);

    let sizes: Vec<usize> = report.cohorts.iter().map(|c| c.users_count).collect();
    assert_eq!(sizes, vec![0, 1, 0]);
    assert_eq!(report.cohorts[1].day(1), Some(1.0));
  }

  #[test]
  fn immature_offsets_are_omitted() {
    let sessions = vec![session(Uuid::new_v4(), utc(2024, 1, 10, 9))];
    let report = compute(&sessions, &utc_calendar(), date(2024, 1, 12), 3);
    let cohort = report
      .cohorts
      .iter()
      .find(|c| c.cohort_start_date == date(2024, 1, 10))
      .unwrap();

    assert_eq!(cohort.retention.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(report.avg_day7_retention, None);
    assert_eq!(report.best_cohort, None);
  }

  #[test]
  fn averages_skip_empty_cohorts() {
    // Cohort A (Jan 1): 2 users, 1 back on day 1. Cohort B (Jan 3): 1 user,
    // back on day 1. Jan 2 has no new users.
    let (a1, a2, b1) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let sessions = vec![
      session(a1, utc(2024, 1, 1, 9)),
      session(a2, utc(2024, 1, 1, 9)),
      session(a1, utc(2024, 1, 2, 9)),
      session(b1, utc(2024, 1, 3, 9)),
      session(b1, utc(2024, 1, 4, 9)),
    ];
    let report = compute(&sessions, &utc_calendar(), date(2024, 1, 4), 4);

    assert_eq!(report.cohorts[1].users_count, 0);
    assert!(report.cohorts[1].retention.is_empty());
    assert_eq!(report.avg_day1_retention, Some(0.75));
  }

  #[test]
  fn best_cohort_ties_keep_the_earliest() {
    let mut sessions = Vec::new();
    for start in [1, 2] {
      let user = Uuid::new_v4();
      let first = utc(2024, 1, start, 9);
      sessions.push(session(user, first));
      sessions.push(session(user, first + Duration::days(7)));
    }
    let report = compute(&sessions, &utc_calendar(), date(2024, 1, 20), 20);
    assert_eq!(report.best_cohort, Some(date(2024, 1, 1)));
  }

  #[test]
  fn sessions_after_reference_date_are_ignored() {
    let user = Uuid::new_v4();
    let sessions = vec![session(user, utc(2024, 2, 1, 9))];
    let report = compute(&sessions, &utc_calendar(), date(2024, 1, 31), 1);
    assert_eq!(report.cohorts[0].users_count, 0);
  }
}
