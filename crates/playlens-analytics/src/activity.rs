//! Per-user activity calendar shared by the cohort and DAU calculators.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use playlens_core::{calendar::ReportingCalendar, session::Session};
use uuid::Uuid;

pub(crate) struct Activity {
  /// Local date of each user's first session.
  pub first_seen: HashMap<Uuid, NaiveDate>,
  /// Users with at least one session started on each local date.
  pub active_on:  HashMap<NaiveDate, HashSet<Uuid>>,
}

impl Activity {
  /// Fold sessions up to and including `until`; later sessions are ignored.
  pub fn build(sessions: &[Session], calendar: &ReportingCalendar, until: NaiveDate) -> Self {
    let mut first_seen: HashMap<Uuid, NaiveDate> = HashMap::new();
    let mut active_on: HashMap<NaiveDate, HashSet<Uuid>> = HashMap::new();

    for s in sessions {
      let day = calendar.local_date(s.started_at);
      if day > until {
        continue;
      }
      first_seen
        .entry(s.user_id)
        .and_modify(|first| *first = (*first).min(day))
        .or_insert(day);
      active_on.entry(day).or_default().insert(s.user_id);
    }

    Self { first_seen, active_on }
  }

  pub fn active_count(&self, date: NaiveDate) -> usize {
    self.active_on.get(&date).map(HashSet::len).unwrap_or(0)
  }
}
