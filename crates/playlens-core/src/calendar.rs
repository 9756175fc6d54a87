//! Time windows and the reporting calendar.
//!
//! Every "day" in Playlens is a calendar day in one configured IANA zone.
//! All calculators receive a [`ReportingCalendar`] and an explicit reference
//! date instead of reading the wall clock, so bucketing is reproducible and
//! consistent across metrics.

use chrono::{
  DateTime, Datelike as _, Days, Duration, NaiveDate, NaiveTime, TimeZone as _,
  Timelike as _, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The zone used when configuration does not name one.
pub const DEFAULT_TIME_ZONE: &str = "America/Sao_Paulo";

// ─── TimeWindow ──────────────────────────────────────────────────────────────

/// A half-open interval of instants, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl TimeWindow {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
    if end < start {
      return Err(Error::InvalidWindow { start, end });
    }
    Ok(Self { start, end })
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && at < self.end
  }

  pub fn is_empty(&self) -> bool { self.start == self.end }
}

// ─── ReportingCalendar ───────────────────────────────────────────────────────

/// Maps UTC instants onto local calendar days and hours in one fixed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingCalendar {
  tz: Tz,
}

impl Default for ReportingCalendar {
  fn default() -> Self { Self { tz: chrono_tz::America::Sao_Paulo } }
}

impl ReportingCalendar {
  pub fn new(tz: Tz) -> Self { Self { tz } }

  /// Build a calendar from an IANA zone name such as `"Europe/Lisbon"`.
  pub fn from_name(name: &str) -> Result<Self> {
    let tz = name
      .parse::<Tz>()
      .map_err(|_| Error::UnknownTimeZone(name.to_owned()))?;
    Ok(Self { tz })
  }

  pub fn time_zone(&self) -> Tz { self.tz }

  /// The local calendar date on which `at` falls.
  pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&self.tz).date_naive()
  }

  /// Local `(weekday, hour)` of `at`; weekday 0 is Monday.
  pub fn weekday_hour(&self, at: DateTime<Utc>) -> (usize, usize) {
    let local = at.with_timezone(&self.tz);
    (
      local.weekday().num_days_from_monday() as usize,
      local.hour() as usize,
    )
  }

  /// "Today" for a given instant; only the outer API layer calls this.
  pub fn today(&self, now: DateTime<Utc>) -> NaiveDate { self.local_date(now) }

  /// The first instant of `date` in the reporting zone.
  pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let local = self.tz.from_local_datetime(&midnight).earliest().or_else(|| {
      // Midnight skipped by a DST transition: the day starts when the
      // clock resumes.
      self
        .tz
        .from_local_datetime(&(midnight + Duration::hours(1)))
        .earliest()
    });
    match local {
      Some(dt) => dt.with_timezone(&Utc),
      None => Utc.from_utc_datetime(&midnight),
    }
  }

  /// The window covering exactly one local calendar day.
  pub fn day_window(&self, date: NaiveDate) -> TimeWindow {
    let next = date.succ_opt().unwrap_or(date);
    TimeWindow {
      start: self.start_of_day(date),
      end:   self.start_of_day(next),
    }
  }

  /// The `days` local dates ending at and including `reference`, oldest
  /// first.
  pub fn trailing_days(&self, reference: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
      .rev()
      .filter_map(|back| reference.checked_sub_days(Days::new(back.into())))
      .collect()
  }

  /// The window spanning the `days` local dates ending at `reference`.
  pub fn trailing_window(&self, reference: NaiveDate, days: u32) -> TimeWindow {
    if days == 0 {
      let at = self.start_of_day(reference);
      return TimeWindow { start: at, end: at };
    }
    let first = reference
      .checked_sub_days(Days::new((days - 1).into()))
      .unwrap_or(reference);
    TimeWindow {
      start: self.start_of_day(first),
      end:   self.day_window(reference).end,
    }
  }
}
