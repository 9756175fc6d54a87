//! Record builders shared by the unit tests in this crate.

use chrono::{DateTime, Duration, NaiveDate, TimeZone as _, Utc};
use playlens_core::{
  calendar::ReportingCalendar,
  content::{ContentItem, ContentStatus},
  session::{Round, Session},
};
use uuid::Uuid;

pub(crate) fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn utc_calendar() -> ReportingCalendar {
  ReportingCalendar::from_name("UTC").unwrap()
}

pub(crate) fn session(user_id: Uuid, started_at: DateTime<Utc>) -> Session {
  Session {
    session_id: Uuid::new_v4(),
    user_id,
    game_key: "quiz".into(),
    device_id: None,
    started_at,
    ended_at: None,
  }
}

/// One round per item, a minute apart, starting a minute after the session.
pub(crate) fn rounds(session: &Session, items: &[Uuid]) -> Vec<Round> {
  items
    .iter()
    .enumerate()
    .map(|(i, item)| {
      Round::new(
        session.session_id,
        *item,
        session.started_at + Duration::minutes(i as i64 + 1),
      )
    })
    .collect()
}

pub(crate) fn item(status: ContentStatus, active: bool) -> ContentItem {
  ContentItem {
    item_id: Uuid::new_v4(),
    game_key: "quiz".into(),
    status,
    active,
    tags: vec![],
    difficulty: None,
  }
}
