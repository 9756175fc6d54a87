use chrono::{DateTime, Duration, NaiveDate, TimeZone as _, Utc};
use playlens_analytics::{cohort, coverage, daypart, exposure, repetition};
use playlens_core::{
  calendar::ReportingCalendar,
  content::{ContentItem, ContentStatus},
  delivery::{DeliveryEvent, DeliveryMetric},
  session::{Round, Session},
};
use proptest::prelude::*;
use uuid::Uuid;

fn base() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() }

fn calendar() -> ReportingCalendar { ReportingCalendar::from_name("America/Sao_Paulo").unwrap() }

/// A small world: `users` users, `items` items, and per session a list of
/// `(item index or none, minutes after base)` rounds.
fn world(
  users: usize,
  items: usize,
  plays: &[(usize, u32, Vec<Option<usize>>)],
) -> (Vec<Session>, Vec<Round>, Vec<Uuid>) {
  let user_ids: Vec<Uuid> = (0..users).map(|_| Uuid::new_v4()).collect();
  let item_ids: Vec<Uuid> = (0..items).map(|_| Uuid::new_v4()).collect();
  let mut sessions = Vec::new();
  let mut rounds = Vec::new();

  for (user, start_minutes, shown) in plays {
    let started_at = base() + Duration::minutes(i64::from(*start_minutes));
    let session = Session {
      session_id: Uuid::new_v4(),
      user_id: user_ids[user % users],
      game_key: "quiz".into(),
      device_id: None,
      started_at,
      ended_at: None,
    };
    for (i, item) in shown.iter().enumerate() {
      let mut round = Round::new(
        session.session_id,
        Uuid::nil(),
        started_at + Duration::seconds(i as i64 * 30),
      );
      round.item_id = item.map(|ix| item_ids[ix % items]);
      rounds.push(round);
    }
    sessions.push(session);
  }

  (sessions, rounds, item_ids)
}

fn plays() -> impl Strategy<Value = Vec<(usize, u32, Vec<Option<usize>>)>> {
  prop::collection::vec(
    (
      0..8_usize,
      0..(60 * 24 * 40_u32),
      prop::collection::vec(prop::option::weighted(0.9, 0..12_usize), 0..10),
    ),
    0..40,
  )
}

fn wide_window() -> playlens_core::calendar::TimeWindow {
  calendar().trailing_window(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 90)
}

proptest! {
  #[test]
  fn exposure_counts_sum_to_attributable_rounds(plays in plays()) {
    let (sessions, rounds, _) = world(8, 12, &plays);
    let report = exposure::aggregate(&sessions, &rounds, wide_window(), 5);

    let with_item = rounds.iter().filter(|r| r.item_id.is_some()).count() as u64;
    prop_assert_eq!(report.total_exposures(), with_item);
    prop_assert_eq!(report.total_exposures() + report.skipped_rounds as u64, rounds.len() as u64);
  }

  #[test]
  fn overexposed_items_are_exactly_those_at_threshold(
    plays in plays(),
    threshold in 1..6_u32,
  ) {
    let (sessions, rounds, _) = world(8, 12, &plays);
    let report = exposure::aggregate(&sessions, &rounds, wide_window(), threshold);

    for record in &report.per_user_item_counts {
      if record.seen_count >= threshold {
        prop_assert!(report.overexposed_items.contains(&record.item_id));
      }
    }
    for item in &report.overexposed_items {
      prop_assert!(report
        .per_user_item_counts
        .iter()
        .any(|r| r.item_id == *item && r.seen_count >= threshold));
    }
  }

  #[test]
  fn anti_repetition_rate_is_a_percentage(plays in plays()) {
    let (sessions, rounds, _) = world(8, 12, &plays);
    let report = repetition::compute(&sessions, &rounds, wide_window());

    prop_assert!((0.0..=100.0).contains(&report.anti_repetition_rate));
    prop_assert!(report.no_repeat_sessions <= report.total_sessions);
    if report.total_sessions == 0 {
      prop_assert_eq!(report.anti_repetition_rate, 100.0);
    }
  }

  #[test]
  fn coverage_ratios_stay_in_range(
    plays in plays(),
    statuses in prop::collection::vec((0..6_usize, any::<bool>()), 0..12),
  ) {
    let (sessions, rounds, item_ids) = world(8, 12, &plays);
    let all = [
      ContentStatus::Draft,
      ContentStatus::InReview,
      ContentStatus::Approved,
      ContentStatus::Live,
      ContentStatus::Paused,
      ContentStatus::Archived,
    ];
    let catalog: Vec<ContentItem> = statuses
      .iter()
      .zip(&item_ids)
      .map(|((status, active), id)| ContentItem {
        item_id: *id,
        game_key: "quiz".into(),
        status: all[*status],
        active: *active,
        tags: vec![],
        difficulty: None,
      })
      .collect();

    let report = coverage::compute(&catalog, &sessions, &rounds, wide_window());
    prop_assert!((0.0..=100.0).contains(&report.live_content_compliance));
    prop_assert!((0.0..=100.0).contains(&report.content_coverage));
    prop_assert!(report.live_items_seen <= report.live_active_items);
    if report.active_items == 0 {
      prop_assert_eq!(report.live_content_compliance, 100.0);
    }
    if report.live_active_items == 0 {
      prop_assert_eq!(report.content_coverage, 0.0);
    }
  }

  #[test]
  fn retention_fractions_are_bounded_and_day_zero_is_one(plays in plays()) {
    let (sessions, _, _) = world(8, 12, &plays);
    let reference = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
    let report = cohort::compute(&sessions, &calendar(), reference, 46);

    for c in &report.cohorts {
      for fraction in c.retention.values() {
        prop_assert!((0.0..=1.0).contains(fraction));
      }
      if c.users_count > 0 {
        prop_assert_eq!(c.day(0), Some(1.0));
      } else {
        prop_assert!(c.retention.is_empty());
      }
    }
  }

  #[test]
  fn daypart_grid_conserves_event_values(
    events in prop::collection::vec((0..(60 * 24 * 30_i64), 1..1000_u64), 1..200),
  ) {
    let events: Vec<DeliveryEvent> = events
      .into_iter()
      .map(|(minutes, value)| DeliveryEvent {
        value,
        ..DeliveryEvent::unit(DeliveryMetric::Impression, base() + Duration::minutes(minutes))
      })
      .collect();
    let window = calendar().trailing_window(NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(), 60);
    let heatmap = daypart::bucket(&events, None, window, &calendar());

    let expected: u64 = events.iter().map(|e| e.value).sum();
    prop_assert_eq!(heatmap.grid_sum(), expected);
    prop_assert_eq!(heatmap.total, expected);
    prop_assert!(heatmap.grid.iter().flatten().all(|&cell| cell <= heatmap.max_value));
  }
}
