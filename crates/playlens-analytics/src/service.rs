//! [`AnalyticsService`]: fetch inputs from an [`EventStore`] and run the
//! calculators over them.
//!
//! A failed store query never fails a metric. The service logs the failure,
//! runs the calculator over empty input to obtain its documented zero state,
//! and tags the result with the upstream error so callers that care can tell
//! "no activity" apart from "query failed".

use std::{collections::HashSet, sync::Arc};

use chrono::NaiveDate;
use playlens_core::{
  calendar::{ReportingCalendar, TimeWindow},
  content::ContentItem,
  delivery::DeliveryMetric,
  session::{Round, Session},
  store::{ContentQuery, DeliveryQuery, EventStore, RoundQuery, SessionQuery},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  cohort::{self, CohortReport},
  coverage::{self, CoverageReport},
  dau::{self, DauReport},
  daypart::{self, DaypartHeatmap},
  exposure::{self, DEFAULT_OVEREXPOSURE_THRESHOLD, ExposureReport},
  quality::{self, QualityMetrics},
  repetition::{self, RepetitionReport},
};

// ─── Computed ────────────────────────────────────────────────────────────────

/// A metric value plus, when the store query failed, the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Computed<T> {
  #[serde(flatten)]
  pub value:          T,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub upstream_error: Option<String>,
}

impl<T> Computed<T> {
  pub fn fresh(value: T) -> Self { Self { value, upstream_error: None } }

  pub fn degraded(value: T, reason: String) -> Self {
    Self { value, upstream_error: Some(reason) }
  }

  pub fn is_degraded(&self) -> bool { self.upstream_error.is_some() }

  /// Transform the value, keeping the upstream error (if any).
  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Computed<U> {
    Computed { value: f(self.value), upstream_error: self.upstream_error }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Sessions and rounds relevant to one window.
struct Played {
  sessions: Vec<Session>,
  rounds:   Vec<Round>,
}

pub struct AnalyticsService<S> {
  store:     Arc<S>,
  calendar:  ReportingCalendar,
  threshold: u32,
}

impl<S> Clone for AnalyticsService<S> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      calendar:  self.calendar,
      threshold: self.threshold,
    }
  }
}

impl<S: EventStore> AnalyticsService<S> {
  pub fn new(store: Arc<S>, calendar: ReportingCalendar) -> Self {
    Self { store, calendar, threshold: DEFAULT_OVEREXPOSURE_THRESHOLD }
  }

  /// Override the overexposure threshold used when a request gives none.
  pub fn with_threshold(mut self, threshold: u32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn calendar(&self) -> &ReportingCalendar { &self.calendar }

  pub fn default_threshold(&self) -> u32 { self.threshold }

  // ── Metrics ───────────────────────────────────────────────────────────────

  pub async fn exposure(
    &self,
    window: TimeWindow,
    game_key: Option<&str>,
    threshold: Option<u32>,
  ) -> Computed<ExposureReport> {
    let threshold = threshold.unwrap_or(self.threshold);
    let result = self
      .played_in(window, game_key)
      .await
      .map(|p| exposure::aggregate(&p.sessions, &p.rounds, window, threshold));
    Self::settle("exposure", result, || {
      exposure::aggregate(&[], &[], window, threshold)
    })
  }

  pub async fn repetition(
    &self,
    date: NaiveDate,
    game_key: Option<&str>,
  ) -> Computed<RepetitionReport> {
    let day = self.calendar.day_window(date);
    let result = self
      .played_in(day, game_key)
      .await
      .map(|p| repetition::compute(&p.sessions, &p.rounds, day));
    Self::settle("repetition", result, || repetition::compute(&[], &[], day))
  }

  pub async fn coverage(
    &self,
    date: NaiveDate,
    game_key: Option<&str>,
  ) -> Computed<CoverageReport> {
    let day = self.calendar.day_window(date);
    let result = self
      .catalog_and_play(day, game_key)
      .await
      .map(|(catalog, p)| coverage::compute(&catalog, &p.sessions, &p.rounds, day));
    Self::settle("coverage", result, || coverage::compute(&[], &[], &[], day))
  }

  pub async fn quality(
    &self,
    date: NaiveDate,
    game_key: Option<&str>,
    threshold: Option<u32>,
  ) -> Computed<QualityMetrics> {
    let threshold = threshold.unwrap_or(self.threshold);
    let day = self.calendar.day_window(date);
    let calendar = self.calendar;
    let result = self
      .catalog_and_play(day, game_key)
      .await
      .map(|(catalog, p)| {
        quality::compute(&calendar, date, &catalog, &p.sessions, &p.rounds, threshold)
      });
    Self::settle("quality", result, || {
      quality::compute(&calendar, date, &[], &[], &[], threshold)
    })
  }

  pub async fn cohorts(
    &self,
    date: NaiveDate,
    days: u32,
    game_key: Option<&str>,
  ) -> Computed<CohortReport> {
    let calendar = self.calendar;
    let result = self
      .history_until(date, game_key)
      .await
      .map(|sessions| cohort::compute(&sessions, &calendar, date, days));
    Self::settle("cohorts", result, || cohort::compute(&[], &calendar, date, days))
  }

  pub async fn daily_active_users(
    &self,
    date: NaiveDate,
    days: u32,
    game_key: Option<&str>,
  ) -> Computed<DauReport> {
    let calendar = self.calendar;
    let result = self
      .history_until(date, game_key)
      .await
      .map(|sessions| dau::compute(&sessions, &calendar, date, days));
    Self::settle("dau", result, || dau::compute(&[], &calendar, date, days))
  }

  pub async fn daypart(
    &self,
    window: TimeWindow,
    metric: Option<DeliveryMetric>,
    campaign_id: Option<Uuid>,
  ) -> Computed<DaypartHeatmap> {
    let query = DeliveryQuery {
      occurred_from: Some(window.start),
      occurred_before: Some(window.end),
      metric,
      campaign_id,
    };
    let calendar = self.calendar;
    let result = self
      .store
      .delivery_events(&query)
      .await
      .map(|events| daypart::bucket(&events, metric, window, &calendar));
    Self::settle("daypart", result, || {
      daypart::bucket(&[], metric, window, &calendar)
    })
  }

  // ── Fetching ──────────────────────────────────────────────────────────────

  /// Rounds played in `window`, every round of the sessions started in it,
  /// and all sessions those rounds reference.
  ///
  /// With a game filter, rounds that cannot be tied to a session of that
  /// game are dropped; without one they are left for the calculators to skip.
  async fn played_in(
    &self,
    window: TimeWindow,
    game_key: Option<&str>,
  ) -> Result<Played, S::Error> {
    let mut sessions = self.store.sessions(&SessionQuery::in_window(window)).await?;
    let started: Vec<Uuid> = sessions.iter().map(|s| s.session_id).collect();

    let mut rounds = self.store.rounds(&RoundQuery::in_window(window)).await?;
    let mut round_ids: HashSet<Uuid> = rounds.iter().map(|r| r.round_id).collect();
    for round in self.store.rounds(&RoundQuery::for_sessions(started)).await? {
      if round_ids.insert(round.round_id) {
        rounds.push(round);
      }
    }

    let known: HashSet<Uuid> = sessions.iter().map(|s| s.session_id).collect();
    let missing: Vec<Uuid> = rounds
      .iter()
      .filter_map(|r| r.session_id)
      .filter(|id| !known.contains(id))
      .collect::<HashSet<_>>()
      .into_iter()
      .collect();
    if !missing.is_empty() {
      let query = SessionQuery { session_ids: Some(missing), ..SessionQuery::default() };
      sessions.extend(self.store.sessions(&query).await?);
    }

    if let Some(game) = game_key {
      sessions.retain(|s| s.game_key == game);
      let kept: HashSet<Uuid> = sessions.iter().map(|s| s.session_id).collect();
      rounds.retain(|r| r.session_id.is_some_and(|id| kept.contains(&id)));
    }

    tracing::debug!(
      sessions = sessions.len(),
      rounds = rounds.len(),
      "fetched play records"
    );
    Ok(Played { sessions, rounds })
  }

  async fn catalog_and_play(
    &self,
    window: TimeWindow,
    game_key: Option<&str>,
  ) -> Result<(Vec<ContentItem>, Played), S::Error> {
    let query = ContentQuery { game_key: game_key.map(str::to_owned) };
    let catalog = self.store.content_items(&query).await?;
    let played = self.played_in(window, game_key).await?;
    Ok((catalog, played))
  }

  /// Every session started up to the end of `date`.
  async fn history_until(
    &self,
    date: NaiveDate,
    game_key: Option<&str>,
  ) -> Result<Vec<Session>, S::Error> {
    let end = self.calendar.day_window(date).end;
    let query = SessionQuery::history_until(end).with_game(game_key.map(str::to_owned));
    let sessions = self.store.sessions(&query).await?;
    tracing::debug!(sessions = sessions.len(), "fetched session history");
    Ok(sessions)
  }

  fn settle<T>(
    metric: &'static str,
    result: Result<T, S::Error>,
    empty: impl FnOnce() -> T,
  ) -> Computed<T> {
    match result {
      Ok(value) => Computed::fresh(value),
      Err(e) => {
        tracing::warn!(metric, error = %e, "event store query failed; serving empty-state metric");
        Computed::degraded(empty(), e.to_string())
      }
    }
  }
}
