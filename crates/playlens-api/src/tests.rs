//! Router tests over an in-memory SQLite store.

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{DateTime, TimeZone as _, Utc};
use playlens_analytics::AnalyticsService;
use playlens_core::{
  calendar::ReportingCalendar,
  content::ContentItem,
  delivery::{DeliveryEvent, DeliveryMetric},
  session::{Round, Session},
  store::{ContentQuery, DeliveryQuery, EventStore, RoundQuery, SessionQuery},
};
use playlens_store_sqlite::SqliteEventStore;
use serde_json::Value;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{AppState, SnapshotCache, metrics_router};

fn at(d: u32, h: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap() }

fn calendar() -> ReportingCalendar { ReportingCalendar::from_name("UTC").unwrap() }

fn session(user: Uuid, started_at: DateTime<Utc>) -> Session {
  Session {
    session_id: Uuid::new_v4(),
    user_id: user,
    game_key: "quiz".into(),
    device_id: None,
    started_at,
    ended_at: None,
  }
}

async fn seeded_store() -> (SqliteEventStore, Uuid) {
  let store = SqliteEventStore::open_in_memory().await.unwrap();
  let user = Uuid::new_v4();
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

  let s = session(user, at(5, 9));
  store.insert_session(&s).await.unwrap();
  for (i, item) in [a, b, a].into_iter().enumerate() {
    let round = Round::new(s.session_id, item, at(5, 9) + chrono::Duration::minutes(i as i64));
    store.insert_round(&round).await.unwrap();
  }
  store
    .insert_delivery_event(&DeliveryEvent::unit(DeliveryMetric::Click, at(5, 14)))
    .await
    .unwrap();
  (store, user)
}

fn app<S: EventStore + 'static>(store: S, cache: SnapshotCache) -> Router {
  let service = AnalyticsService::new(Arc::new(store), calendar());
  metrics_router(AppState::new(service).with_cache(cache))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
  get_with(app, uri, None).await
}

async fn get_with(
  app:           Router,
  uri:           &str,
  if_none_match: Option<&str>,
) -> (StatusCode, Option<String>, Value) {
  let mut builder = Request::builder().method("GET").uri(uri);
  if let Some(tag) = if_none_match {
    builder = builder.header(header::IF_NONE_MATCH, tag);
  }
  let resp = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
  let status = resp.status();
  let etag = resp
    .headers()
    .get(header::ETAG)
    .map(|v| v.to_str().unwrap().to_owned());
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, etag, json)
}

// ─── Routes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_ok() {
  let (store, _) = seeded_store().await;
  let (status, _, body) = get(app(store, SnapshotCache::default()), "/health").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn quality_snapshot_is_camel_case() {
  let (store, _) = seeded_store().await;
  let (status, etag, body) =
    get(app(store, SnapshotCache::default()), "/metrics/quality?date=2024-03-05").await;

  assert_eq!(status, StatusCode::OK);
  assert!(etag.is_some());
  assert_eq!(body["referenceDate"], "2024-03-05");
  assert_eq!(body["totalSessions"], 1);
  assert_eq!(body["antiRepetitionRate"], 0.0);
  assert_eq!(body["liveContentCompliance"], 100.0);
  assert!(body.get("upstreamError").is_none());
}

#[tokio::test]
async fn exposure_for_user_reports_seen_counts() {
  let (store, user) = seeded_store().await;
  let uri = format!("/metrics/exposure/users/{user}?date=2024-03-05&days=1&threshold=2");
  let (status, _, body) = get(app(store, SnapshotCache::default()), &uri).await;

  assert_eq!(status, StatusCode::OK);
  let counts = body["perUserItemCounts"].as_array().unwrap();
  assert_eq!(counts.len(), 2);
  assert_eq!(body["overexposedItems"].as_array().unwrap().len(), 1);
  assert_eq!(body["stats"]["totalUsers"], 1);
}

#[tokio::test]
async fn exposure_for_user_narrows_by_game() {
  let (store, user) = seeded_store().await;
  let mut trivia = session(user, at(5, 11));
  trivia.game_key = "trivia".into();
  store.insert_session(&trivia).await.unwrap();
  let trivia_item = Uuid::new_v4();
  store
    .insert_round(&Round::new(trivia.session_id, trivia_item, at(5, 11)))
    .await
    .unwrap();
  let router = app(store, SnapshotCache::default());

  let all = format!("/metrics/exposure/users/{user}?date=2024-03-05&days=1");
  let (_, _, body) = get(router.clone(), &all).await;
  assert_eq!(body["perUserItemCounts"].as_array().unwrap().len(), 3);

  let narrowed = format!("{all}&game_key=trivia");
  let (status, _, body) = get(router, &narrowed).await;
  assert_eq!(status, StatusCode::OK);
  let counts = body["perUserItemCounts"].as_array().unwrap();
  assert_eq!(counts.len(), 1);
  assert_eq!(counts[0]["itemId"], trivia_item.to_string());
}

#[tokio::test]
async fn daypart_buckets_in_reporting_zone() {
  let (store, _) = seeded_store().await;
  let (status, _, body) = get(
    app(store, SnapshotCache::default()),
    "/metrics/daypart?metric=click&date=2024-03-05&days=7",
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  // 2024-03-05 is a Tuesday.
  assert_eq!(body["grid"][1][14], 1);
  assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn dau_and_cohorts_share_the_window() {
  let (store, _) = seeded_store().await;
  let router = app(store, SnapshotCache::default());

  let (_, _, dau) = get(router.clone(), "/metrics/dau?date=2024-03-05&days=3").await;
  assert_eq!(dau["days"].as_array().unwrap().len(), 3);
  assert_eq!(dau["days"][2]["newUsers"], 1);

  let (_, _, cohorts) = get(router, "/metrics/cohorts?date=2024-03-05&days=3").await;
  assert_eq!(cohorts["cohorts"].as_array().unwrap().len(), 3);
  assert_eq!(cohorts["cohorts"][2]["usersCount"], 1);
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn bad_parameters_are_400_with_json_error() {
  let (store, _) = seeded_store().await;
  let router = app(store, SnapshotCache::default());

  for uri in [
    "/metrics/dau?days=0",
    "/metrics/cohorts?days=367",
    "/metrics/daypart?metric=views",
    "/metrics/quality?date=yesterday",
    "/metrics/exposure?threshold=0",
  ] {
    let (status, _, body) = get(router.clone(), uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    assert!(body["error"].is_string(), "{uri}");
  }
}

// ─── ETag / caching ──────────────────────────────────────────────────────────

#[tokio::test]
async fn matching_if_none_match_is_304() {
  let (store, _) = seeded_store().await;
  let router = app(store, SnapshotCache::default());
  let uri = "/metrics/repetition?date=2024-03-05";

  let (_, etag, _) = get(router.clone(), uri).await;
  let etag = etag.unwrap();

  let (status, again, body) = get_with(router.clone(), uri, Some(&etag)).await;
  assert_eq!(status, StatusCode::NOT_MODIFIED);
  assert_eq!(again.as_deref(), Some(etag.as_str()));
  assert_eq!(body, Value::Null);

  let (status, _, _) = get_with(router, uri, Some("\"stale\"")).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cached_snapshot_hides_new_rows_until_expiry() {
  let (store, _) = seeded_store().await;
  let writer = store.clone();
  let router = app(store, SnapshotCache::new(Duration::from_secs(120)));
  let uri = "/metrics/repetition?date=2024-03-05";

  let (_, first, _) = get(router.clone(), uri).await;
  writer.insert_session(&session(Uuid::new_v4(), at(5, 12))).await.unwrap();
  let (_, second, body) = get(router, uri).await;

  assert_eq!(first, second);
  assert_eq!(body["totalSessions"], 1);
}

#[tokio::test]
async fn disabled_cache_sees_new_rows() {
  let (store, _) = seeded_store().await;
  let writer = store.clone();
  let router = app(store, SnapshotCache::new(Duration::ZERO));
  let uri = "/metrics/repetition?date=2024-03-05";

  get(router.clone(), uri).await;
  writer.insert_session(&session(Uuid::new_v4(), at(5, 12))).await.unwrap();
  let (_, _, body) = get(router, uri).await;

  assert_eq!(body["totalSessions"], 2);
}

// ─── Degraded store ──────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
struct Refused;

struct DownStore;

impl EventStore for DownStore {
  type Error = Refused;

  async fn sessions(&self, _: &SessionQuery) -> Result<Vec<Session>, Refused> { Err(Refused) }

  async fn rounds(&self, _: &RoundQuery) -> Result<Vec<Round>, Refused> { Err(Refused) }

  async fn content_items(&self, _: &ContentQuery) -> Result<Vec<ContentItem>, Refused> {
    Err(Refused)
  }

  async fn delivery_events(&self, _: &DeliveryQuery) -> Result<Vec<DeliveryEvent>, Refused> {
    Err(Refused)
  }
}

#[tokio::test]
async fn store_outage_serves_defaults_with_reason() {
  let router = app(DownStore, SnapshotCache::default());
  let (status, _, body) = get(router, "/metrics/quality?date=2024-03-05").await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["antiRepetitionRate"], 100.0);
  assert_eq!(body["liveContentCompliance"], 100.0);
  assert_eq!(body["contentCoverage"], 0.0);
  assert_eq!(body["upstreamError"], "connection refused");
}
