//! Handlers for `/metrics/*` endpoints.
//!
//! | Path | Parameters |
//! |------|------------|
//! | `/metrics/quality` | `date`, `game_key`, `threshold` |
//! | `/metrics/exposure` | `date`, `days`, `game_key`, `threshold` |
//! | `/metrics/exposure/users/{user_id}` | `date`, `days`, `game_key`, `threshold` |
//! | `/metrics/repetition` | `date`, `game_key` |
//! | `/metrics/coverage` | `date`, `game_key` |
//! | `/metrics/cohorts` | `date`, `days`, `game_key` |
//! | `/metrics/dau` | `date`, `days`, `game_key` |
//! | `/metrics/daypart` | `metric`, `date`, `days`, `campaign_id` |
//!
//! Every response carries an `ETag`; a request whose `If-None-Match` lists
//! it gets an empty `304`.

use std::{future::Future, sync::Arc};

use axum::{
  body::Bytes,
  extract::{Path, Query, State, rejection::QueryRejection},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use playlens_analytics::Computed;
use playlens_core::store::EventStore;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  AppState,
  cache::SnapshotCache,
  error::ApiError,
  etag::{compute_etag, matches_if_none_match},
  params::MetricParams,
};

type Params = Result<Query<MetricParams>, QueryRejection>;

// ─── Day metrics ─────────────────────────────────────────────────────────────

/// `GET /metrics/quality`
pub async fn quality<S: EventStore + 'static>(
  State(state): State<Arc<AppState<S>>>,
  headers: HeaderMap,
  query: Params,
) -> Result<Response, ApiError> {
  let Query(params) = query?;
  let date = state.reference_date(&params);
  let game = params.game_key();
  let threshold = params.threshold()?;

  let key = format!("quality:{date}:{game:?}:{threshold:?}");
  let compute = state.service.quality(date, game, threshold);
  respond(&state.cache, key, &headers, compute).await
}

/// `GET /metrics/repetition`
pub async fn repetition<S: EventStore + 'static>(
  State(state): State<Arc<AppState<S>>>,
  headers: HeaderMap,
  query: Params,
) -> Result<Response, ApiError> {
  let Query(params) = query?;
  let date = state.reference_date(&params);
  let game = params.game_key();

  let key = format!("repetition:{date}:{game:?}");
  respond(&state.cache, key, &headers, state.service.repetition(date, game)).await
}

/// `GET /metrics/coverage`
pub async fn coverage<S: EventStore + 'static>(
  State(state): State<Arc<AppState<S>>>,
  headers: HeaderMap,
  query: Params,
) -> Result<Response, ApiError> {
  let Query(params) = query?;
  let date = state.reference_date(&params);
  let game = params.game_key();

  let key = format!("coverage:{date}:{game:?}");
  respond(&state.cache, key, &headers, state.service.coverage(date, game)).await
}

// ─── Exposure ────────────────────────────────────────────────────────────────

/// `GET /metrics/exposure`
pub async fn exposure<S: EventStore + 'static>(
  State(state): State<Arc<AppState<S>>>,
  headers: HeaderMap,
  query: Params,
) -> Result<Response, ApiError> {
  let Query(params) = query?;
  let date = state.reference_date(&params);
  let days = params.days_or(state.window_days)?;
  let game = params.game_key();
  let threshold = params.threshold()?;

  let window = state.service.calendar().trailing_window(date, days);
  let key = format!("exposure:{date}:{days}:{game:?}:{threshold:?}");
  let compute = state.service.exposure(window, game, threshold);
  respond(&state.cache, key, &headers, compute).await
}

/// `GET /metrics/exposure/users/{user_id}`
///
/// The per-user view is cut from the all-user report, so the overexposed
/// item set it reports is the user's own.
pub async fn exposure_for_user<S: EventStore + 'static>(
  State(state): State<Arc<AppState<S>>>,
  Path(user_id): Path<Uuid>,
  headers: HeaderMap,
  query: Params,
) -> Result<Response, ApiError> {
  let Query(params) = query?;
  let date = state.reference_date(&params);
  let days = params.days_or(state.window_days)?;
  let game = params.game_key();
  let threshold = params.threshold()?;

  let window = state.service.calendar().trailing_window(date, days);
  let key = format!("exposure-user:{user_id}:{date}:{days}:{game:?}:{threshold:?}");
  let service = &state.service;
  let compute = async move {
    service
      .exposure(window, game, threshold)
      .await
      .map(|report| report.for_user(user_id))
  };
  respond(&state.cache, key, &headers, compute).await
}

// ─── Trailing windows ────────────────────────────────────────────────────────

/// `GET /metrics/cohorts`
pub async fn cohorts<S: EventStore + 'static>(
  State(state): State<Arc<AppState<S>>>,
  headers: HeaderMap,
  query: Params,
) -> Result<Response, ApiError> {
  let Query(params) = query?;
  let date = state.reference_date(&params);
  let days = params.days_or(state.window_days)?;
  let game = params.game_key();

  let key = format!("cohorts:{date}:{days}:{game:?}");
  respond(&state.cache, key, &headers, state.service.cohorts(date, days, game)).await
}

/// `GET /metrics/dau`
pub async fn dau<S: EventStore + 'static>(
  State(state): State<Arc<AppState<S>>>,
  headers: HeaderMap,
  query: Params,
) -> Result<Response, ApiError> {
  let Query(params) = query?;
  let date = state.reference_date(&params);
  let days = params.days_or(state.window_days)?;
  let game = params.game_key();

  let key = format!("dau:{date}:{days}:{game:?}");
  let compute = state.service.daily_active_users(date, days, game);
  respond(&state.cache, key, &headers, compute).await
}

/// `GET /metrics/daypart`
pub async fn daypart<S: EventStore + 'static>(
  State(state): State<Arc<AppState<S>>>,
  headers: HeaderMap,
  query: Params,
) -> Result<Response, ApiError> {
  let Query(params) = query?;
  let date = state.reference_date(&params);
  let days = params.days_or(state.window_days)?;
  let metric = params.metric()?;
  let campaign_id = params.campaign_id;

  let window = state.service.calendar().trailing_window(date, days);
  let key = format!("daypart:{date}:{days}:{metric:?}:{campaign_id:?}");
  let compute = state.service.daypart(window, metric, campaign_id);
  respond(&state.cache, key, &headers, compute).await
}

// ─── Response helper ─────────────────────────────────────────────────────────

/// Serve `key` from the cache, or run `compute` and cache the result.
///
/// Degraded values are served but never cached, so a recovered store shows
/// up on the next request.
async fn respond<T: Serialize>(
  cache:   &SnapshotCache,
  key:     String,
  headers: &HeaderMap,
  compute: impl Future<Output = Computed<T>>,
) -> Result<Response, ApiError> {
  let (body, etag) = match cache.get(&key).await {
    Some(hit) => {
      tracing::debug!(%key, "snapshot cache hit");
      (hit.body, hit.etag)
    }
    None => {
      let computed = compute.await;
      let body = Bytes::from(serde_json::to_vec(&computed)?);
      let etag = compute_etag(&body);
      if !computed.is_degraded() {
        cache.insert(key, body.clone(), etag.clone()).await;
      }
      (body, etag)
    }
  };

  if matches_if_none_match(headers, &etag) {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
  }

  Ok(
    (
      StatusCode::OK,
      [
        (header::CONTENT_TYPE, "application/json".to_owned()),
        (header::ETAG, etag),
      ],
      body,
    )
      .into_response(),
  )
}
