//! [`SqliteEventStore`]: the SQLite implementation of [`EventStore`].

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use uuid::Uuid;

use playlens_core::{
  content::ContentItem,
  delivery::DeliveryEvent,
  session::{Round, Session},
  store::{ContentQuery, DeliveryQuery, EventStore, RoundQuery, SessionQuery},
};

use crate::{
  encode::{
    encode_dt, encode_strings, encode_uuid, RawContentItem, RawDeliveryEvent, RawRound,
    RawSession,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Filters ─────────────────────────────────────────────────────────────────

/// A `WHERE` clause assembled from optional conditions, with positional
/// parameters in the order the conditions were added.
#[derive(Default)]
struct Filter {
  conds:  Vec<String>,
  params: Vec<Value>,
}

impl Filter {
  fn eq(&mut self, column: &str, value: Option<String>) {
    if let Some(v) = value {
      self.conds.push(format!("{column} = ?"));
      self.params.push(Value::Text(v));
    }
  }

  fn at_least(&mut self, column: &str, at: Option<DateTime<Utc>>) {
    if let Some(at) = at {
      self.conds.push(format!("{column} >= ?"));
      self.params.push(Value::Text(encode_dt(at)));
    }
  }

  fn before(&mut self, column: &str, at: Option<DateTime<Utc>>) {
    if let Some(at) = at {
      self.conds.push(format!("{column} < ?"));
      self.params.push(Value::Text(encode_dt(at)));
    }
  }

  /// `ids` must be non-empty; see [`id_chunks`].
  fn one_of(&mut self, column: &str, ids: &[Uuid]) {
    let marks = vec!["?"; ids.len()].join(", ");
    self.conds.push(format!("{column} IN ({marks})"));
    self
      .params
      .extend(ids.iter().map(|id| Value::Text(encode_uuid(*id))));
  }

  fn sql(&self, select: &str, order_by: &str) -> String {
    if self.conds.is_empty() {
      format!("{select} ORDER BY {order_by}")
    } else {
      format!("{select} WHERE {} ORDER BY {order_by}", self.conds.join(" AND "))
    }
  }
}

/// Most ids bound in one `IN (...)` list. SQLite rejects statements with
/// more than 32766 variables, so longer lists are queried in chunks.
const MAX_IN_LIST: usize = 500;

/// Split an optional id filter into per-statement chunks. `None` inside the
/// result means "no id filter"; an empty result means nothing can match.
fn id_chunks(ids: Option<&[Uuid]>) -> Vec<Option<&[Uuid]>> {
  match ids {
    None => vec![None],
    Some(ids) => ids.chunks(MAX_IN_LIST).map(Some).collect(),
  }
}

type RowResult<R> = std::result::Result<R, rusqlite::Error>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Playlens event store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
///
/// Rows that cannot be decoded (bad UUIDs, unknown enum names, unparsable
/// timestamps, mistyped columns) are skipped with a warning rather than
/// failing the query. [`SqliteEventStore::skipped_rows`] counts them.
#[derive(Clone)]
pub struct SqliteEventStore {
  conn:         tokio_rusqlite::Connection,
  skipped_rows: Arc<AtomicU64>,
}

impl SqliteEventStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, skipped_rows: Arc::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, skipped_rows: Arc::default() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Total rows skipped as undecodable since the store was opened.
  pub fn skipped_rows(&self) -> u64 { self.skipped_rows.load(Ordering::Relaxed) }

  /// Run one `SELECT`, keeping each row's read result separate so a single
  /// mistyped column cannot fail the statement.
  async fn select<R>(
    &self,
    sql: String,
    params: Vec<Value>,
    from_row: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
  ) -> Result<Vec<RowResult<R>>>
  where
    R: Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = Vec::new();
        for row in stmt.query_map(rusqlite::params_from_iter(params), from_row)? {
          // Engine failures abort the query; anything else is a bad row.
          if let Err(e @ rusqlite::Error::SqliteFailure(..)) = row {
            return Err(e.into());
          }
          rows.push(row);
        }
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// Decode raw rows, dropping (and counting) the ones that fail.
  fn decode_rows<R, T>(
    &self,
    table: &'static str,
    rows: Vec<RowResult<R>>,
    decode: impl Fn(R) -> Result<T>,
  ) -> Vec<T> {
    let mut skipped = 0_u64;
    let decoded: Vec<T> = rows
      .into_iter()
      .filter_map(|row| {
        match row.map_err(|e| Error::Database(e.into())).and_then(&decode) {
          Ok(value) => Some(value),
          Err(e) => {
            tracing::debug!(table, error = %e, "skipping undecodable row");
            skipped += 1;
            None
          }
        }
      })
      .collect();

    if skipped > 0 {
      self.skipped_rows.fetch_add(skipped, Ordering::Relaxed);
      tracing::warn!(table, skipped, "skipped undecodable rows");
    }
    decoded
  }

  // ── Ingestion ─────────────────────────────────────────────────────────────

  pub async fn insert_session(&self, session: &Session) -> Result<()> {
    self.insert_sessions(std::slice::from_ref(session)).await
  }

  /// Insert many sessions in one transaction.
  pub async fn insert_sessions(&self, sessions: &[Session]) -> Result<()> {
    let rows: Vec<_> = sessions
      .iter()
      .map(|s| {
        (
          encode_uuid(s.session_id),
          encode_uuid(s.user_id),
          s.game_key.clone(),
          s.device_id.clone(),
          encode_dt(s.started_at),
          s.ended_at.map(encode_dt),
        )
      })
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO sessions (
               session_id, user_id, game_key, device_id, started_at, ended_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for (id, user, game_key, device_id, started, ended) in rows {
            stmt.execute(rusqlite::params![id, user, game_key, device_id, started, ended])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Mark a running session as completed at `at`.
  pub async fn end_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(session_id);
    let at_str = encode_dt(at);

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE sessions SET ended_at = ?2 WHERE session_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(n)
      })
      .await?;

    if updated == 0 {
      return Err(Error::SessionNotFound(session_id));
    }
    Ok(())
  }

  /// Record a round. The session is not required to exist: upstream writers
  /// may emit rounds before (or without) their session.
  pub async fn insert_round(&self, round: &Round) -> Result<()> {
    self.insert_rounds(std::slice::from_ref(round)).await
  }

  /// Insert many rounds in one transaction.
  pub async fn insert_rounds(&self, rounds: &[Round]) -> Result<()> {
    let rows = rounds
      .iter()
      .map(|r| {
        Ok((
          encode_uuid(r.round_id),
          r.session_id.map(encode_uuid),
          r.item_id.map(encode_uuid),
          encode_dt(r.started_at),
          r.ended_at.map(encode_dt),
          r.duration_seconds,
          r.decision.clone(),
          r.outcome.clone(),
          r.winners.as_deref().map(encode_strings).transpose()?,
        ))
      })
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO rounds (
               round_id, session_id, item_id, started_at, ended_at,
               duration_seconds, decision, outcome, winners
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          )?;
          for (id, session, item, started, ended, duration, decision, outcome, winners) in rows {
            stmt.execute(rusqlite::params![
              id, session, item, started, ended, duration, decision, outcome, winners,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a catalog item, or replace the stored copy if it already exists.
  pub async fn upsert_content_item(&self, item: &ContentItem) -> Result<()> {
    let id_str     = encode_uuid(item.item_id);
    let game_key   = item.game_key.clone();
    let status_str = item.status.to_string();
    let active     = item.active;
    let tags_str   = encode_strings(&item.tags)?;
    let difficulty = item.difficulty.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO content_items (item_id, game_key, status, active, tags, difficulty)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (item_id) DO UPDATE SET
             game_key   = excluded.game_key,
             status     = excluded.status,
             active     = excluded.active,
             tags       = excluded.tags,
             difficulty = excluded.difficulty",
          rusqlite::params![id_str, game_key, status_str, active, tags_str, difficulty],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn insert_delivery_event(&self, event: &DeliveryEvent) -> Result<()> {
    let id_str       = encode_uuid(event.event_id);
    let campaign_str = event.campaign_id.map(encode_uuid);
    let metric_str   = event.metric.to_string();
    let at_str       = encode_dt(event.occurred_at);
    let value        = i64::try_from(event.value).map_err(|_| Error::UnknownValue {
      column: "delivery_events.value",
      value:  event.value.to_string(),
    })?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO delivery_events (event_id, campaign_id, metric, occurred_at, value)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, campaign_str, metric_str, at_str, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteEventStore {
  type Error = Error;

  async fn sessions(&self, query: &SessionQuery) -> Result<Vec<Session>> {
    let chunks = id_chunks(query.session_ids.as_deref());
    let chunked = chunks.len() > 1;

    let mut rows = Vec::new();
    for ids in chunks {
      let mut filter = Filter::default();
      filter.at_least("started_at", query.started_from);
      filter.before("started_at", query.started_before);
      filter.eq("game_key", query.game_key.clone());
      if let Some(ids) = ids {
        filter.one_of("session_id", ids);
      }
      let sql = filter.sql(
        &format!("SELECT {} FROM sessions", RawSession::COLUMNS),
        "started_at, session_id",
      );
      rows.extend(self.select(sql, filter.params, RawSession::from_row).await?);
    }

    tracing::debug!(rows = rows.len(), "loaded sessions");
    let mut sessions = self.decode_rows("sessions", rows, RawSession::into_session);
    if chunked {
      sessions.sort_by_key(|s| (s.started_at, s.session_id));
    }
    Ok(sessions)
  }

  async fn rounds(&self, query: &RoundQuery) -> Result<Vec<Round>> {
    let chunks = id_chunks(query.session_ids.as_deref());
    let chunked = chunks.len() > 1;

    let mut rows = Vec::new();
    for ids in chunks {
      let mut filter = Filter::default();
      filter.at_least("started_at", query.started_from);
      filter.before("started_at", query.started_before);
      if let Some(ids) = ids {
        filter.one_of("session_id", ids);
      }
      let sql = filter.sql(
        &format!("SELECT {} FROM rounds", RawRound::COLUMNS),
        "started_at, round_id",
      );
      rows.extend(self.select(sql, filter.params, RawRound::from_row).await?);
    }

    tracing::debug!(rows = rows.len(), "loaded rounds");
    let mut rounds = self.decode_rows("rounds", rows, RawRound::into_round);
    if chunked {
      rounds.sort_by_key(|r| (r.started_at, r.round_id));
    }
    Ok(rounds)
  }

  async fn content_items(&self, query: &ContentQuery) -> Result<Vec<ContentItem>> {
    let mut filter = Filter::default();
    filter.eq("game_key", query.game_key.clone());
    let sql = filter.sql(
      &format!("SELECT {} FROM content_items", RawContentItem::COLUMNS),
      "item_id",
    );

    let rows = self.select(sql, filter.params, RawContentItem::from_row).await?;
    Ok(self.decode_rows("content_items", rows, RawContentItem::into_item))
  }

  async fn delivery_events(&self, query: &DeliveryQuery) -> Result<Vec<DeliveryEvent>> {
    let mut filter = Filter::default();
    filter.at_least("occurred_at", query.occurred_from);
    filter.before("occurred_at", query.occurred_before);
    filter.eq("metric", query.metric.map(|m| m.to_string()));
    filter.eq("campaign_id", query.campaign_id.map(encode_uuid));
    let sql = filter.sql(
      &format!("SELECT {} FROM delivery_events", RawDeliveryEvent::COLUMNS),
      "occurred_at, event_id",
    );

    let rows = self.select(sql, filter.params, RawDeliveryEvent::from_row).await?;
    tracing::debug!(rows = rows.len(), "loaded delivery events");
    Ok(self.decode_rows("delivery_events", rows, RawDeliveryEvent::into_event))
  }
}

#[cfg(test)]
impl SqliteEventStore {
  /// Run raw SQL, for writing rows the typed ingestion API cannot produce.
  pub(crate) async fn execute_sql(&self, sql: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
