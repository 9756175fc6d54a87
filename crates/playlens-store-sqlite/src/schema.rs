//! SQL schema for the Playlens SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// All timestamps are fixed-width RFC 3339 UTC strings (microsecond
/// precision, `Z` suffix), so lexical comparison in SQL matches
/// chronological order.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS sessions (
    session_id  TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    game_key    TEXT NOT NULL,
    device_id   TEXT,
    started_at  TEXT NOT NULL,
    ended_at    TEXT
);

-- session_id and item_id are nullable on purpose: upstream writers do not
-- enforce them, and analytics must tolerate (and skip) such rows.
CREATE TABLE IF NOT EXISTS rounds (
    round_id          TEXT PRIMARY KEY,
    session_id        TEXT,
    item_id           TEXT,
    started_at        TEXT NOT NULL,
    ended_at          TEXT,
    duration_seconds  REAL,
    decision          TEXT,
    outcome           TEXT,
    winners           TEXT             -- JSON array of strings or NULL
);

CREATE TABLE IF NOT EXISTS content_items (
    item_id     TEXT PRIMARY KEY,
    game_key    TEXT NOT NULL,
    status      TEXT NOT NULL,       -- 'draft' | 'in_review' | 'approved' | 'live' | 'paused' | 'archived'
    active      INTEGER NOT NULL DEFAULT 1,
    tags        TEXT NOT NULL DEFAULT '[]',
    difficulty  TEXT
);

CREATE TABLE IF NOT EXISTS delivery_events (
    event_id     TEXT PRIMARY KEY,
    campaign_id  TEXT,
    metric       TEXT NOT NULL,      -- 'impression' | 'click' | 'conversion'
    occurred_at  TEXT NOT NULL,
    value        INTEGER NOT NULL DEFAULT 1 CHECK (value >= 0)
);

CREATE INDEX IF NOT EXISTS sessions_started_idx  ON sessions(started_at);
CREATE INDEX IF NOT EXISTS sessions_user_idx     ON sessions(user_id);
CREATE INDEX IF NOT EXISTS rounds_session_idx    ON rounds(session_id);
CREATE INDEX IF NOT EXISTS rounds_started_idx    ON rounds(started_at);
CREATE INDEX IF NOT EXISTS delivery_occurred_idx ON delivery_events(occurred_at);

PRAGMA user_version = 1;
";
