//! Per-user content exposure counts and overexposure flags.
//!
//! Exposure is the number of times a user was shown an item. It is built by
//! folding the rounds in a window, attributed to users through their
//! sessions, into one [`ExposureRecord`] per `(user, item)` pair.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use playlens_core::{
  calendar::TimeWindow,
  session::{Round, Session},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::joined::join;

/// Exposure count at which an item is flagged when no threshold is given.
pub const DEFAULT_OVEREXPOSURE_THRESHOLD: u32 = 5;

// ─── Output ──────────────────────────────────────────────────────────────────

/// How many times one user saw one item within the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureRecord {
  pub user_id:    Uuid,
  pub item_id:    Uuid,
  pub seen_count: u32,
  pub last_seen:  DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureStats {
  /// Distinct users with at least one counted round.
  pub total_users:          usize,
  /// Distinct items shown to anyone.
  pub total_content_viewed: usize,
  /// Counted rounds divided by `total_users`; 0 when there are no users.
  pub avg_seen_per_user:    f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureReport {
  pub threshold:             u32,
  /// Ordered by user, then item.
  pub per_user_item_counts:  Vec<ExposureRecord>,
  /// Items some user has seen at least `threshold` times.
  pub overexposed_items:     BTreeSet<Uuid>,
  /// Users who have seen some item at least `threshold` times.
  pub overexposed_users:     BTreeSet<Uuid>,
  pub stats:                 ExposureStats,
  /// Malformed rounds inside the window that were left out of every count.
  pub skipped_rounds:        usize,
}

impl ExposureReport {
  /// The number of times `user_id` saw `item_id`; 0 if never.
  pub fn seen_count(&self, user_id: Uuid, item_id: Uuid) -> u32 {
    self
      .per_user_item_counts
      .binary_search_by(|r| (r.user_id, r.item_id).cmp(&(user_id, item_id)))
      .map(|i| self.per_user_item_counts[i].seen_count)
      .unwrap_or(0)
  }

  /// Sum of every `seen_count`; equals the number of counted rounds.
  pub fn total_exposures(&self) -> u64 {
    self
      .per_user_item_counts
      .iter()
      .map(|r| u64::from(r.seen_count))
      .sum()
  }

  /// Narrow the report to a single user. Stats are recomputed for that user
  /// alone; `skipped_rounds` is kept as-is since it cannot be attributed.
  pub fn for_user(&self, user_id: Uuid) -> ExposureReport {
    let records: Vec<ExposureRecord> = self
      .per_user_item_counts
      .iter()
      .filter(|r| r.user_id == user_id)
      .cloned()
      .collect();
    build(records, self.threshold, self.skipped_rounds)
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// Fold `rounds` whose `started_at` falls inside `window` into exposure
/// records.
///
/// Rounds with no item, no session, or a session absent from `sessions` are
/// skipped rather than failing the computation. With no rounds at all every
/// statistic is zero.
pub fn aggregate(
  sessions:  &[Session],
  rounds:    &[Round],
  window:    TimeWindow,
  threshold: u32,
) -> ExposureReport {
  let joined = join(sessions, rounds, window);

  let mut folded: BTreeMap<(Uuid, Uuid), (u32, DateTime<Utc>)> = BTreeMap::new();
  for e in &joined.exposures {
    folded
      .entry((e.user_id, e.item_id))
      .and_modify(|(count, last)| {
        *count += 1;
        *last = (*last).max(e.at);
      })
      .or_insert((1, e.at));
  }

  let records = folded
    .into_iter()
    .map(|((user_id, item_id), (seen_count, last_seen))| ExposureRecord {
      user_id,
      item_id,
      seen_count,
      last_seen,
    })
    .collect();

  build(records, threshold, joined.skipped)
}

fn build(records: Vec<ExposureRecord>, threshold: u32, skipped: usize) -> ExposureReport {
  let mut users = BTreeSet::new();
  let mut items = BTreeSet::new();
  let mut overexposed_items = BTreeSet::new();
  let mut overexposed_users = BTreeSet::new();
  let mut total_rounds: u64 = 0;

  for r in &records {
    users.insert(r.user_id);
    items.insert(r.item_id);
    total_rounds += u64::from(r.seen_count);
    if r.seen_count >= threshold {
      overexposed_items.insert(r.item_id);
      overexposed_users.insert(r.user_id);
    }
  }

  let avg_seen_per_user = if users.is_empty() {
    0.0
  } else {
    total_rounds as f64 / users.len() as f64
  };

  ExposureReport {
    threshold,
    per_user_item_counts: records,
    overexposed_items,
    overexposed_users,
    stats: ExposureStats {
      total_users: users.len(),
      total_content_viewed: items.len(),
      avg_seen_per_user,
    },
    skipped_rounds: skipped,
  }
}
