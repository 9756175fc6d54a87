//! Live-content compliance and catalog coverage for one day.

use std::collections::{HashMap, HashSet};

use playlens_core::{
  calendar::TimeWindow,
  content::ContentItem,
  session::{Round, Session},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{joined::join, ratio::percentage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
  /// Share of active items whose status is `live`. 100.0 with no active items.
  pub live_content_compliance: f64,
  /// Share of live, active items someone saw in the window. 0.0 when nothing
  /// is live.
  pub content_coverage:        f64,
  /// Mean number of distinct items seen per user who saw anything.
  pub daily_seen_average:      u64,
  pub active_items:            usize,
  pub live_active_items:       usize,
  pub live_items_seen:         usize,
}

/// Compare a catalog snapshot against the rounds played in `window`.
///
/// The two ratios deliberately disagree on an empty denominator: compliance
/// is vacuously 100 % when nothing is active, while coverage is 0 % when
/// nothing is live. Dashboards depend on both readings.
pub fn compute(
  catalog:  &[ContentItem],
  sessions: &[Session],
  rounds:   &[Round],
  window:   TimeWindow,
) -> CoverageReport {
  let active_items = catalog.iter().filter(|c| c.active).count();
  let live_active: HashSet<Uuid> = catalog
    .iter()
    .filter(|c| c.is_live_active())
    .map(|c| c.item_id)
    .collect();

  let joined = join(sessions, rounds, window);

  let mut seen_by_user: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
  for e in &joined.exposures {
    seen_by_user.entry(e.user_id).or_default().insert(e.item_id);
  }

  let live_items_seen = joined
    .exposures
    .iter()
    .map(|e| e.item_id)
    .filter(|id| live_active.contains(id))
    .collect::<HashSet<_>>()
    .len();

  let daily_seen_average = if seen_by_user.is_empty() {
    0
  } else {
    let total: usize = seen_by_user.values().map(HashSet::len).sum();
    (total as f64 / seen_by_user.len() as f64).round() as u64
  };

  CoverageReport {
    live_content_compliance: percentage(live_active.len(), active_items, 100.0),
    content_coverage: percentage(live_items_seen, live_active.len(), 0.0),
    daily_seen_average,
    active_items,
    live_active_items: live_active.len(),
    live_items_seen,
  }
}
