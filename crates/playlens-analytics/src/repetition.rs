//! Anti-repetition compliance: did any session show the same item twice?

use std::collections::{HashMap, HashSet};

use playlens_core::{
  calendar::TimeWindow,
  session::{Round, Session},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ratio::percentage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRepetition {
  pub session_id:           Uuid,
  pub distinct_items_shown: usize,
  pub total_items_shown:    usize,
  pub repeat_free:          bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepetitionReport {
  /// Percentage of repeat-free sessions, one decimal place.
  pub anti_repetition_rate: f64,
  pub no_repeat_sessions:   usize,
  pub total_sessions:       usize,
  /// Per-session detail, in the order the sessions were supplied.
  pub sessions:             Vec<SessionRepetition>,
}

/// Check every session started inside `window` for repeated items.
///
/// All rounds of a qualifying session count, even ones that spill past the
/// end of the window. Rounds without an item are ignored, so a session with
/// no usable rounds is repeat-free.
///
/// With zero sessions the rate is 100.0: no session repeated anything. This
/// differs from content coverage, which reports 0.0 on an empty denominator.
pub fn compute(sessions: &[Session], rounds: &[Round], window: TimeWindow) -> RepetitionReport {
  let mut shown: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
  for round in rounds {
    if let (Some(session_id), Some(item_id)) = (round.session_id, round.item_id) {
      shown.entry(session_id).or_default().push(item_id);
    }
  }

  let detail: Vec<SessionRepetition> = sessions
    .iter()
    .filter(|s| window.contains(s.started_at))
    .map(|s| {
      let items = shown.get(&s.session_id).map(Vec::as_slice).unwrap_or_default();
      let distinct = items.iter().collect::<HashSet<_>>().len();
      SessionRepetition {
        session_id:           s.session_id,
        distinct_items_shown: distinct,
        total_items_shown:    items.len(),
        repeat_free:          distinct == items.len(),
      }
    })
    .collect();

  let no_repeat = detail.iter().filter(|s| s.repeat_free).count();

  RepetitionReport {
    anti_repetition_rate: percentage(no_repeat, detail.len(), 100.0),
    no_repeat_sessions:   no_repeat,
    total_sessions:       detail.len(),
    sessions:             detail,
  }
}
