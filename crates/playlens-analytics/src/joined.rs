//! Attribution of rounds to users through their sessions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use playlens_core::{
  calendar::TimeWindow,
  session::{Round, Session},
};
use uuid::Uuid;

/// A well-formed round inside the window, resolved to the user who saw it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Exposure {
  pub user_id: Uuid,
  pub item_id: Uuid,
  pub at:      DateTime<Utc>,
}

pub(crate) struct Joined {
  pub exposures: Vec<Exposure>,
  /// Rounds inside the window that could not be attributed: null
  /// `item_id`, null `session_id`, or a session the store did not return.
  pub skipped:   usize,
}

pub(crate) fn join(sessions: &[Session], rounds: &[Round], window: TimeWindow) -> Joined {
  let owners: HashMap<Uuid, Uuid> = sessions
    .iter()
    .map(|s| (s.session_id, s.user_id))
    .collect();

  let mut exposures = Vec::with_capacity(rounds.len());
  let mut skipped = 0;

  for round in rounds.iter().filter(|r| window.contains(r.started_at)) {
    let user = round.session_id.and_then(|sid| owners.get(&sid).copied());
    match (user, round.item_id) {
      (Some(user_id), Some(item_id)) => exposures.push(Exposure {
        user_id,
        item_id,
        at: round.started_at,
      }),
      _ => skipped += 1,
    }
  }

  Joined { exposures, skipped }
}
