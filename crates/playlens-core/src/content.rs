//! Content catalog entries.
//!
//! Status and the `active` flag are driven by the moderation workflow, which
//! lives outside this workspace. Analytics only reads catalog snapshots.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Moderation status of a content item.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentStatus {
  Draft,
  InReview,
  Approved,
  Live,
  Paused,
  Archived,
}

/// A snapshot of one item in the content catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
  pub item_id:    Uuid,
  pub game_key:   String,
  pub status:     ContentStatus,
  pub active:     bool,
  pub tags:       Vec<String>,
  pub difficulty: Option<String>,
}

impl ContentStatus {
  /// Parse the snake_case name used in storage and query strings.
  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownContentStatus(name.to_owned()))
  }
}

impl ContentItem {
  /// Live and active: the set of items players can currently be shown.
  pub fn is_live_active(&self) -> bool {
    self.active && self.status == ContentStatus::Live
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn status_string_codec_matches_serde() {
    assert_eq!(ContentStatus::InReview.as_ref(), "in_review");
    assert_eq!(
      ContentStatus::from_str("archived").unwrap(),
      ContentStatus::Archived
    );
    assert!(matches!(
      ContentStatus::from_name("retired"),
      Err(Error::UnknownContentStatus(name)) if name == "retired"
    ));
    assert_eq!(
      serde_json::to_string(&ContentStatus::InReview).unwrap(),
      "\"in_review\""
    );
  }

  #[test]
  fn paused_items_are_not_live_active() {
    let item = ContentItem {
      item_id:    Uuid::nil(),
      game_key:   "quiz".into(),
      status:     ContentStatus::Paused,
      active:     true,
      tags:       vec![],
      difficulty: None,
    };
    assert!(!item.is_live_active());
  }
}
