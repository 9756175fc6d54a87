//! [`SnapshotCache`]: serialized metric bodies kept for a short staleness
//! window.
//!
//! Caching is a serving concern only. The calculators recompute from scratch
//! on every call; this cache just spares the store when a dashboard polls the
//! same query repeatedly.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use axum::body::Bytes;
use tokio::sync::RwLock;

/// Default staleness window: two minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120);

/// A rendered response body and its ETag.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub body:  Bytes,
  pub etag:  String,
  stored_at: Instant,
}

/// Misses are not coalesced: concurrent requests for the same uncached key
/// each compute, and the last insert wins.
pub struct SnapshotCache {
  ttl:     Duration,
  entries: RwLock<HashMap<String, Snapshot>>,
}

impl Default for SnapshotCache {
  fn default() -> Self { Self::new(DEFAULT_CACHE_TTL) }
}

impl SnapshotCache {
  /// A zero `ttl` disables caching.
  pub fn new(ttl: Duration) -> Self { Self { ttl, entries: RwLock::new(HashMap::new()) } }

  pub fn ttl(&self) -> Duration { self.ttl }

  pub async fn get(&self, key: &str) -> Option<Snapshot> { self.get_at(key, Instant::now()).await }

  pub async fn insert(&self, key: String, body: Bytes, etag: String) {
    self.insert_at(key, body, etag, Instant::now()).await;
  }

  async fn get_at(&self, key: &str, now: Instant) -> Option<Snapshot> {
    let entries = self.entries.read().await;
    entries
      .get(key)
      .filter(|s| now.duration_since(s.stored_at) < self.ttl)
      .cloned()
  }

  async fn insert_at(&self, key: String, body: Bytes, etag: String, now: Instant) {
    if self.ttl.is_zero() {
      return;
    }
    let mut entries = self.entries.write().await;
    entries.retain(|_, s| now.duration_since(s.stored_at) < self.ttl);
    entries.insert(key, Snapshot { body, etag, stored_at: now });
  }
}
