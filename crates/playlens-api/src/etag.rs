//! ETag computation for serialized metric bodies.
//!
//! The tag is a SHA-256 over the exact bytes sent, so two responses share a
//! tag only if a client would see identical JSON.

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

/// Compute a strong, quoted ETag for `body`.
pub fn compute_etag(body: &[u8]) -> String {
  let hash = Sha256::digest(body);
  format!("\"{}\"", hex::encode(hash))
}

/// Whether the request's `If-None-Match` lists `etag` (or is `*`).
pub fn matches_if_none_match(headers: &HeaderMap, etag: &str) -> bool {
  headers
    .get_all(header::IF_NONE_MATCH)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(','))
    .map(|tag| tag.trim().trim_start_matches("W/"))
    .any(|tag| tag == "*" || tag == etag)
}
