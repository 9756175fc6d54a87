//! Exposure, repetition and engagement analytics for Playlens.
//!
//! Every calculator in this crate is a pure, synchronous function of the
//! records it is handed plus an explicit window or reference date. None of
//! them perform I/O, read the clock, or keep state between calls, so any two
//! may run in parallel over the same snapshot.
//!
//! [`service::AnalyticsService`] is the only async part: it fetches inputs from
//! an [`playlens_core::store::EventStore`] and applies the degrade-to-default
//! policy when a query fails.

pub mod cohort;
pub mod coverage;
pub mod dau;
pub mod daypart;
pub mod exposure;
pub mod quality;
pub mod repetition;
pub mod service;

mod activity;
mod joined;
mod ratio;

#[cfg(test)]
mod fixtures;

pub use exposure::DEFAULT_OVEREXPOSURE_THRESHOLD;
pub use service::{AnalyticsService, Computed};
