//! Core types and trait definitions for the Playlens analytics engine.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! describes the raw records supplied by the event store, the calendar used to
//! bucket them into days, and the [`store::EventStore`] abstraction.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod calendar;
pub mod content;
pub mod delivery;
pub mod error;
pub mod session;
pub mod store;

pub use error::{Error, Result};
