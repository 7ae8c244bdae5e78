//! Test utilities for media playback
//!
//! Provides a simulated media backend driven by the Tokio clock, so fades,
//! readiness timeouts and end-of-video handling can be verified with
//! `tokio::time::pause` instead of real playback.

pub mod simulated;

pub use simulated::*;
