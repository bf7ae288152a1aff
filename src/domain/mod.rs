//! Domain layer containing the real-time vocabulary and dashboard state.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, bounded logs)
//! - `realtime` - Endpoints, connection states and wire messages
//! - `dashboard` - Metrics, notifications and pipeline state slices

pub mod dashboard;
pub mod foundation;
pub mod realtime;
