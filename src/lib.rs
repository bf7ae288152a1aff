//! Dashboard Real-Time - Live update layer for the data-platform dashboard
//!
//! This crate keeps persistent WebSocket connections to the backend, routes
//! typed messages to subscribed handlers, reconnects with a bounded policy,
//! and exposes system metrics, alerts and pipeline activity as observable
//! state.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{
    MetricsConsumer, NotificationsConsumer, PipelineStatusConsumer, RealtimeHub,
};
pub use config::AppConfig;
