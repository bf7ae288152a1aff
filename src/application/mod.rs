//! Application layer - Consumers and the hub that wires them up.
//!
//! Consumers turn routed messages into feature state; the hub owns the
//! connection pool they share.

pub mod consumers;
pub mod hub;

pub use consumers::{MetricsConsumer, NotificationsConsumer, PipelineStatusConsumer};
pub use hub::RealtimeHub;
