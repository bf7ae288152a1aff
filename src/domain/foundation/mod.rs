//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, collections and error types
//! that form the vocabulary of the real-time dashboard domain.

mod bounded_log;
mod errors;
mod ids;
mod timestamp;

pub use bounded_log::BoundedLog;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{NotificationId, PipelineId};
pub use timestamp::Timestamp;
