//! Errors surfaced by the public real-time API.
//!
//! Transport, protocol and handler failures never reach callers; the
//! connection logs and absorbs them.

use thiserror::Error;

use crate::domain::foundation::ValidationError;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("No bearer token available for '{path}', refusing to connect")]
    MissingCredential { path: String },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] ValidationError),

    #[error("Failed to serialize outbound message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No Tokio runtime available to drive the connection")]
    NoRuntime,
}
