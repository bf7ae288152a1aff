//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid real-time base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Endpoint path for {0} must start with '/'")]
    InvalidPath(&'static str),

    #[error("Invalid connect timeout")]
    InvalidTimeout,

    #[error("Reconnect delay must be greater than zero")]
    InvalidReconnectDelay,

    #[error("Reconnect delay exceeds max_delay_ms")]
    DelayExceedsMaxDelay,

    #[error("Invalid log filter directive: {0}")]
    InvalidLogLevel(String),
}
