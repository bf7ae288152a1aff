//! Real-time connection configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::realtime::Endpoint;

/// Where the dashboard backend lives and how hard to try reaching it.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Base URL of the backend (`ws`, `wss`, `http` or `https`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Endpoint path used by the metrics consumer
    #[serde(default = "default_path")]
    pub metrics_path: String,

    /// Endpoint path used by the notifications consumer
    #[serde(default = "default_path")]
    pub notifications_path: String,

    /// Endpoint path used by pipeline consumers
    #[serde(default = "default_path")]
    pub pipelines_path: String,

    /// Bearer token for service accounts; interactive users get theirs
    /// from the authentication layer instead
    pub token: Option<SecretString>,

    /// Seconds to wait for the socket handshake
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Pipeline the bundled binary follows, if any
    pub watch_pipeline: Option<i64>,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Reconnection after unplanned closes.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Delay before each attempt, or the base delay for exponential backoff
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Attempts after a close before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub strategy: BackoffStrategy,

    /// Ceiling for exponential backoff
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    Exponential,
}

impl RealtimeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Token for processes that run without an interactive user.
    pub fn require_token(&self) -> Result<&SecretString, ValidationError> {
        self.token
            .as_ref()
            .ok_or(ValidationError::MissingRequired("realtime.token"))
    }

    /// Validate real-time configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Err(e) = Endpoint::new(&self.base_url, "/", None) {
            return Err(ValidationError::InvalidBaseUrl(e.to_string()));
        }
        for (name, path) in [
            ("metrics_path", &self.metrics_path),
            ("notifications_path", &self.notifications_path),
            ("pipelines_path", &self.pipelines_path),
        ] {
            if !path.starts_with('/') {
                return Err(ValidationError::InvalidPath(name));
            }
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        self.reconnect.validate()
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.delay_ms == 0 {
            return Err(ValidationError::InvalidReconnectDelay);
        }
        if self.delay_ms > self.max_delay_ms {
            return Err(ValidationError::DelayExceedsMaxDelay);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            metrics_path: default_path(),
            notifications_path: default_path(),
            pipelines_path: default_path(),
            token: None,
            connect_timeout_secs: default_connect_timeout(),
            watch_pipeline: None,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: default_delay_ms(),
            max_attempts: default_max_attempts(),
            strategy: BackoffStrategy::Fixed,
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    "ws://localhost:8000".to_string()
}

fn default_path() -> String {
    "/ws".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_delay_ms() -> u64 {
    3000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_max_delay_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_conventions() {
        let config = RealtimeConfig::default();
        assert_eq!(config.base_url, "ws://localhost:8000");
        assert_eq!(config.metrics_path, "/ws");
        assert_eq!(config.reconnect.delay(), Duration::from_millis(3000));
        assert_eq!(config.reconnect.max_attempts, 5);
        assert!(config.reconnect.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let config = RealtimeConfig {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn rejects_relative_path() {
        let config = RealtimeConfig {
            pipelines_path: "ws/pipelines".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidPath("pipelines_path"))
        );
    }

    #[test]
    fn require_token_reports_missing_key() {
        assert_eq!(
            RealtimeConfig::default().require_token().err(),
            Some(ValidationError::MissingRequired("realtime.token"))
        );
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = RealtimeConfig {
            connect_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }

    #[test]
    fn rejects_bad_reconnect_delays() {
        let zero = ReconnectConfig {
            delay_ms: 0,
            ..Default::default()
        };
        let inverted = ReconnectConfig {
            delay_ms: 60_000,
            max_delay_ms: 1_000,
            ..Default::default()
        };
        assert_eq!(zero.validate(), Err(ValidationError::InvalidReconnectDelay));
        assert_eq!(inverted.validate(), Err(ValidationError::DelayExceedsMaxDelay));
    }
}
