//! Reconnection policy applied after unplanned closes.

use std::time::Duration;

use crate::config::{BackoffStrategy, ReconnectConfig};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// `delay * 2^attempt`, never above `max_delay`.
    Exponential { max_delay: Duration },
}

/// Decides whether, and when, to try again.
///
/// The policy is pure; the connection driver owns the attempt counter and
/// asks [`ReconnectPolicy::next_delay`] before every scheduled attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub delay: Duration,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl ReconnectPolicy {
    /// Fixed delay between attempts.
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            enabled: true,
            delay,
            max_attempts,
            backoff: Backoff::Fixed,
        }
    }

    pub fn exponential(delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            enabled: true,
            delay,
            max_attempts,
            backoff: Backoff::Exponential { max_delay },
        }
    }

    /// Never reconnect.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Delay before the next attempt, given how many attempts were already
    /// made since the last successful open.
    ///
    /// Returns `None` when reconnection is disabled or exhausted.
    pub fn next_delay(&self, attempts_so_far: u32) -> Option<Duration> {
        if !self.enabled || attempts_so_far >= self.max_attempts {
            return None;
        }
        match self.backoff {
            Backoff::Fixed => Some(self.delay),
            Backoff::Exponential { max_delay } => {
                let factor = 1u32.checked_shl(attempts_so_far).unwrap_or(u32::MAX);
                let delay = self.delay.checked_mul(factor).unwrap_or(max_delay);
                Some(delay.min(max_delay))
            }
        }
    }
}

impl Default for ReconnectPolicy {
    /// 3 seconds between attempts, 5 attempts.
    fn default() -> Self {
        Self::fixed(Duration::from_millis(3000), 5)
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        let backoff = match config.strategy {
            BackoffStrategy::Fixed => Backoff::Fixed,
            BackoffStrategy::Exponential => Backoff::Exponential {
                max_delay: config.max_delay(),
            },
        };
        Self {
            enabled: config.enabled,
            delay: config.delay(),
            max_attempts: config.max_attempts,
            backoff,
        }
    }
}
