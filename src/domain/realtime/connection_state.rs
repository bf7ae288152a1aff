//! Lifecycle state of a transport connection.

use std::fmt;

/// Where a transport connection is in its lifecycle.
///
/// Transitions are driven by socket lifecycle events (open, error, close)
/// and by explicit `connect`/`disconnect` calls:
///
/// ```text
/// Disconnected --connect()--> Connecting --open--> Connected
/// Connecting --open failed--> Disconnected
/// Connected --socket closed/error--> Disconnected
/// Connected --disconnect()--> Closing --> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl ConnectionState {
    /// Only an open connection accepts outbound frames.
    pub fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Closing => "CLOSING",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connected_state_can_send() {
        assert!(ConnectionState::Connected.can_send());
        assert!(!ConnectionState::Connecting.can_send());
        assert!(!ConnectionState::Closing.can_send());
        assert!(!ConnectionState::Disconnected.can_send());
    }

    #[test]
    fn default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn display_uses_upper_case_names() {
        assert_eq!(ConnectionState::Closing.to_string(), "CLOSING");
    }
}
