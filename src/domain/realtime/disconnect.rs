use std::fmt;

/// Why a connection went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    pub message: String,
    /// WebSocket close code, when the peer sent one.
    pub code: Option<u16>,
    /// True when the client asked for the close itself.
    pub intentional: bool,
}

impl DisconnectReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            intentional: false,
        }
    }

    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            code: Some(code),
            ..Self::new(message)
        }
    }

    /// Close requested by this client through `disconnect()`.
    pub fn intentional() -> Self {
        Self {
            message: "client disconnected".to_string(),
            code: Some(1000),
            intentional: true,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_when_present() {
        assert_eq!(
            DisconnectReason::with_code("going away", 1001).to_string(),
            "going away (code 1001)"
        );
        assert_eq!(DisconnectReason::new("reset").to_string(), "reset");
    }

    #[test]
    fn intentional_reason_is_flagged() {
        let reason = DisconnectReason::intentional();
        assert!(reason.intentional);
        assert_eq!(reason.code, Some(1000));
    }
}
