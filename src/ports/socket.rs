//! Socket port - the seam between the connection driver and a concrete
//! WebSocket implementation.
//!
//! The driver owns exactly one `Socket` at a time and never shares it, so
//! the trait only needs `Send`.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::domain::realtime::DisconnectReason;

/// Failure at the transport level.
///
/// Never surfaced from the public connection API; the driver logs it and
/// hands control to the reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection refused: {0}")]
    Refused(String),

    #[error("timed out after {0:?} opening connection")]
    Timeout(Duration),

    #[error("socket error: {0}")]
    Io(String),

    #[error("connection closed")]
    Closed,
}

/// Something read off an open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// One complete text frame.
    Frame(String),
    /// The peer closed the connection or the stream ended.
    Closed(DisconnectReason),
}

/// Opens sockets.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// Opens a socket to `url`. The URL already carries the credential.
    async fn open(&self, url: &Url) -> Result<Box<dyn Socket>, TransportError>;
}

/// An open, bidirectional text socket.
///
/// `recv` must be cancel-safe: the driver races it against outbound writes
/// and the shutdown signal.
#[async_trait]
pub trait Socket: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn recv(&mut self) -> Result<SocketEvent, TransportError>;

    /// Sends a normal close frame. Errors are ignored by callers.
    async fn close(&mut self) -> Result<(), TransportError>;
}
