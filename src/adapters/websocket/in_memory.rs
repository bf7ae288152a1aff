//! In-memory socket connector for testing.
//!
//! Lets tests script what the "server" does: push frames, drop the
//! connection, refuse new connections, and inspect what the client sent.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in production.
//! It uses `.expect()` on lock operations which will panic if locks are poisoned.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::domain::realtime::DisconnectReason;
use crate::ports::{Socket, SocketConnector, SocketEvent, TransportError};

enum Scripted {
    Frame(String),
    Close(DisconnectReason),
}

#[derive(Default)]
struct ScriptState {
    refuse: bool,
    attempts: usize,
    closes: usize,
    last_url: Option<Url>,
    sent: Vec<String>,
    current: Option<mpsc::UnboundedSender<Scripted>>,
}

/// Scripted connector.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
///
/// # Example
///
/// ```ignore
/// let connector = InMemoryConnector::new();
/// let connection = TransportConnection::new(endpoint, Arc::new(connector.clone()), policy);
/// connection.connect()?;
///
/// connector.push_frame(r#"{"type":"system_metrics","cpu":{"percent":42.5}}"#);
/// connector.drop_connection(DisconnectReason::with_code("going away", 1001));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    state: Arc<Mutex<ScriptState>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state
            .lock()
            .expect("InMemoryConnector: state lock poisoned")
    }

    // === Scripting ===

    /// Delivers a text frame on the open socket. Returns `false` if no
    /// socket is open.
    pub fn push_frame(&self, text: impl Into<String>) -> bool {
        self.lock()
            .current
            .as_ref()
            .map(|tx| tx.send(Scripted::Frame(text.into())).is_ok())
            .unwrap_or(false)
    }

    /// Closes the open socket from the server side.
    pub fn drop_connection(&self, reason: DisconnectReason) -> bool {
        match self.lock().current.take() {
            Some(tx) => tx.send(Scripted::Close(reason)).is_ok(),
            None => false,
        }
    }

    /// Makes subsequent `open` calls fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse = refuse;
    }

    // === Test Helpers ===

    /// Number of `open` calls, refused ones included.
    pub fn connect_attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Frames the client wrote, across all sockets, in order.
    pub fn sent_frames(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Sent frames decoded as JSON, skipping anything that is not JSON.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent_frames()
            .iter()
            .filter_map(|f| serde_json::from_str(f).ok())
            .collect()
    }

    /// Number of client-initiated closes.
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn last_url(&self) -> Option<Url> {
        self.lock().last_url.clone()
    }

    /// Whether a socket is open and its client side still alive.
    pub fn is_open(&self) -> bool {
        self.lock()
            .current
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }
}

#[async_trait]
impl SocketConnector for InMemoryConnector {
    async fn open(&self, url: &Url) -> Result<Box<dyn Socket>, TransportError> {
        let mut state = self.lock();
        state.attempts += 1;
        state.last_url = Some(url.clone());
        if state.refuse {
            return Err(TransportError::Refused("scripted refusal".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.current = Some(tx);
        Ok(Box::new(InMemorySocket {
            inbound: rx,
            state: self.state.clone(),
        }))
    }
}

struct InMemorySocket {
    inbound: mpsc::UnboundedReceiver<Scripted>,
    state: Arc<Mutex<ScriptState>>,
}

impl InMemorySocket {
    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state
            .lock()
            .expect("InMemorySocket: state lock poisoned")
    }
}

#[async_trait]
impl Socket for InMemorySocket {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.lock().sent.push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Result<SocketEvent, TransportError> {
        match self.inbound.recv().await {
            Some(Scripted::Frame(text)) => Ok(SocketEvent::Frame(text)),
            Some(Scripted::Close(reason)) => Ok(SocketEvent::Closed(reason)),
            None => Ok(SocketEvent::Closed(DisconnectReason::new("stream ended"))),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inbound.close();
        let mut state = self.lock();
        state.closes += 1;
        state.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("ws://localhost/ws?token=t").unwrap()
    }

    #[tokio::test]
    async fn scripted_frames_are_received_in_order() {
        let connector = InMemoryConnector::new();
        let mut socket = connector.open(&url()).await.unwrap();

        assert!(connector.push_frame("one"));
        assert!(connector.push_frame("two"));

        assert_eq!(socket.recv().await.unwrap(), SocketEvent::Frame("one".into()));
        assert_eq!(socket.recv().await.unwrap(), SocketEvent::Frame("two".into()));
    }

    #[tokio::test]
    async fn drop_connection_delivers_close_reason() {
        let connector = InMemoryConnector::new();
        let mut socket = connector.open(&url()).await.unwrap();

        connector.drop_connection(DisconnectReason::with_code("bye", 1001));

        assert_eq!(
            socket.recv().await.unwrap(),
            SocketEvent::Closed(DisconnectReason::with_code("bye", 1001))
        );
        assert!(!connector.push_frame("late"));
    }

    #[tokio::test]
    async fn refused_open_is_counted() {
        let connector = InMemoryConnector::new();
        connector.refuse_connections(true);

        assert!(connector.open(&url()).await.is_err());
        assert_eq!(connector.connect_attempts(), 1);
        assert_eq!(connector.last_url(), Some(url()));
    }

    #[tokio::test]
    async fn sent_frames_are_recorded() {
        let connector = InMemoryConnector::new();
        let mut socket = connector.open(&url()).await.unwrap();

        socket.send_text(r#"{"type":"ping"}"#.to_string()).await.unwrap();
        socket.close().await.unwrap();

        assert_eq!(connector.sent_json(), vec![serde_json::json!({"type": "ping"})]);
        assert_eq!(connector.close_count(), 1);
        assert!(!connector.is_open());
    }
}
