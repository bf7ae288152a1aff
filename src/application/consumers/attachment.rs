//! What a consumer holds on to while attached to a connection.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::adapters::websocket::{ConnectionLease, ObserverHandle, Subscription, TransportConnection};
use crate::domain::foundation::DomainError;
use crate::domain::realtime::{ConnectionState, ControlMessage};
use crate::ports::MessageHandler;

/// Subscriptions, observers and the lease of one consumer.
///
/// Detaching sends the farewell message (if any and if connected), then
/// drops observers and subscriptions, then releases the lease. Dropping
/// does the same synchronously.
pub(crate) struct Attachment {
    connection: Arc<TransportConnection>,
    subscriptions: Vec<Subscription>,
    observers: Vec<ObserverHandle>,
    farewell: Option<ControlMessage>,
    lease: Option<ConnectionLease>,
}

impl Attachment {
    pub(crate) fn new(lease: ConnectionLease) -> Self {
        Self {
            connection: lease.connection().clone(),
            subscriptions: Vec::new(),
            observers: Vec::new(),
            farewell: None,
            lease: Some(lease),
        }
    }

    pub(crate) fn connection(&self) -> &Arc<TransportConnection> {
        &self.connection
    }

    pub(crate) fn subscribe(&mut self, message_type: &str, handler: Arc<dyn MessageHandler>) {
        let subscription = self.connection.router().subscribe(message_type, handler);
        self.subscriptions.push(subscription);
    }

    pub(crate) fn keep_observer(&mut self, handle: ObserverHandle) {
        self.observers.push(handle);
    }

    /// Message sent to the backend when the consumer goes away.
    pub(crate) fn set_farewell(&mut self, message: ControlMessage) {
        self.farewell = Some(message);
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub(crate) fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.watch_state()
    }

    fn detach(&mut self) {
        if let Some(farewell) = self.farewell.take() {
            if self.connection.is_connected() {
                self.connection.send(&farewell);
            }
        }
        self.observers.clear();
        self.subscriptions.clear();
    }

    /// Detaches and waits for the connection to close if this consumer held
    /// the last lease.
    pub(crate) async fn close(mut self) {
        self.detach();
        if let Some(lease) = self.lease.take() {
            lease.release().await;
        }
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Decodes a payload, mapping failures to `InvalidPayload`.
pub(crate) fn decode<T: DeserializeOwned>(message_type: &str, payload: &Value) -> Result<T, DomainError> {
    T::deserialize(payload).map_err(|e| DomainError::invalid_payload(message_type, e))
}
