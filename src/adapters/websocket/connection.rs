//! Persistent WebSocket connection with bounded reconnection.
//!
//! # Architecture
//!
//! ```text
//! TransportConnection (public handle)          driver task (one per connect)
//! ├── state: watch::Sender<ConnectionState> ◀── publishes transitions
//! ├── attempts: AtomicU32                   ◀── reset on open, bumped per retry
//! ├── outbound: mpsc::UnboundedSender ───────▶ writes to socket
//! ├── shutdown: watch::Sender<bool> ─────────▶ raced against open, read and sleep
//! └── router: Arc<MessageRouter>            ◀── every inbound frame, in wire order
//! ```
//!
//! The driver is the only owner of the socket. Frames are routed serially on
//! the driver task, so handlers never run concurrently for one connection.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::domain::realtime::{ConnectionState, DisconnectReason, Endpoint, RealtimeError};
use crate::ports::{Socket, SocketConnector, SocketEvent};

use super::observers::{ObserverHandle, ObserverRegistry};
use super::reconnect::ReconnectPolicy;
use super::router::MessageRouter;

/// State shared between the handle and its driver task.
struct Shared {
    state: watch::Sender<ConnectionState>,
    attempts: AtomicU32,
    /// Bumped whenever a driver is started or abandoned; a driver only
    /// publishes while its generation is current.
    generation: AtomicU64,
    observers: Arc<ObserverRegistry>,
}

struct Driver {
    generation: u64,
    outbound: mpsc::UnboundedSender<String>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// One persistent connection to one endpoint.
pub struct TransportConnection {
    endpoint: Endpoint,
    connector: Arc<dyn SocketConnector>,
    policy: ReconnectPolicy,
    router: Arc<MessageRouter>,
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl TransportConnection {
    pub fn new(
        endpoint: Endpoint,
        connector: Arc<dyn SocketConnector>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            endpoint,
            connector,
            policy,
            router: Arc::new(MessageRouter::new()),
            shared: Arc::new(Shared {
                state,
                attempts: AtomicU32::new(0),
                generation: AtomicU64::new(0),
                observers: Arc::new(ObserverRegistry::default()),
            }),
            driver: Mutex::new(None),
        }
    }

    /// Replaces the router, e.g. with one carrying a catch-all observer.
    pub fn with_router(mut self, router: MessageRouter) -> Self {
        self.router = Arc::new(router);
        self
    }

    /// Opens the connection in the background.
    ///
    /// Resets the reconnect counter. If a driver is already running
    /// (connected, opening, or waiting to retry) nothing else happens.
    ///
    /// # Errors
    ///
    /// - `MissingCredential` if the endpoint has no token; no attempt is made.
    /// - `NoRuntime` if called outside a Tokio runtime.
    pub fn connect(&self) -> Result<(), RealtimeError> {
        let url = self.endpoint.connect_url()?;

        let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        self.shared.attempts.store(0, Ordering::SeqCst);
        if let Some(running) = driver.as_ref() {
            if !running.task.is_finished() {
                return Ok(());
            }
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| RealtimeError::NoRuntime)?;
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let context = DriverContext {
            generation,
            url,
            path: self.endpoint.path().to_string(),
            connector: self.connector.clone(),
            policy: self.policy,
            router: self.router.clone(),
            shared: self.shared.clone(),
        };
        context.publish(ConnectionState::Connecting);
        tracing::debug!(path = %context.path, "Starting connection driver");

        let task = runtime.spawn(context.run(outbound_rx, shutdown_rx));
        *driver = Some(Driver {
            generation,
            outbound,
            shutdown,
            task,
        });
        Ok(())
    }

    /// Serialises `message` and writes it if the connection is open.
    ///
    /// While not connected the message is logged and dropped: there is no
    /// queueing across disconnects and no retry. Returns whether the message
    /// was handed to the socket.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> bool {
        if !self.state().can_send() {
            tracing::error!(
                path = %self.endpoint.path(),
                state = %self.state(),
                "Cannot send message: connection is not open"
            );
            return false;
        }

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(error = %error, "Failed to serialize outbound message");
                return false;
            }
        };

        let driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        match driver.as_ref() {
            Some(driver) if driver.outbound.send(text).is_ok() => true,
            _ => {
                tracing::error!(path = %self.endpoint.path(), "Cannot send message: driver stopped");
                false
            }
        }
    }

    /// Closes the connection and waits for the driver to finish.
    ///
    /// Cancels a pending reconnect. Observers see an intentional disconnect
    /// if the socket was open.
    pub async fn disconnect(&self) {
        let taken = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(driver) = taken else {
            return;
        };

        driver.shutdown.send_replace(true);
        drop(driver.outbound);
        if let Err(error) = driver.task.await {
            tracing::error!(error = %error, "Connection driver ended abnormally");
        }

        if self.shared.generation.load(Ordering::SeqCst) == driver.generation {
            self.shared.state.send_replace(ConnectionState::Disconnected);
        }
        tracing::debug!(path = %self.endpoint.path(), "Disconnected");
    }

    /// Fire-and-forget variant of [`disconnect`](Self::disconnect) for
    /// synchronous contexts such as `Drop`.
    ///
    /// The state is `Disconnected` on return; the old driver closes its
    /// socket in the background without publishing anything further.
    pub fn request_disconnect(&self) {
        let taken = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(driver) = taken {
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            driver.shutdown.send_replace(true);
            self.shared.state.send_replace(ConnectionState::Disconnected);
        }
    }

    pub fn on_connect<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.observers.add_connect(Arc::new(observer))
    }

    pub fn on_disconnect<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn(&DisconnectReason) + Send + Sync + 'static,
    {
        self.shared.observers.add_disconnect(Arc::new(observer))
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Reconnect attempts since the last successful open or `connect()`.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }
}

impl Drop for TransportConnection {
    fn drop(&mut self) {
        self.request_disconnect();
    }
}

enum PumpExit {
    Shutdown,
    Lost(DisconnectReason),
}

struct DriverContext {
    generation: u64,
    url: Url,
    path: String,
    connector: Arc<dyn SocketConnector>,
    policy: ReconnectPolicy,
    router: Arc<MessageRouter>,
    shared: Arc<Shared>,
}

impl DriverContext {
    fn is_current(&self) -> bool {
        self.shared.generation.load(Ordering::SeqCst) == self.generation
    }

    fn publish(&self, state: ConnectionState) {
        if self.is_current() {
            self.shared.state.send_replace(state);
        }
    }

    async fn run(
        self,
        mut outbound: mpsc::UnboundedReceiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            self.publish(ConnectionState::Connecting);
            let opened = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                opened = self.connector.open(&self.url) => opened,
            };

            match opened {
                Ok(mut socket) => {
                    self.shared.attempts.store(0, Ordering::SeqCst);
                    // Anything queued belongs to a previous socket
                    while outbound.try_recv().is_ok() {}
                    self.publish(ConnectionState::Connected);
                    tracing::info!(path = %self.path, "Connected");
                    if self.is_current() {
                        self.shared.observers.notify_connect();
                    }

                    match self.pump(&mut *socket, &mut outbound, &mut shutdown).await {
                        PumpExit::Shutdown => {
                            self.publish(ConnectionState::Closing);
                            if let Err(error) = socket.close().await {
                                tracing::debug!(error = %error, "Close handshake failed");
                            }
                            if self.is_current() {
                                self.shared
                                    .observers
                                    .notify_disconnect(&DisconnectReason::intentional());
                            }
                            break;
                        }
                        PumpExit::Lost(reason) => {
                            self.publish(ConnectionState::Disconnected);
                            tracing::warn!(path = %self.path, reason = %reason, "Connection lost");
                            if self.is_current() {
                                self.shared.observers.notify_disconnect(&reason);
                            }
                        }
                    }
                }
                Err(error) => {
                    self.publish(ConnectionState::Disconnected);
                    tracing::warn!(path = %self.path, error = %error, "Failed to open connection");
                    if self.is_current() {
                        self.shared
                            .observers
                            .notify_disconnect(&DisconnectReason::new(error.to_string()));
                    }
                }
            }

            let attempts = self.shared.attempts.load(Ordering::SeqCst);
            let Some(delay) = self.policy.next_delay(attempts) else {
                if self.policy.enabled {
                    tracing::error!(
                        path = %self.path,
                        attempts,
                        "Max reconnection attempts reached, giving up"
                    );
                } else {
                    tracing::info!(path = %self.path, "Reconnection disabled, staying disconnected");
                }
                break;
            };

            let attempt = self.shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::info!(
                path = %self.path,
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Scheduling reconnect"
            );

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.publish(ConnectionState::Disconnected);
    }

    async fn pump(
        &self,
        socket: &mut dyn Socket,
        outbound: &mut mpsc::UnboundedReceiver<String>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PumpExit {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    // Flush what was queued before the close was requested
                    while let Ok(text) = outbound.try_recv() {
                        if socket.send_text(text).await.is_err() {
                            break;
                        }
                    }
                    return PumpExit::Shutdown;
                }
                Some(text) = outbound.recv() => {
                    if let Err(error) = socket.send_text(text).await {
                        return PumpExit::Lost(DisconnectReason::new(format!("send failed: {}", error)));
                    }
                }
                event = socket.recv() => match event {
                    Ok(SocketEvent::Frame(text)) => {
                        self.router.route_frame(&text);
                    }
                    Ok(SocketEvent::Closed(reason)) => return PumpExit::Lost(reason),
                    Err(error) => return PumpExit::Lost(DisconnectReason::new(error.to_string())),
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;
