//! Reference-counted connections, one per endpoint path.
//!
//! Consumers never create connections themselves. They acquire a
//! [`ConnectionLease`] for a path; the first lease opens the connection and
//! the last one to go away tears it down.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::realtime::{Endpoint, RealtimeError};
use crate::ports::{SocketConnector, TokenProvider};

use super::connection::TransportConnection;
use super::reconnect::ReconnectPolicy;
use super::router::{CatchAll, MessageRouter};

struct PoolEntry {
    connection: Arc<TransportConnection>,
    leases: usize,
}

struct PoolInner {
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    connector: Arc<dyn SocketConnector>,
    policy: ReconnectPolicy,
    catch_all: Option<CatchAll>,
    entries: Mutex<HashMap<String, PoolEntry>>,
}

impl PoolInner {
    /// Drops one lease; returns the connection if it was the last one.
    ///
    /// Leases that outlived their entry (see `close_all`) release nothing.
    fn release(
        &self,
        path: &str,
        connection: &Arc<TransportConnection>,
    ) -> Option<Arc<TransportConnection>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get_mut(path)?;
        if !Arc::ptr_eq(&entry.connection, connection) {
            return None;
        }
        entry.leases = entry.leases.saturating_sub(1);
        if entry.leases > 0 {
            return None;
        }
        entries.remove(path).map(|entry| entry.connection)
    }
}

/// Owns every live connection of the process.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        connector: Arc<dyn SocketConnector>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self::build(base_url.into(), tokens, connector, policy, None)
    }

    /// Pool whose connections report every parsed message to `catch_all`.
    pub fn with_catch_all(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        connector: Arc<dyn SocketConnector>,
        policy: ReconnectPolicy,
        catch_all: CatchAll,
    ) -> Self {
        Self::build(base_url.into(), tokens, connector, policy, Some(catch_all))
    }

    fn build(
        base_url: String,
        tokens: Arc<dyn TokenProvider>,
        connector: Arc<dyn SocketConnector>,
        policy: ReconnectPolicy,
        catch_all: Option<CatchAll>,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                base_url,
                tokens,
                connector,
                policy,
                catch_all,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Leases the connection for `path`, creating and opening it if needed.
    ///
    /// Every acquire calls `connect()`, so a connection that gave up
    /// reconnecting gets a fresh set of attempts when a new consumer shows
    /// up.
    ///
    /// # Errors
    ///
    /// - `MissingCredential` when no token is available; nothing is created.
    /// - `InvalidEndpoint` when the base URL or path is malformed.
    pub fn acquire(&self, path: &str) -> Result<ConnectionLease, RealtimeError> {
        let mut entries = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.get_mut(path) {
            entry.connection.connect()?;
            entry.leases += 1;
            return Ok(self.lease(path, entry.connection.clone()));
        }

        let endpoint = Endpoint::new(&self.inner.base_url, path, self.inner.tokens.bearer_token())?;
        if !endpoint.has_credential() {
            tracing::warn!(path, "No bearer token, not opening real-time connection");
            return Err(RealtimeError::MissingCredential {
                path: endpoint.path().to_string(),
            });
        }

        let router = match &self.inner.catch_all {
            Some(catch_all) => MessageRouter::with_catch_all(catch_all.clone()),
            None => MessageRouter::new(),
        };
        let connection = Arc::new(
            TransportConnection::new(endpoint, self.inner.connector.clone(), self.inner.policy)
                .with_router(router),
        );
        connection.connect()?;
        tracing::debug!(path, "Opened pooled connection");

        entries.insert(
            path.to_string(),
            PoolEntry {
                connection: connection.clone(),
                leases: 1,
            },
        );
        Ok(self.lease(path, connection))
    }

    fn lease(&self, path: &str, connection: Arc<TransportConnection>) -> ConnectionLease {
        ConnectionLease {
            pool: self.inner.clone(),
            path: path.to_string(),
            connection,
            released: false,
        }
    }

    /// Number of open pooled connections.
    pub fn connection_count(&self) -> usize {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Outstanding leases for a path.
    pub fn lease_count(&self, path: &str) -> usize {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map_or(0, |e| e.leases)
    }

    /// Gracefully disconnects every pooled connection and forgets them.
    ///
    /// Leases still held afterwards point at closed connections.
    pub async fn close_all(&self) {
        let connections: Vec<Arc<TransportConnection>> = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, entry)| entry.connection)
            .collect();

        for connection in connections {
            connection.disconnect().await;
        }
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("base_url", &self.inner.base_url)
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// Shared use of one pooled connection.
///
/// Dropping the lease releases it; the connection closes when the last
/// lease for its path is released.
pub struct ConnectionLease {
    pool: Arc<PoolInner>,
    path: String,
    connection: Arc<TransportConnection>,
    released: bool,
}

impl ConnectionLease {
    pub fn connection(&self) -> &Arc<TransportConnection> {
        &self.connection
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Releases the lease, waiting for the close handshake if this was the
    /// last one.
    pub async fn release(mut self) {
        self.released = true;
        if let Some(connection) = self.pool.release(&self.path, &self.connection) {
            connection.disconnect().await;
        }
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Some(connection) = self.pool.release(&self.path, &self.connection) {
            connection.request_disconnect();
        }
    }
}

impl fmt::Debug for ConnectionLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionLease")
            .field("path", &self.path)
            .field("state", &self.connection.state())
            .finish()
    }
}
