//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the real-time core to external systems:
//! - `websocket` - Socket connectors, connection driver, routing and pooling
//! - `auth` - Token providers

pub mod auth;
pub mod websocket;

pub use auth::StaticTokenProvider;
pub use websocket::{
    ConnectionLease, ConnectionPool, InMemoryConnector, MessageRouter, ReconnectPolicy,
    Subscription, TransportConnection, TungsteniteConnector,
};
