//! WebSocket client adapters.
//!
//! - `connection` - One persistent connection with bounded reconnection
//! - `reconnect` - Retry delay policy
//! - `router` - Dispatch of inbound frames by message type
//! - `pool` - Reference-counted connections shared by consumers
//! - `tungstenite` - Real sockets over tokio-tungstenite
//! - `in_memory` - Scripted sockets for tests

pub mod connection;
pub mod in_memory;
pub mod observers;
pub mod pool;
pub mod reconnect;
pub mod router;
pub mod tungstenite;

pub use connection::TransportConnection;
pub use in_memory::InMemoryConnector;
pub use observers::{ConnectObserver, DisconnectObserver, ObserverHandle};
pub use pool::{ConnectionLease, ConnectionPool};
pub use reconnect::{Backoff, ReconnectPolicy};
pub use router::{CatchAll, MessageRouter, RegistrationId, Subscription, SubscriptionRegistry};
pub use tungstenite::TungsteniteConnector;
