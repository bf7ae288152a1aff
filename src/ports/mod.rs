//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the real-time core and the outside world. Adapters implement these ports.
//!
//! - `SocketConnector` / `Socket` - Opening and driving a WebSocket
//! - `MessageHandler` - Consumer of one inbound message type
//! - `TokenProvider` - Source of the bearer credential

mod message_handler;
mod socket;
mod token_provider;

pub use message_handler::{handler_fn, MessageHandler};
pub use socket::{Socket, SocketConnector, SocketEvent, TransportError};
pub use token_provider::TokenProvider;
