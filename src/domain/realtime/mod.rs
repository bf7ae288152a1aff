//! Real-time transport vocabulary: endpoints, connection states and the
//! inbound/outbound wire messages.

mod connection_state;
mod disconnect;
mod endpoint;
mod error;
mod inbound;
mod outbound;

pub use connection_state::ConnectionState;
pub use disconnect::DisconnectReason;
pub use endpoint::Endpoint;
pub use error::RealtimeError;
pub use inbound::{message_types, InboundMessage, ProtocolError};
pub use outbound::{ControlMessage, OutboundMessage};
