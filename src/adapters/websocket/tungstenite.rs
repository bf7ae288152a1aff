//! `SocketConnector` backed by tokio-tungstenite.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::domain::realtime::DisconnectReason;
use crate::ports::{Socket, SocketConnector, SocketEvent, TransportError};

/// Opens real WebSocket connections (`ws://` and `wss://`).
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn open(&self, url: &Url) -> Result<Box<dyn Socket>, TransportError> {
        let handshake = tokio_tungstenite::connect_async(url.as_str());
        let (stream, _response) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(map_handshake_error)?;

        Ok(Box::new(TungsteniteSocket { stream }))
    }
}

struct TungsteniteSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for TungsteniteSocket {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(map_error)
    }

    async fn recv(&mut self) -> Result<SocketEvent, TransportError> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(error)) => return Err(map_error(error)),
                None => return Ok(SocketEvent::Closed(DisconnectReason::new("stream ended"))),
            };

            match message {
                Message::Text(text) => return Ok(SocketEvent::Frame(text.as_str().to_owned())),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(SocketEvent::Frame(text)),
                    Err(_) => {
                        tracing::warn!(len = bytes.len(), "Ignoring non-UTF-8 binary frame");
                    }
                },
                Message::Close(frame) => {
                    let reason = match frame {
                        Some(frame) => DisconnectReason::with_code(
                            frame.reason.as_str().to_owned(),
                            u16::from(frame.code),
                        ),
                        None => DisconnectReason::new("closed by server"),
                    };
                    return Ok(SocketEvent::Closed(reason));
                }
                // Pings are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.close(None).await.map_err(map_error)
    }
}

fn map_handshake_error(error: WsError) -> TransportError {
    match error {
        WsError::Http(response) => {
            TransportError::Refused(format!("HTTP {}", response.status()))
        }
        other => map_error(other),
    }
}

fn map_error(error: WsError) -> TransportError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        other => TransportError::Io(other.to_string()),
    }
}
