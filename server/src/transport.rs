//! Bidirectional message channel a session runs over.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use thiserror::Error;

/// A frame received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),
}

#[async_trait]
pub trait Transport: Send {
    /// Next client frame. `Ok(None)` once the client has disconnected.
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError>;

    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError>;

    async fn close(&mut self);
}

/// [`Transport`] over an upgraded axum websocket.
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError> {
        loop {
            let Some(message) = self.socket.recv().await else {
                return Ok(None);
            };
            match message.map_err(|e| TransportError::Receive(e.to_string()))? {
                Message::Text(text) => return Ok(Some(Inbound::Text(text.to_string()))),
                Message::Binary(bytes) => return Ok(Some(Inbound::Binary(bytes.to_vec()))),
                Message::Close(_) => return Ok(None),
                // answered by axum
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.socket
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = SinkExt::close(&mut self.socket).await;
    }
}
