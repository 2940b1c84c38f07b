//! Connection abstraction: a framed, full-duplex message channel per client

use crate::error::TransportError;
use crate::protocol::Message;
use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

/// Outbound half of a client connection
#[async_trait]
pub trait MessageSink: Send + 'static {
    async fn send(&mut self, message: &Message) -> Result<(), TransportError>;
}

/// Inbound half of a client connection
#[async_trait]
pub trait MessageStream: Send + 'static {
    /// Next inbound message; `None` once the peer has gone away.
    ///
    /// `TransportError::Malformed` is recoverable, any other error ends the
    /// connection.
    async fn receive(&mut self) -> Option<Result<Message, TransportError>>;
}

/// Split an upgraded socket into its two halves
pub fn split_websocket(socket: WebSocket) -> (WsSink, WsStream) {
    let (sender, receiver) = socket.split();
    (WsSink(sender), WsStream(receiver))
}

pub struct WsSink(SplitSink<WebSocket, WsMessage>);

#[async_trait]
impl MessageSink for WsSink {
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let json = message.to_json().map_err(TransportError::Encode)?;
        self.0
            .send(WsMessage::Text(json))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }
}

pub struct WsStream(SplitStream<WebSocket>);

#[async_trait]
impl MessageStream for WsStream {
    async fn receive(&mut self) -> Option<Result<Message, TransportError>> {
        loop {
            let frame = match self.0.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(TransportError::WebSocket(e.to_string()))),
            };

            match frame {
                WsMessage::Text(text) => {
                    return Some(Message::from_json(&text).map_err(TransportError::from))
                }
                WsMessage::Binary(bytes) => {
                    return Some(serde_json::from_slice(&bytes).map_err(TransportError::from))
                }
                WsMessage::Close(_) => return None,
                // ping/pong are answered by axum
                _ => continue,
            }
        }
    }
}
