//! Error types for the signaling relay

use crate::protocol::MessageKind;
use thiserror::Error;

/// Errors raised by registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// Connection request without a room id or client id
    #[error("Missing roomId or clientId")]
    MissingIdentifier,

    /// Client id already taken in the room
    #[error("Client {client_id} is already present in room {room_id}")]
    DuplicateClientId { room_id: String, client_id: String },

    /// Message kind that is never forwarded between peers
    #[error("Message type {0} cannot be relayed")]
    NotRelayable(MessageKind),

    /// Relay request without a target client
    #[error("Relayed message has no recipient")]
    MissingRecipient,
}

/// Errors from a client connection
#[derive(Error, Debug)]
pub enum TransportError {
    /// Frame could not be decoded as a signaling message
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Message could not be encoded for the wire
    #[error("Encode error: {0}")]
    Encode(serde_json::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}
