//! Client <-> server signaling message definitions

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// Message kind carried in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    // Client -> server
    Join,

    // Peer -> peer (relayed)
    Offer,
    Answer,
    Candidate,

    // Server -> client presence
    NewPeer,
    PeerLeft,
}

impl MessageKind {
    /// Kinds that are forwarded to a single named peer
    pub fn is_relayable(self) -> bool {
        matches!(self, Self::Offer | Self::Answer | Self::Candidate)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::NewPeer => "new-peer",
            Self::PeerLeft => "peer-left",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signaling message, one JSON object per WebSocket frame.
///
/// `from` is always rewritten by the server before a message leaves it, so
/// whatever a client puts there is ignored. `payload` is kept as raw JSON and
/// passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, deserialize_with = "lenient_string")]
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub payload: Option<Box<RawValue>>,
}

/// Reads a string field, treating `null` or any non-string value as empty
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(value)) => value,
        _ => String::new(),
    })
}

impl Message {
    /// Presence notice sent to existing members when `from` joins
    pub fn new_peer(from: &str, username: &str) -> Self {
        Self {
            kind: MessageKind::NewPeer,
            from: from.to_string(),
            to: None,
            username: Some(username.to_string()),
            payload: None,
        }
    }

    /// Presence notice sent to remaining members when `from` leaves
    pub fn peer_left(from: &str) -> Self {
        Self {
            kind: MessageKind::PeerLeft,
            from: from.to_string(),
            to: None,
            username: None,
            payload: None,
        }
    }

    /// Target client id, if one was given and is non-empty
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().filter(|to| !to.is_empty())
    }

    /// Raw payload text, exactly as received
    pub fn payload_json(&self) -> Option<&str> {
        self.payload.as_deref().map(RawValue::get)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
