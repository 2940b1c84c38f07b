//! Connection handler: WebSocket handshake and the per-client receive loop

use crate::error::{SignalingError, TransportError};
use crate::protocol::{Message, MessageKind};
use crate::state::{AppState, Client, Registry};
use crate::transport::{split_websocket, MessageSink, MessageStream};
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// Identifiers a client supplies when connecting (`/ws?roomId=..&clientId=..`)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub room_id: Option<String>,
    pub client_id: Option<String>,
}

impl ConnectParams {
    /// `(room_id, client_id)` when both are present and non-empty
    pub fn identifiers(self) -> Option<(String, String)> {
        let room_id = self.room_id.filter(|id| !id.is_empty())?;
        let client_id = self.client_id.filter(|id| !id.is_empty())?;
        Some((room_id, client_id))
    }
}

/// WebSocket upgrade. Requests without both identifiers are rejected before
/// the upgrade and before any room is touched.
pub async fn ws_handler(
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some((room_id, client_id)) = params.identifiers() else {
        tracing::warn!("Missing roomId or clientId in request");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": SignalingError::MissingIdentifier.to_string() })),
        )
            .into_response();
    };

    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = split_websocket(socket);
        if let Err(e) = run_session(&state.registry, &room_id, &client_id, sink, stream).await {
            tracing::warn!(room_id = %room_id, client_id = %client_id, error = %e, "Connection rejected");
        }
    })
}

/// Drive one client from join to disconnect.
///
/// Joins the room, spawns a writer task draining the client's outbound queue
/// into `sink`, then dispatches inbound messages until `stream` ends. Leaving
/// the room happens exactly once, on the way out.
pub async fn run_session<S, R>(
    registry: &Registry,
    room_id: &str,
    client_id: &str,
    mut sink: S,
    mut stream: R,
) -> Result<(), SignalingError>
where
    S: MessageSink,
    R: MessageStream,
{
    let (tx, mut rx) = registry.outbound_channel();
    let client = registry.join(room_id, client_id, tx).await?;

    let writer_id = client.id().to_string();
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = sink.send(&message).await {
                tracing::warn!(client_id = %writer_id, error = %e, "Write error, dropping outbound messages");
                break;
            }
        }
    });

    while let Some(result) = stream.receive().await {
        match result {
            Ok(message) => dispatch(registry, &client, message).await,
            Err(TransportError::Malformed(e)) => {
                tracing::debug!(client_id = %client.id(), error = %e, "Ignoring malformed message");
            }
            Err(e) => {
                tracing::info!(client_id = %client.id(), error = %e, "Read error");
                break;
            }
        }
    }

    registry.leave(&client).await;
    send_task.abort();

    tracing::info!(room_id = %room_id, client_id = %client_id, "Connection closed");
    Ok(())
}

/// Route one inbound message
async fn dispatch(registry: &Registry, client: &Client, message: Message) {
    match message.kind {
        MessageKind::Join => {
            registry
                .set_display_name(client, message.username.unwrap_or_default())
                .await;
        }
        MessageKind::Offer | MessageKind::Answer | MessageKind::Candidate => {
            if let Err(e) = registry.relay(client, message).await {
                tracing::debug!(client_id = %client.id(), error = %e, "Relay refused");
            }
        }
        MessageKind::NewPeer | MessageKind::PeerLeft => {
            tracing::debug!(client_id = %client.id(), kind = %message.kind, "Ignoring server-only message");
        }
    }
}
