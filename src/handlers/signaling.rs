//! WebRTC signaling relay

use crate::error::SignalingError;
use crate::protocol::Message;
use crate::state::{Client, Registry};
use tokio::sync::mpsc::error::TrySendError;

impl Registry {
    /// Forward an offer/answer/candidate from `sender` to the client named in
    /// `message.to`, within the sender's room.
    ///
    /// An unknown recipient is not an error: the message is dropped and the
    /// sender is never told. `from` is always overwritten with the sender's id.
    pub async fn relay(&self, sender: &Client, mut message: Message) -> Result<(), SignalingError> {
        if !message.kind.is_relayable() {
            return Err(SignalingError::NotRelayable(message.kind));
        }
        let Some(target_id) = message.recipient().map(str::to_string) else {
            return Err(SignalingError::MissingRecipient);
        };

        let Some(room) = self.room(&sender.room_id) else {
            tracing::debug!(from = %sender.id, room_id = %sender.room_id, "Sender's room is gone, dropped");
            return Ok(());
        };

        let members = room.members.read().await;
        if members.current(sender).is_none() {
            tracing::debug!(from = %sender.id, room_id = %sender.room_id, "Sender already left, dropped");
            return Ok(());
        }

        let Some(target) = members.clients.get(&target_id) else {
            tracing::debug!(
                from = %sender.id,
                to = %target_id,
                room_id = %sender.room_id,
                kind = %message.kind,
                "Relay target not in room, dropped"
            );
            return Ok(());
        };

        let kind = message.kind;
        message.from = sender.id.clone();

        match target.deliver(message) {
            Ok(()) => tracing::debug!(
                from = %sender.id,
                to = %target_id,
                room_id = %sender.room_id,
                kind = %kind,
                "Relayed message"
            ),
            Err(TrySendError::Full(_)) => tracing::warn!(
                from = %sender.id,
                to = %target_id,
                kind = %kind,
                "Outbound queue full, message dropped"
            ),
            Err(TrySendError::Closed(_)) => tracing::warn!(
                from = %sender.id,
                to = %target_id,
                kind = %kind,
                "Error sending message, recipient connection gone"
            ),
        }

        Ok(())
    }
}
