//! Room membership: join, leave, display names and presence fan-out

use crate::error::SignalingError;
use crate::protocol::Message;
use crate::state::{Client, Member, Members, Outbound, Registry, Room};
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

impl Registry {
    /// Register `client_id` in `room_id`, creating the room on first join.
    ///
    /// Every other member receives a `new-peer` notice about the newcomer, and
    /// the newcomer receives one `new-peer` notice per existing member.
    pub async fn join(
        &self,
        room_id: &str,
        client_id: &str,
        outbound: Outbound,
    ) -> Result<Client, SignalingError> {
        if room_id.is_empty() || client_id.is_empty() {
            return Err(SignalingError::MissingIdentifier);
        }

        loop {
            let room = match self.rooms.entry(room_id.to_string()) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    // The first member goes in before the room is published
                    let mut room = Room::new(room_id.to_string());
                    let session = Uuid::new_v4();
                    room.members.get_mut().clients.insert(
                        client_id.to_string(),
                        Member {
                            session,
                            display_name: String::new(),
                            outbound,
                        },
                    );
                    entry.insert(Arc::new(room));

                    tracing::info!(room_id = %room_id, "Room created");
                    tracing::info!(
                        room_id = %room_id,
                        client_id = %client_id,
                        user_count = 1,
                        "Client joined room"
                    );

                    return Ok(Client {
                        id: client_id.to_string(),
                        room_id: room_id.to_string(),
                        session,
                    });
                }
            };

            let mut members = room.members.write().await;

            // Last member left between the lookup and the lock
            if members.retired {
                drop(members);
                self.retire(&room);
                continue;
            }

            if members.clients.contains_key(client_id) {
                tracing::warn!(
                    room_id = %room_id,
                    client_id = %client_id,
                    "Duplicate client id, rejected join"
                );
                return Err(SignalingError::DuplicateClientId {
                    room_id: room_id.to_string(),
                    client_id: client_id.to_string(),
                });
            }

            // Newcomer learns about everyone already here, and vice versa
            for (peer_id, peer) in &members.clients {
                if let Err(err) = outbound.try_send(Message::new_peer(peer_id, &peer.display_name)) {
                    tracing::warn!(
                        room_id = %room_id,
                        client_id = %client_id,
                        error = %err,
                        "Roster notice not queued for newcomer"
                    );
                    break;
                }
            }

            let display_name = String::new();
            broadcast_except(
                &members,
                client_id,
                &Message::new_peer(client_id, &display_name),
            );

            let session = Uuid::new_v4();
            members.clients.insert(
                client_id.to_string(),
                Member {
                    session,
                    display_name,
                    outbound,
                },
            );

            tracing::info!(
                room_id = %room_id,
                client_id = %client_id,
                user_count = members.clients.len(),
                "Client joined room"
            );

            return Ok(Client {
                id: client_id.to_string(),
                room_id: room_id.to_string(),
                session,
            });
        }
    }

    /// Remove `client` from its room and notify the remaining members.
    ///
    /// No-op for a client that already left.
    pub async fn leave(&self, client: &Client) {
        let Some(room) = self.room(&client.room_id) else {
            return;
        };

        let mut members = room.members.write().await;
        if members.current(client).is_none() {
            return;
        }
        members.clients.remove(&client.id);

        broadcast_except(&members, &client.id, &Message::peer_left(&client.id));

        let remaining = members.clients.len();
        tracing::info!(
            room_id = %client.room_id,
            client_id = %client.id,
            remaining = remaining,
            "Client left room"
        );

        if remaining == 0 {
            members.retired = true;
            drop(members);
            self.retire(&room);
            tracing::info!(room_id = %client.room_id, "Room removed");
        }
    }

    /// Update the display name carried by future presence notices
    pub async fn set_display_name(&self, client: &Client, name: impl Into<String>) {
        let Some(room) = self.room(&client.room_id) else {
            return;
        };

        let mut members = room.members.write().await;
        if let Some(member) = members.current_mut(client) {
            member.display_name = name.into();
            tracing::info!(
                room_id = %client.room_id,
                client_id = %client.id,
                username = %member.display_name,
                "Client set username"
            );
        }
    }

    /// Current display name of `client`, `None` once it has left
    pub async fn display_name(&self, client: &Client) -> Option<String> {
        let room = self.room(&client.room_id)?;
        let members = room.members.read().await;
        members
            .current(client)
            .map(|member| member.display_name.clone())
    }

    /// Drop `room` from the table unless it was already replaced
    fn retire(&self, room: &Arc<Room>) {
        self.rooms
            .remove_if(&room.id, |_, current| Arc::ptr_eq(current, room));
    }
}

/// Send `message` to every member except `except_client_id`.
///
/// A failed send only affects that member.
pub(crate) fn broadcast_except(members: &Members, except_client_id: &str, message: &Message) {
    for (client_id, member) in &members.clients {
        if client_id == except_client_id {
            continue;
        }
        match member.deliver(message.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => tracing::warn!(
                client_id = %client_id,
                kind = %message.kind,
                "Outbound queue full, notice dropped"
            ),
            Err(TrySendError::Closed(_)) => tracing::warn!(
                client_id = %client_id,
                kind = %message.kind,
                "Error notifying peer, connection gone"
            ),
        }
    }
}
