//! Application state: room registry and client handles

use crate::config::Config;
use crate::protocol::Message;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default per-client outbound queue length
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Outbound queue of a connected client, drained by its writer task
pub type Outbound = mpsc::Sender<Message>;

/// Shared state handed to every HTTP/WebSocket handler
pub struct AppState {
    pub registry: Registry,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::with_outbound_capacity(config.outbound_capacity),
            config: Arc::new(config),
        }
    }
}

/// Room table (room_id -> Room).
///
/// The table itself is only touched to look up, create or drop rooms;
/// membership changes and fan-out happen under each room's own lock.
pub struct Registry {
    pub(crate) rooms: DashMap<String, Arc<Room>>,
    outbound_capacity: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_outbound_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose clients queue at most `capacity` undelivered messages;
    /// anything beyond that is dropped.
    pub fn with_outbound_capacity(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            outbound_capacity: capacity.max(1),
        }
    }

    /// Fresh outbound queue for a connecting client
    pub fn outbound_channel(&self) -> (Outbound, mpsc::Receiver<Message>) {
        mpsc::channel(self.outbound_capacity)
    }

    /// Number of live rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Sorted client ids currently in `room_id` (empty if the room is gone)
    pub async fn room_members(&self, room_id: &str) -> Vec<String> {
        let Some(room) = self.room(room_id) else {
            return Vec::new();
        };
        let members = room.members.read().await;
        let mut ids: Vec<String> = members.clients.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn room(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|room| Arc::clone(room.value()))
    }
}

/// A named set of clients
pub struct Room {
    pub id: String,
    pub(crate) members: RwLock<Members>,
}

impl Room {
    pub fn new(id: String) -> Self {
        Self {
            id,
            members: RwLock::new(Members::default()),
        }
    }
}

/// Room membership, guarded by the room's lock
#[derive(Default)]
pub(crate) struct Members {
    pub clients: HashMap<String, Member>,
    /// Set once the last member left; the room is then dropped from the table
    /// and must not accept new members.
    pub retired: bool,
}

impl Members {
    /// Entry for `client`, only if it belongs to the same join session
    pub fn current(&self, client: &Client) -> Option<&Member> {
        self.clients
            .get(&client.id)
            .filter(|member| member.session == client.session)
    }

    pub fn current_mut(&mut self, client: &Client) -> Option<&mut Member> {
        self.clients
            .get_mut(&client.id)
            .filter(|member| member.session == client.session)
    }
}

/// Registry-side record of a joined client
pub(crate) struct Member {
    pub session: Uuid,
    pub display_name: String,
    pub outbound: Outbound,
}

impl Member {
    /// Queue `message` for delivery without waiting on the client's socket.
    ///
    /// `Full` means the writer is stalled and the message was dropped,
    /// `Closed` means the writer is gone.
    pub fn deliver(&self, message: Message) -> Result<(), TrySendError<Message>> {
        self.outbound.try_send(message)
    }
}

/// Handle to a joined client.
///
/// Refers to its room by id only; the registry owns the connection handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub(crate) id: String,
    pub(crate) room_id: String,
    pub(crate) session: Uuid,
}

impl Client {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }
}
