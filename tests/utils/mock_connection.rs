use async_trait::async_trait;
use roomrelay::handlers::run_session;
use roomrelay::transport::{MessageSink, MessageStream};
use roomrelay::{Message, Registry, SignalingError, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(100);

/// How a `MockSink` behaves on write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Normal,
    /// Every send fails immediately
    Broken,
    /// Every send hangs forever, like a socket whose peer stopped reading
    Stalled,
}

/// Outbound half backed by a channel
pub struct MockSink {
    tx: UnboundedSender<Message>,
    mode: SinkMode,
}

#[async_trait]
impl MessageSink for MockSink {
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        match self.mode {
            SinkMode::Normal => {}
            SinkMode::Broken => return Err(TransportError::WebSocket("broken pipe".into())),
            SinkMode::Stalled => std::future::pending::<()>().await,
        }
        self.tx
            .send(message.clone())
            .map_err(|_| TransportError::WebSocket("peer dropped".into()))
    }
}

pub struct MockStream {
    rx: UnboundedReceiver<Result<Message, TransportError>>,
}

#[async_trait]
impl MessageStream for MockStream {
    async fn receive(&mut self) -> Option<Result<Message, TransportError>> {
        self.rx.recv().await
    }
}

/// A client driven through `run_session` over in-memory channels
pub struct MockPeer {
    pub client_id: String,
    inbox: UnboundedReceiver<Message>,
    outbox: Option<UnboundedSender<Result<Message, TransportError>>>,
    session: JoinHandle<Result<(), SignalingError>>,
}

impl MockPeer {
    /// Start a session without waiting for it to join
    pub fn spawn(registry: &Arc<Registry>, room_id: &str, client_id: &str, mode: SinkMode) -> Self {
        let (sink_tx, inbox) = mpsc::unbounded_channel();
        let (outbox, stream_rx) = mpsc::unbounded_channel();

        let registry = Arc::clone(registry);
        let room = room_id.to_string();
        let id = client_id.to_string();
        let session = tokio::spawn(async move {
            let sink = MockSink { tx: sink_tx, mode };
            let stream = MockStream { rx: stream_rx };
            run_session(&registry, &room, &id, sink, stream).await
        });

        Self {
            client_id: client_id.to_string(),
            inbox,
            outbox: Some(outbox),
            session,
        }
    }

    /// Start a session and wait until it is a member of `room_id`
    pub async fn connect(registry: &Arc<Registry>, room_id: &str, client_id: &str) -> Self {
        let peer = Self::spawn(registry, room_id, client_id, SinkMode::Normal);
        wait_for_member(registry, room_id, client_id).await;
        peer
    }

    /// Like `connect`, but every write to this peer fails
    pub async fn connect_broken(registry: &Arc<Registry>, room_id: &str, client_id: &str) -> Self {
        let peer = Self::spawn(registry, room_id, client_id, SinkMode::Broken);
        wait_for_member(registry, room_id, client_id).await;
        peer
    }

    /// Like `connect`, but writes to this peer never complete
    pub async fn connect_stalled(registry: &Arc<Registry>, room_id: &str, client_id: &str) -> Self {
        let peer = Self::spawn(registry, room_id, client_id, SinkMode::Stalled);
        wait_for_member(registry, room_id, client_id).await;
        peer
    }

    pub fn send(&self, message: Message) {
        if let Some(outbox) = &self.outbox {
            outbox.send(Ok(message)).unwrap();
        }
    }

    /// Send a raw frame; undecodable text arrives as a malformed message
    pub fn send_text(&self, text: &str) {
        let frame = Message::from_json(text).map_err(TransportError::from);
        if let Some(outbox) = &self.outbox {
            outbox.send(frame).unwrap();
        }
    }

    pub async fn recv(&mut self) -> Message {
        tokio::time::timeout(RECV_TIMEOUT, self.inbox.recv())
            .await
            .unwrap_or_else(|_| panic!("{} timed out waiting for a message", self.client_id))
            .unwrap_or_else(|| panic!("{} inbox closed", self.client_id))
    }

    /// Assert nothing arrives within a short window
    pub async fn assert_silent(&mut self) {
        if let Ok(Some(message)) = tokio::time::timeout(SILENCE_WINDOW, self.inbox.recv()).await {
            panic!("{} got unexpected message: {:?}", self.client_id, message);
        }
    }

    /// Close the inbound stream and wait for the session to finish
    pub async fn disconnect(mut self) -> Result<(), SignalingError> {
        self.outbox.take();
        self.finished().await
    }

    /// Wait for the session task without closing the stream
    pub async fn finished(self) -> Result<(), SignalingError> {
        tokio::time::timeout(RECV_TIMEOUT, self.session)
            .await
            .expect("session did not finish")
            .expect("session task panicked")
    }
}

pub async fn wait_for_member(registry: &Registry, room_id: &str, client_id: &str) {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            if registry
                .room_members(room_id)
                .await
                .iter()
                .any(|id| id == client_id)
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{client_id} never joined {room_id}"));
}

pub fn offer(to: &str, payload: &str) -> Message {
    signal("offer", to, payload)
}

pub fn signal(kind: &str, to: &str, payload: &str) -> Message {
    Message::from_json(&format!(
        r#"{{"type":"{kind}","from":"spoofed","to":"{to}","payload":{payload}}}"#
    ))
    .unwrap()
}
