use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod broadcast;
pub mod message_types;
pub mod presence;

pub use message_types::Frame;

/// Unique identifier for a relay connection
///
/// Each WebSocket connection gets a unique id when it registers. Membership
/// comparisons use only this identity, so cleanup removes exactly the right
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A frame could not be handed to the peer's session: the receiving side
/// is gone. The broadcast engine treats this as "evict that member".
#[derive(Debug, Error)]
#[error("peer connection closed")]
pub struct DeliveryError;

/// One registered connection: identity plus the channel frames are
/// delivered through. Clones share both.
#[derive(Clone)]
pub struct RoomMember {
    id: ConnectionId,
    sender: UnboundedSender<Frame>,
}

impl RoomMember {
    /// Create a member and the inbox its session drains.
    pub fn register() -> (Self, UnboundedReceiver<Frame>) {
        let (tx, rx) = unbounded_channel();
        let member = Self {
            id: ConnectionId::new(),
            sender: tx,
        };
        (member, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame for this member's session. Fails only when the session
    /// has dropped its inbox.
    pub fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.sender.send(frame).map_err(|_| DeliveryError)
    }
}

/// Room registry for relay connections
///
/// Tracks which connections are joined to which rooms. Rooms are created on
/// first join and their entries removed when the last member leaves, so an
/// emptied room behaves exactly like one that never existed.
#[derive(Default, Clone)]
pub struct RoomRegistry {
    // room key -> list of members
    inner: Arc<RwLock<HashMap<String, Vec<RoomMember>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member to a room, creating the room if absent. Joining twice
    /// with the same member is a no-op.
    pub async fn join(&self, room: &str, member: RoomMember) {
        let mut guard = self.inner.write().await;
        let members = guard.entry(room.to_string()).or_default();

        if members.iter().any(|m| m.id == member.id) {
            return;
        }
        members.push(member);

        tracing::debug!(room = %room, total = members.len(), "member joined room");
    }

    /// Remove a member from a room if present; safe to call for rooms or
    /// members that were never joined.
    pub async fn leave(&self, room: &str, id: ConnectionId) {
        self.remove_all(room, &[id]).await;
    }

    /// Batch removal used by the broadcast engine's dead-peer cleanup.
    pub(crate) async fn remove_all(&self, room: &str, ids: &[ConnectionId]) {
        if ids.is_empty() {
            return;
        }

        let mut guard = self.inner.write().await;
        if let Some(members) = guard.get_mut(room) {
            let before = members.len();
            members.retain(|m| !ids.contains(&m.id));
            let after = members.len();

            if before != after {
                tracing::debug!(room = %room, removed = before - after, remaining = after, "members removed from room");
            }

            // Clean up empty room entries
            if members.is_empty() {
                guard.remove(room);
                tracing::debug!(room = %room, "removed empty room from registry");
            }
        }
    }

    /// Copy of the current member list, safe to iterate while concurrent
    /// joins and leaves happen elsewhere.
    pub async fn snapshot(&self, room: &str) -> Vec<RoomMember> {
        let guard = self.inner.read().await;
        guard.get(room).cloned().unwrap_or_default()
    }

    /// Member count computed from the set at call time, never cached.
    pub async fn member_count(&self, room: &str) -> usize {
        let guard = self.inner.read().await;
        guard.get(room).map(|v| v.len()).unwrap_or(0)
    }
}
