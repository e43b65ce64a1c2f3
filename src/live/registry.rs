use crate::types::live::ServerMessage;
use crate::types::users::UserId;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// One entry per live socket. Tabs sharing a session cookie differ by
/// `connection_id`; every entry of a user is found through `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub session_id: String,
    pub user_id: UserId,
    pub connection_id: ConnectionId,
}

impl ConnectionKey {
    pub fn for_channel(session_id: impl Into<String>, user_id: UserId, channel: &LiveChannel) -> Self {
        Self {
            session_id: session_id.into(),
            user_id,
            connection_id: channel.id(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("live channel {0} is closed")]
pub struct ChannelClosed(pub ConnectionId);

/// Sending half of a live connection. Cheap to clone; the connection's
/// writer task owns the receiving half.
#[derive(Debug, Clone)]
pub struct LiveChannel {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl LiveChannel {
    pub fn new(sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            sender,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send(&self, message: ServerMessage) -> Result<(), ChannelClosed> {
        self.sender.send(message).map_err(|_| ChannelClosed(self.id))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Process-local map of live connections. Every operation holds the lock
/// only for the map access itself.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<ConnectionKey, LiveChannel>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `channel` under `key`, returning the entry it replaced. The
    /// replaced channel is not closed.
    pub fn register(&self, key: ConnectionKey, channel: LiveChannel) -> Option<LiveChannel> {
        let previous = self
            .entries
            .lock()
            .expect("connection registry lock")
            .insert(key.clone(), channel);
        tracing::debug!(
            user_id = key.user_id,
            connection_id = key.connection_id,
            replaced = previous.is_some(),
            "live connection registered"
        );
        previous
    }

    pub fn unregister(&self, key: &ConnectionKey) -> Option<LiveChannel> {
        self.entries
            .lock()
            .expect("connection registry lock")
            .remove(key)
    }

    /// Remove the entry for `key` only if it still belongs to `connection_id`,
    /// so a torn-down connection never evicts the one that replaced it.
    pub fn release(&self, key: &ConnectionKey, connection_id: ConnectionId) -> bool {
        let mut entries = self.entries.lock().expect("connection registry lock");
        match entries.get(key) {
            Some(channel) if channel.id() == connection_id => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn channels_for_user(&self, user_id: UserId) -> Vec<(ConnectionKey, LiveChannel)> {
        self.entries
            .lock()
            .expect("connection registry lock")
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .map(|(key, channel)| (key.clone(), channel.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("connection registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
