//! Registered client connection
//!
//! Represents a connection that has completed the Register handshake: its
//! identity, its nickname and the outbound queue feeding its writer task.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::Message;
use crate::types::ConnectionId;

/// Connected client information
///
/// Equality is identity: two entries are the same connection only if their
/// `id`s match, whatever their nicknames.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Nickname carried by the Register message
    pub nickname: String,
    /// Server → Client outbound queue
    pub sender: mpsc::Sender<Message>,
}

impl PartialEq for ClientConnection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClientConnection {}

impl ClientConnection {
    /// Create a new registered connection
    pub fn new(
        id: ConnectionId,
        nickname: impl Into<String>,
        sender: mpsc::Sender<Message>,
    ) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            sender,
        }
    }

    /// Enqueue a message for this connection without waiting
    ///
    /// Never blocks: a full queue is reported instead of stalling the caller.
    pub fn send(&self, msg: Message) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}
