//! Client struct definition
//!
//! Represents a live connection as seen by the actor: its outbound
//! channel plus the user it is bound to and the room it is in.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ClientId, RoomId, UserId};

/// Connected client information
///
/// A connection starts unauthenticated; `user_id` and `current_room` are
/// only set after a successful login.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Bound user (None before login)
    pub user_id: Option<UserId>,
    /// Room this connection currently receives broadcasts for
    pub current_room: Option<RoomId>,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            user_id: None,
            current_room: None,
            sender,
        }
    }

    /// Queue a message for this client without waiting
    ///
    /// The actor never blocks on a slow connection; a full queue drops
    /// the message.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::ChannelFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn is_user(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id)
    }

    pub fn is_in(&self, room_id: RoomId) -> bool {
        self.current_room == Some(room_id)
    }

    /// Bind this connection to an authenticated user
    pub fn bind(&mut self, user_id: UserId) {
        self.user_id = Some(user_id);
    }
}
