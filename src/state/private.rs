//! Private message threads
//!
//! Each thread is stored under both participants so either side can look
//! it up by the other's id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::state::users::User;
use crate::types::{MessageId, UserId};

/// Number of entries returned when a thread is fetched
pub const THREAD_TAIL: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessage {
    pub id: MessageId,
    pub from: UserId,
    pub to: UserId,
    /// Sender display name at send time
    pub from_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivateMessages {
    threads: HashMap<UserId, HashMap<UserId, Vec<PrivateMessage>>>,
}

impl PrivateMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to both copies of the thread
    pub fn send(&mut self, sender: &User, to: UserId, text: String, now: DateTime<Utc>) -> PrivateMessage {
        let message = PrivateMessage {
            id: MessageId::new(),
            from: sender.id,
            to,
            from_name: sender.display_name.clone(),
            text,
            created_at: now,
            edited: false,
        };

        self.thread_mut(sender.id, to).push(message.clone());
        if to != sender.id {
            self.thread_mut(to, sender.id).push(message.clone());
        }
        message
    }

    /// Edit a message in both copies; only its sender may edit
    pub fn edit(
        &mut self,
        editor: UserId,
        with: UserId,
        message_id: MessageId,
        new_text: &str,
    ) -> Result<PrivateMessage, ChatError> {
        let original = self
            .threads
            .get(&editor)
            .and_then(|t| t.get(&with))
            .and_then(|list| list.iter().find(|m| m.id == message_id))
            .ok_or(ChatError::NotFound("Message"))?;
        if original.from != editor {
            return Err(ChatError::denied("Only the sender can edit this message"));
        }

        let mut edited = None;
        for (owner, other) in [(editor, with), (with, editor)] {
            let found = self
                .threads
                .get_mut(&owner)
                .and_then(|t| t.get_mut(&other))
                .and_then(|list| list.iter_mut().find(|m| m.id == message_id));
            if let Some(message) = found {
                message.text = new_text.to_string();
                message.edited = true;
                edited = Some(message.clone());
            }
        }
        edited.ok_or(ChatError::NotFound("Message"))
    }

    /// The last `tail` messages between `user` and `with`
    pub fn thread(&self, user: UserId, with: UserId, tail: usize) -> Vec<PrivateMessage> {
        let Some(list) = self.threads.get(&user).and_then(|t| t.get(&with)) else {
            return Vec::new();
        };
        let skip = list.len().saturating_sub(tail);
        list[skip..].to_vec()
    }

    /// Delete the user's namespace and every thread keyed by them
    pub fn purge_user(&mut self, user_id: UserId) {
        self.threads.remove(&user_id);
        for threads in self.threads.values_mut() {
            threads.remove(&user_id);
        }
    }

    fn thread_mut(&mut self, owner: UserId, other: UserId) -> &mut Vec<PrivateMessage> {
        self.threads
            .entry(owner)
            .or_default()
            .entry(other)
            .or_default()
    }
}
