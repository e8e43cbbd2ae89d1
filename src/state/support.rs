//! Support inbox
//!
//! Free-form support messages and pending display-name change requests,
//! reviewed by the owner.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::users::User;
use crate::types::{RequestId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SupportKind {
    Message {
        text: String,
    },
    NameChange {
        user_id: UserId,
        current_name: String,
        requested_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportEntry {
    pub id: RequestId,
    pub from: String,
    #[serde(flatten)]
    pub kind: SupportKind,
    pub sent_at: DateTime<Utc>,
}

/// A pending name-change request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameChangeRequest {
    pub user_id: UserId,
    pub requested_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportInbox {
    entries: HashMap<RequestId, SupportEntry>,
}

impl SupportInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_message(&mut self, from: String, text: String, now: DateTime<Utc>) -> RequestId {
        self.insert(from, SupportKind::Message { text }, now)
    }

    /// File a name-change request; the user record is not touched
    pub fn file_name_change(&mut self, user: &User, requested_name: String, now: DateTime<Utc>) -> RequestId {
        self.insert(
            user.display_name.clone(),
            SupportKind::NameChange {
                user_id: user.id,
                current_name: user.display_name.clone(),
                requested_name,
            },
            now,
        )
    }

    /// Look up a pending name-change request
    pub fn name_change(&self, id: RequestId) -> Option<NameChangeRequest> {
        match self.entries.get(&id).map(|e| &e.kind) {
            Some(SupportKind::NameChange {
                user_id,
                requested_name,
                ..
            }) => Some(NameChangeRequest {
                user_id: *user_id,
                requested_name: requested_name.clone(),
            }),
            _ => None,
        }
    }

    pub fn remove(&mut self, id: RequestId) -> Option<SupportEntry> {
        self.entries.remove(&id)
    }

    /// All entries, oldest first
    pub fn list(&self) -> Vec<SupportEntry> {
        let mut list: Vec<SupportEntry> = self.entries.values().cloned().collect();
        list.sort_by_key(|e| e.sent_at);
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop name-change requests filed by a user
    pub fn purge_user(&mut self, user_id: UserId) {
        self.entries.retain(|_, e| {
            !matches!(&e.kind, SupportKind::NameChange { user_id: uid, .. } if *uid == user_id)
        });
    }

    fn insert(&mut self, from: String, kind: SupportKind, now: DateTime<Utc>) -> RequestId {
        let id = RequestId::new();
        self.entries.insert(
            id,
            SupportEntry {
                id,
                from,
                kind,
                sent_at: now,
            },
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::users::tests::user;
    use crate::state::users::Role;

    #[test]
    fn test_name_change_lookup() {
        let mut inbox = SupportInbox::new();
        let ana = user("ana", "Ana", Role::Member);
        let message = inbox.file_message("Anonymous".into(), "help".into(), Utc::now());
        let request = inbox.file_name_change(&ana, "Anastasia".into(), Utc::now());

        assert!(inbox.name_change(message).is_none());
        assert_eq!(
            inbox.name_change(request),
            Some(NameChangeRequest {
                user_id: ana.id,
                requested_name: "Anastasia".into()
            })
        );
        assert_eq!(inbox.len(), 2);
    }

    #[test]
    fn test_purge_user_keeps_plain_messages() {
        let mut inbox = SupportInbox::new();
        let ana = user("ana", "Ana", Role::Member);
        inbox.file_message("Ana".into(), "help".into(), Utc::now());
        inbox.file_name_change(&ana, "Anastasia".into(), Utc::now());

        inbox.purge_user(ana.id);
        assert_eq!(inbox.len(), 1);
    }

    #[test]
    fn test_entry_wire_shape() {
        let mut inbox = SupportInbox::new();
        let ana = user("ana", "Ana", Role::Member);
        inbox.file_name_change(&ana, "Anastasia".into(), Utc::now());

        let json = serde_json::to_value(inbox.list()).unwrap();
        assert_eq!(json[0]["kind"], "name_change");
        assert_eq!(json[0]["requestedName"], "Anastasia");
        assert_eq!(json[0]["currentName"], "Ana");
    }
}
