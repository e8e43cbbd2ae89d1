//! Application state
//!
//! Every store the chat server owns, held together in one struct that the
//! `ChatServer` actor owns exclusively. The persistent part serializes to
//! a single JSON snapshot; presence is rebuilt from live connections.

pub mod credentials;
pub mod moderation;
pub mod presence;
pub mod private;
pub mod rooms;
pub mod settings;
pub mod support;
pub mod users;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::OwnerConfig;
use crate::error::{AppError, ChatError};
use crate::types::{RequestId, RoomId, UserId};

pub use moderation::Moderation;
pub use presence::Presence;
pub use private::PrivateMessages;
pub use rooms::RoomRegistry;
pub use settings::SystemSettings;
pub use support::SupportInbox;
pub use users::{User, UserRegistry};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub users: UserRegistry,
    pub rooms: RoomRegistry,
    pub moderation: Moderation,
    pub private_messages: PrivateMessages,
    pub support: SupportInbox,
    pub settings: SystemSettings,
    #[serde(skip)]
    pub presence: Presence,
}

/// Result of a cascading account deletion
#[derive(Debug)]
pub struct DeletedAccount {
    pub user: User,
    /// Rooms whose membership, moderators or log changed
    pub affected_rooms: Vec<RoomId>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a snapshot
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the persistent part
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Ensure the owner and the official room exist
    ///
    /// Member lists are cleared: no connection survives a restart.
    pub fn bootstrap(&mut self, owner: &OwnerConfig) -> Result<(), AppError> {
        if self.users.owner().is_none() {
            let password = owner.password.as_deref().ok_or_else(|| {
                AppError::Bootstrap("CHAT_OWNER_PASSWORD is required to create the owner".into())
            })?;
            self.users
                .create_owner(&owner.handle, password, &owner.display_name)
                .map_err(|e| AppError::Bootstrap(e.to_string()))?;
            info!("Owner account '{}' created", owner.handle);
        }

        let owner_user = self
            .users
            .owner()
            .ok_or_else(|| AppError::Bootstrap("owner missing after creation".into()))?;
        if self.rooms.official_id().is_none() {
            self.rooms.ensure_official(owner_user);
            info!("Official room created");
        }

        self.rooms.clear_members();
        Ok(())
    }

    /// Id of the official room
    pub fn official_room(&self) -> Option<RoomId> {
        self.rooms.official_id()
    }

    /// Owner, or moderator of `room_id`
    pub fn can_moderate(&self, user_id: UserId, room_id: RoomId) -> bool {
        self.users.is_owner(user_id)
            || self.rooms.get(room_id).is_some_and(|r| r.is_moderator(user_id))
    }

    /// Moderator of at least one room
    pub fn is_any_moderator(&self, user_id: UserId) -> bool {
        self.rooms.moderated_by(user_id).next().is_some()
    }

    /// Approve a pending name-change request
    ///
    /// Uniqueness is checked now rather than at filing time; on conflict
    /// the request stays pending. Returns the renamed user and new name.
    pub fn approve_name_change(&mut self, request_id: RequestId) -> Result<(UserId, String), ChatError> {
        let request = self
            .support
            .name_change(request_id)
            .ok_or(ChatError::NotFound("Request"))?;

        self.users.require(request.user_id)?;
        self.users.rename(request.user_id, &request.requested_name)?;
        self.support.remove(request_id);

        Ok((request.user_id, request.requested_name))
    }

    /// Delete an account and every record referencing it
    ///
    /// The owner account cannot be deleted.
    pub fn delete_account(&mut self, target: UserId) -> Result<DeletedAccount, ChatError> {
        let user = self.users.require(target)?;
        if user.is_owner() {
            return Err(ChatError::denied("The owner account cannot be deleted"));
        }

        let affected_rooms = self
            .rooms
            .iter_mut()
            .filter_map(|room| room.purge_user(target).then_some(room.id))
            .collect();
        self.private_messages.purge_user(target);
        self.moderation.purge_user(target);
        self.support.purge_user(target);
        self.presence.remove(target);

        let user = self.users.remove(target).ok_or(ChatError::NotFound("User"))?;
        Ok(DeletedAccount {
            user,
            affected_rooms,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::state::rooms::{MessageBody, Room};
    use chrono::Utc;

    pub(crate) fn owner_config() -> OwnerConfig {
        OwnerConfig {
            handle: "boss".into(),
            display_name: "The Boss".into(),
            password: Some("hunter22".into()),
        }
    }

    pub(crate) fn bootstrapped() -> AppState {
        let mut state = AppState::new();
        state.bootstrap(&owner_config()).unwrap();
        state
    }

    #[test]
    fn test_bootstrap_idempotent() {
        let mut state = bootstrapped();
        let owner = state.users.owner().unwrap().id;
        let official = state.official_room().unwrap();

        state.bootstrap(&owner_config()).unwrap();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.rooms.len(), 1);
        assert_eq!(state.users.owner().unwrap().id, owner);
        assert_eq!(state.official_room(), Some(official));
        assert!(!state.rooms.get(official).unwrap().has_password());
    }

    #[test]
    fn test_bootstrap_requires_owner_password() {
        let mut state = AppState::new();
        let config = OwnerConfig {
            password: None,
            ..owner_config()
        };
        assert!(matches!(state.bootstrap(&config), Err(AppError::Bootstrap(_))));
    }

    #[test]
    fn test_snapshot_round_trip_skips_presence() {
        let mut state = bootstrapped();
        let ana = state.users.register("ana", "secret1", "Ana", "princess").unwrap();
        state.presence.touch(ana, Utc::now());
        let official = state.official_room().unwrap();
        state.rooms.get_mut(official).unwrap().add_member(ana);

        let json = state.to_json().unwrap();
        let mut restored = AppState::from_json(&json).unwrap();
        assert_eq!(restored.users.len(), 2);
        assert!(!restored.presence.is_online(ana));
        assert_eq!(restored.users.authenticate("ana", "secret1"), Ok(ana));

        restored.bootstrap(&owner_config()).unwrap();
        assert!(restored.rooms.get(official).unwrap().members.is_empty());
    }

    #[test]
    fn test_empty_snapshot_parses() {
        let state = AppState::from_json("{}").unwrap();
        assert!(state.users.is_empty());
    }

    #[test]
    fn test_approve_name_change_conflict_keeps_request() {
        let mut state = bootstrapped();
        let ana = state.users.register("ana", "pw", "Ana", "").unwrap();
        let ana_user = state.users.get(ana).unwrap().clone();
        let request = state
            .support
            .file_name_change(&ana_user, "Taken".into(), Utc::now());

        state.users.register("tim", "pw", "Taken", "").unwrap();
        assert_eq!(state.approve_name_change(request), Err(ChatError::NameConflict));
        assert!(state.support.name_change(request).is_some());

        let tim = state.users.find_by_handle("tim").unwrap().id;
        state.users.rename(tim, "Timothy").unwrap();
        assert_eq!(state.approve_name_change(request), Ok((ana, "Taken".to_string())));
        assert!(state.support.name_change(request).is_none());
        assert_eq!(state.users.get(ana).unwrap().display_name, "Taken");
    }

    #[test]
    fn test_delete_account_cascades() {
        let mut state = bootstrapped();
        let owner = state.users.owner().unwrap().clone();
        let ana = state.users.register("ana", "pw", "Ana", "").unwrap();
        let bob = state.users.register("bob", "pw", "Bob", "").unwrap();
        let ana_user = state.users.get(ana).unwrap().clone();
        let bob_user = state.users.get(bob).unwrap().clone();

        let mut room = Room::new("Side", "", &owner, None);
        room.add_member(ana);
        room.add_moderator(ana);
        let msg = room.compose(&ana_user, MessageBody::Text { text: "hi".into() });
        room.push_message(msg);
        let room_id = state.rooms.insert(room);

        state.private_messages.send(&bob_user, ana, "yo".into(), Utc::now());
        state.moderation.mute(&ana_user, &owner, 0, "", None, Utc::now()).unwrap();
        state.moderation.block(bob, ana).unwrap();
        state.support.file_name_change(&ana_user, "Anna".into(), Utc::now());

        let deleted = state.delete_account(ana).unwrap();
        assert_eq!(deleted.user.id, ana);
        assert_eq!(deleted.affected_rooms, vec![room_id]);

        let room = state.rooms.get(room_id).unwrap();
        assert!(room.members.is_empty());
        assert!(room.moderators.is_empty());
        assert!(room.messages.is_empty());
        assert!(state.private_messages.thread(bob, ana, 10).is_empty());
        assert!(!state.moderation.has_blocked(bob, ana));
        assert!(state.support.is_empty());
        assert!(!state.users.contains(ana));
    }

    #[test]
    fn test_owner_cannot_be_deleted() {
        let mut state = bootstrapped();
        let owner = state.users.owner().unwrap().id;
        assert!(matches!(
            state.delete_account(owner),
            Err(ChatError::PermissionDenied(_))
        ));
    }
}
