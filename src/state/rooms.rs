//! Room registry
//!
//! Rooms with their membership, moderators, bounded message log,
//! silence flag and attached media.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::state::users::User;
use crate::types::{MessageId, RoomId, UserId};
use crate::validation;

/// Maximum messages kept per room; oldest are evicted first
pub const MAX_HISTORY: usize = 500;

const OFFICIAL_ROOM_NAME: &str = "Global";
const OFFICIAL_ROOM_DESCRIPTION: &str = "Main room for everyone";
const DEFAULT_ROOM_NAME: &str = "Untitled";
const DEFAULT_MUSIC_VOLUME: f32 = 0.5;

/// Message payload by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    Text { text: String },
    Image { url: String },
    Video { url: String },
}

/// A message in a room log
///
/// Author name, avatar and badges are snapshots taken at send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_avatar: String,
    pub author_picture: Option<String>,
    #[serde(flatten)]
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
    pub is_owner: bool,
    pub is_moderator: bool,
}

/// Media attached to a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMedia {
    pub video_url: Option<String>,
    pub music_url: Option<String>,
    pub music_volume: f32,
}

impl Default for RoomMedia {
    fn default() -> Self {
        Self {
            video_url: None,
            music_url: None,
            music_volume: DEFAULT_MUSIC_VOLUME,
        }
    }
}

/// Room directory entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub created_by: String,
    pub user_count: usize,
    pub has_password: bool,
    pub is_official: bool,
}

/// Chat room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub creator_id: UserId,
    /// Creator display name at creation time
    pub created_by: String,
    pub is_official: bool,
    pub password_hash: Option<String>,
    /// Member user ids in join order
    pub members: Vec<UserId>,
    pub moderators: Vec<UserId>,
    pub messages: VecDeque<ChatMessage>,
    pub is_silenced: bool,
    #[serde(default)]
    pub media: RoomMedia,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Create a room owned by `creator`
    ///
    /// The name falls back to "Untitled"; name and description are truncated.
    pub fn new(name: &str, description: &str, creator: &User, password_hash: Option<String>) -> Self {
        let name = name.trim();
        let name = if name.is_empty() { DEFAULT_ROOM_NAME } else { name };

        Self {
            id: RoomId::new(),
            name: validation::truncate_chars(name, validation::MAX_ROOM_NAME_CHARS),
            description: validation::truncate_chars(
                description.trim(),
                validation::MAX_ROOM_DESCRIPTION_CHARS,
            ),
            creator_id: creator.id,
            created_by: creator.display_name.clone(),
            is_official: false,
            password_hash,
            members: Vec::new(),
            moderators: Vec::new(),
            messages: VecDeque::new(),
            is_silenced: false,
            media: RoomMedia::default(),
            created_at: Utc::now(),
        }
    }

    /// Create the official room, owned by the platform owner
    pub fn official(owner: &User) -> Self {
        Self {
            is_official: true,
            ..Self::new(OFFICIAL_ROOM_NAME, OFFICIAL_ROOM_DESCRIPTION, owner, None)
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn is_member(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }

    /// Add a member (idempotent)
    pub fn add_member(&mut self, user_id: UserId) {
        if !self.is_member(user_id) {
            self.members.push(user_id);
        }
    }

    /// Returns true if the user was a member
    pub fn remove_member(&mut self, user_id: UserId) -> bool {
        let before = self.members.len();
        self.members.retain(|id| *id != user_id);
        self.members.len() != before
    }

    pub fn is_moderator(&self, user_id: UserId) -> bool {
        self.moderators.contains(&user_id)
    }

    pub fn add_moderator(&mut self, user_id: UserId) {
        if !self.is_moderator(user_id) {
            self.moderators.push(user_id);
        }
    }

    pub fn remove_moderator(&mut self, user_id: UserId) -> bool {
        let before = self.moderators.len();
        self.moderators.retain(|id| *id != user_id);
        self.moderators.len() != before
    }

    /// Build a message authored by `author` with its badge snapshot
    pub fn compose(&self, author: &User, body: MessageBody) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(),
            room_id: self.id,
            author_id: author.id,
            author_name: author.display_name.clone(),
            author_avatar: author.avatar.clone(),
            author_picture: author.profile_picture.clone(),
            body,
            created_at: Utc::now(),
            edited: false,
            is_owner: author.is_owner(),
            is_moderator: self.is_moderator(author.id),
        }
    }

    /// Append to the log, evicting the oldest entries beyond `MAX_HISTORY`
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > MAX_HISTORY {
            self.messages.pop_front();
        }
    }

    /// Edit a text message in place
    ///
    /// Only the original author may edit, and only text messages.
    /// Author and timestamp are never touched.
    pub fn edit_message(
        &mut self,
        message_id: MessageId,
        editor: UserId,
        new_text: &str,
    ) -> Result<&ChatMessage, ChatError> {
        let new_text = validation::message_text(new_text)?;
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(ChatError::NotFound("Message"))?;

        if message.author_id != editor {
            return Err(ChatError::denied("Only the author can edit this message"));
        }
        match &mut message.body {
            MessageBody::Text { text } => *text = new_text,
            _ => {
                return Err(ChatError::Validation(
                    "Only text messages can be edited".to_string(),
                ))
            }
        }
        message.edited = true;
        Ok(message)
    }

    /// Remove a message; returns true if it existed
    pub fn delete_message(&mut self, message_id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != message_id);
        self.messages.len() != before
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// The last `count` messages, oldest first
    pub fn recent_messages(&self, count: usize) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(count);
        self.messages.iter().skip(skip).cloned().collect()
    }

    /// Strip every trace of a user from the room
    ///
    /// Returns true if membership, moderators or the log changed.
    pub fn purge_user(&mut self, user_id: UserId) -> bool {
        let removed_member = self.remove_member(user_id);
        let removed_moderator = self.remove_moderator(user_id);
        let before = self.messages.len();
        self.messages.retain(|m| m.author_id != user_id);
        removed_member || removed_moderator || self.messages.len() != before
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            created_by: self.created_by.clone(),
            user_count: self.members.len(),
            has_password: self.has_password(),
            is_official: self.is_official,
        }
    }
}

/// All rooms keyed by id
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    /// Look up a room or fail with `NotFound`
    pub fn require(&self, id: RoomId) -> Result<&Room, ChatError> {
        self.rooms.get(&id).ok_or(ChatError::NotFound("Room"))
    }

    pub fn require_mut(&mut self, id: RoomId) -> Result<&mut Room, ChatError> {
        self.rooms.get_mut(&id).ok_or(ChatError::NotFound("Room"))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.rooms.values_mut()
    }

    pub fn insert(&mut self, room: Room) -> RoomId {
        let id = room.id;
        self.rooms.insert(id, room);
        id
    }

    /// Id of the official room, if bootstrapped
    pub fn official_id(&self) -> Option<RoomId> {
        self.rooms.values().find(|r| r.is_official).map(|r| r.id)
    }

    /// Create the official room unless one exists
    pub fn ensure_official(&mut self, owner: &User) -> RoomId {
        match self.official_id() {
            Some(id) => id,
            None => self.insert(Room::official(owner)),
        }
    }

    /// Delete a room; the official room can never be deleted
    pub fn remove(&mut self, id: RoomId) -> Result<Room, ChatError> {
        let room = self.require(id)?;
        if room.is_official {
            return Err(ChatError::denied("The official room cannot be deleted"));
        }
        self.rooms.remove(&id).ok_or(ChatError::NotFound("Room"))
    }

    /// Drop a user from every member list except the rooms in `keep`
    ///
    /// Returns the rooms whose membership changed.
    pub fn remove_member_everywhere(&mut self, user_id: UserId, keep: &[RoomId]) -> Vec<RoomId> {
        self.rooms
            .values_mut()
            .filter(|room| !keep.contains(&room.id))
            .filter_map(|room| room.remove_member(user_id).then_some(room.id))
            .collect()
    }

    /// Rooms where the user moderates
    pub fn moderated_by(&self, user_id: UserId) -> impl Iterator<Item = &Room> {
        self.rooms.values().filter(move |r| r.is_moderator(user_id))
    }

    /// Rooms where the user is a member
    pub fn rooms_of(&self, user_id: UserId) -> Vec<RoomId> {
        self.rooms
            .values()
            .filter(|r| r.is_member(user_id))
            .map(|r| r.id)
            .collect()
    }

    /// Clear every member list (nobody is connected after a restart)
    pub fn clear_members(&mut self) {
        for room in self.rooms.values_mut() {
            room.members.clear();
        }
    }

    /// Directory listing: official room first, then by member count
    pub fn directory(&self) -> Vec<RoomSummary> {
        let mut list: Vec<RoomSummary> = self.rooms.values().map(Room::summary).collect();
        list.sort_by(|a, b| {
            b.is_official
                .cmp(&a.is_official)
                .then(b.user_count.cmp(&a.user_count))
                .then_with(|| a.name.cmp(&b.name))
        });
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::users::tests::user;
    use crate::state::users::Role;

    fn text(text: &str) -> MessageBody {
        MessageBody::Text {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_room_creation_defaults() {
        let creator = user("ana", "Ana", Role::Member);
        let room = Room::new("  ", &"d".repeat(600), &creator, None);

        assert_eq!(room.name, "Untitled");
        assert_eq!(room.description.chars().count(), 500);
        assert_eq!(room.creator_id, creator.id);
        assert!(!room.is_official);
        assert!(!room.has_password());
        assert!(room.moderators.is_empty());
    }

    #[test]
    fn test_membership() {
        let creator = user("ana", "Ana", Role::Member);
        let mut room = Room::new("Lounge", "", &creator, None);

        room.add_member(creator.id);
        room.add_member(creator.id);
        assert_eq!(room.members.len(), 1);
        assert!(room.is_member(creator.id));

        assert!(room.remove_member(creator.id));
        assert!(!room.remove_member(creator.id));
    }

    #[test]
    fn test_history_bounded_fifo() {
        let author = user("ana", "Ana", Role::Member);
        let mut room = Room::new("Lounge", "", &author, None);

        for i in 0..(MAX_HISTORY + 20) {
            let msg = room.compose(&author, text(&i.to_string()));
            room.push_message(msg);
        }

        assert_eq!(room.messages.len(), MAX_HISTORY);
        assert_eq!(room.messages.front().unwrap().body, text("20"));
        assert_eq!(
            room.messages.back().unwrap().body,
            text(&(MAX_HISTORY + 19).to_string())
        );
    }

    #[test]
    fn test_edit_only_by_author() {
        let author = user("ana", "Ana", Role::Member);
        let other = user("bob", "Bob", Role::Member);
        let mut room = Room::new("Lounge", "", &author, None);
        let msg = room.compose(&author, text("hello"));
        let (id, created_at) = (msg.id, msg.created_at);
        room.push_message(msg);

        assert!(matches!(
            room.edit_message(id, other.id, "hacked"),
            Err(ChatError::PermissionDenied(_))
        ));

        let long = "y".repeat(1500);
        let edited = room.edit_message(id, author.id, &long).unwrap();
        assert!(edited.edited);
        assert_eq!(edited.author_id, author.id);
        assert_eq!(edited.created_at, created_at);
        assert_eq!(edited.body, text(&"y".repeat(1000)));

        assert_eq!(
            room.edit_message(MessageId::new(), author.id, "x").unwrap_err(),
            ChatError::NotFound("Message")
        );
    }

    #[test]
    fn test_edit_rejects_media() {
        let author = user("ana", "Ana", Role::Member);
        let mut room = Room::new("Lounge", "", &author, None);
        let msg = room.compose(
            &author,
            MessageBody::Image {
                url: "https://x.io/a.png".into(),
            },
        );
        let id = msg.id;
        room.push_message(msg);

        assert!(matches!(
            room.edit_message(id, author.id, "text"),
            Err(ChatError::Validation(_))
        ));
    }

    #[test]
    fn test_official_room_cannot_be_deleted() {
        let owner = user("boss", "Boss", Role::Owner);
        let mut registry = RoomRegistry::new();
        let official = registry.ensure_official(&owner);
        assert_eq!(registry.ensure_official(&owner), official);

        assert!(matches!(
            registry.remove(official),
            Err(ChatError::PermissionDenied(_))
        ));

        let other = registry.insert(Room::new("Side", "", &owner, None));
        assert!(registry.remove(other).is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_directory_order() {
        let owner = user("boss", "Boss", Role::Owner);
        let mut registry = RoomRegistry::new();
        registry.ensure_official(&owner);

        let mut busy = Room::new("Busy", "", &owner, None);
        busy.add_member(UserId::new());
        busy.add_member(UserId::new());
        registry.insert(busy);
        registry.insert(Room::new("Quiet", "", &owner, None));

        let names: Vec<String> = registry.directory().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Global", "Busy", "Quiet"]);
    }

    #[test]
    fn test_purge_user() {
        let ana = user("ana", "Ana", Role::Member);
        let bob = user("bob", "Bob", Role::Member);
        let mut room = Room::new("Lounge", "", &ana, None);
        room.add_member(ana.id);
        room.add_member(bob.id);
        room.add_moderator(bob.id);
        let m1 = room.compose(&bob, text("hi"));
        let m2 = room.compose(&ana, text("hey"));
        room.push_message(m1);
        room.push_message(m2);

        assert!(room.purge_user(bob.id));
        assert!(!room.is_member(bob.id));
        assert!(!room.is_moderator(bob.id));
        assert_eq!(room.messages.len(), 1);
        assert!(!room.purge_user(bob.id));
    }

    #[test]
    fn test_message_wire_shape() {
        let author = user("ana", "Ana", Role::Member);
        let room = Room::new("Lounge", "", &author, None);
        let msg = room.compose(&author, text("hello"));

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["text"], "hello");
        assert_eq!(json["authorName"], "Ana");
        assert_eq!(json["edited"], false);
    }
}
