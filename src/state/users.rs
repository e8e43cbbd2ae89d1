//! User registry
//!
//! Identity, profile, role and capability flags of every registered user,
//! plus the display-name change policy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::types::UserId;
use crate::validation;

/// Free display-name changes granted to non-owners
pub const FREE_NAME_CHANGES: u8 = 2;

/// Platform-wide role. Exactly one user holds `Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Member,
}

/// Gender tag chosen at registration; selects the default avatar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Prince,
    Princess,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Gender {
    /// Lenient parse of a client-supplied tag
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "prince" => Self::Prince,
            "princess" => Self::Princess,
            _ => Self::Unknown,
        }
    }

    pub fn avatar(self) -> &'static str {
        match self {
            Self::Prince => "🤴",
            Self::Princess | Self::Unknown => "👸",
        }
    }
}

/// Registered user record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Login handle, unique case-insensitively
    pub handle: String,
    /// Display name, unique case-insensitively
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
    pub gender: Gender,
    pub avatar: String,
    pub profile_picture: Option<String>,
    /// Free display-name changes used so far
    pub name_change_count: u8,
    pub can_send_images: bool,
    pub can_send_videos: bool,
    pub joined_at: DateTime<Utc>,
}

impl User {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    /// Remaining free name changes; `None` means unlimited
    pub fn remaining_name_changes(&self) -> Option<u8> {
        if self.is_owner() {
            None
        } else {
            Some(FREE_NAME_CHANGES.saturating_sub(self.name_change_count))
        }
    }
}

/// Outcome of a direct display-name change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameChanged {
    pub display_name: String,
    /// `None` for the owner
    pub remaining: Option<u8>,
}

/// All registered users keyed by id
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRegistry {
    users: HashMap<UserId, User>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn get_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    /// Look up a user or fail with `NotFound`
    pub fn require(&self, id: UserId) -> Result<&User, ChatError> {
        self.users.get(&id).ok_or(ChatError::NotFound("User"))
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.users.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn is_owner(&self, id: UserId) -> bool {
        self.users.get(&id).is_some_and(User::is_owner)
    }

    pub fn owner(&self) -> Option<&User> {
        self.users.values().find(|u| u.is_owner())
    }

    /// Case-insensitive handle lookup
    pub fn find_by_handle(&self, handle: &str) -> Option<&User> {
        let handle = handle.to_lowercase();
        self.users
            .values()
            .find(|u| u.handle.to_lowercase() == handle)
    }

    /// Whether `name` is held by anyone other than `exclude`
    pub fn display_name_taken(&self, name: &str, exclude: Option<UserId>) -> bool {
        let name = name.to_lowercase();
        self.users
            .values()
            .any(|u| Some(u.id) != exclude && u.display_name.to_lowercase() == name)
    }

    /// Insert a fully built record
    ///
    /// Refuses a second owner so that the owner role stays a singleton.
    pub(crate) fn insert(&mut self, user: User) -> Result<UserId, ChatError> {
        if user.is_owner() && self.owner().is_some_and(|o| o.id != user.id) {
            return Err(ChatError::denied("An owner already exists"));
        }
        let id = user.id;
        self.users.insert(id, user);
        Ok(id)
    }

    /// Set or clear the profile picture
    pub fn set_profile_picture(
        &mut self,
        id: UserId,
        url: Option<&str>,
    ) -> Result<Option<String>, ChatError> {
        let picture = match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Some(validation::profile_picture_url(url)?),
            None => None,
        };
        let user = self.users.get_mut(&id).ok_or(ChatError::NotFound("User"))?;
        user.profile_picture = picture.clone();
        Ok(picture)
    }

    /// Direct display-name change under the free-change quota
    ///
    /// Owners change freely. Others get `FREE_NAME_CHANGES` changes, after
    /// which `QuotaExceeded` is returned and the record is left untouched.
    pub fn change_display_name(
        &mut self,
        id: UserId,
        new_name: &str,
    ) -> Result<NameChanged, ChatError> {
        let new_name = validation::display_name(new_name)?;
        if self.display_name_taken(&new_name, Some(id)) {
            return Err(ChatError::DisplayNameTaken);
        }

        let user = self.users.get_mut(&id).ok_or(ChatError::NotFound("User"))?;
        if !user.is_owner() {
            if user.name_change_count >= FREE_NAME_CHANGES {
                return Err(ChatError::QuotaExceeded);
            }
            user.name_change_count += 1;
        }
        user.display_name = new_name.clone();

        Ok(NameChanged {
            display_name: new_name,
            remaining: user.remaining_name_changes(),
        })
    }

    /// Rename outside the quota (approved requests)
    ///
    /// Uniqueness is re-checked now; a clash yields `NameConflict`.
    pub fn rename(&mut self, id: UserId, new_name: &str) -> Result<(), ChatError> {
        if self.display_name_taken(new_name, Some(id)) {
            return Err(ChatError::NameConflict);
        }
        let user = self.users.get_mut(&id).ok_or(ChatError::NotFound("User"))?;
        user.display_name = new_name.to_string();
        Ok(())
    }

    /// Grant or revoke media send capabilities
    pub fn set_media_permissions(
        &mut self,
        id: UserId,
        images: Option<bool>,
        videos: Option<bool>,
    ) -> Result<&User, ChatError> {
        let user = self.users.get_mut(&id).ok_or(ChatError::NotFound("User"))?;
        if let Some(images) = images {
            user.can_send_images = images;
        }
        if let Some(videos) = videos {
            user.can_send_videos = videos;
        }
        Ok(user)
    }

    /// Remove a user record; cascading cleanup is done by `AppState`
    pub(crate) fn remove(&mut self, id: UserId) -> Option<User> {
        self.users.remove(&id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn user(handle: &str, display_name: &str, role: Role) -> User {
        User {
            id: UserId::new(),
            handle: handle.to_string(),
            display_name: display_name.to_string(),
            password_hash: String::new(),
            role,
            gender: Gender::Unknown,
            avatar: Gender::Unknown.avatar().to_string(),
            profile_picture: None,
            name_change_count: 0,
            can_send_images: false,
            can_send_videos: false,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_single_owner() {
        let mut registry = UserRegistry::new();
        registry.insert(user("boss", "Boss", Role::Owner)).unwrap();

        let second = registry.insert(user("boss2", "Boss2", Role::Owner));
        assert!(matches!(second, Err(ChatError::PermissionDenied(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_find_by_handle_case_insensitive() {
        let mut registry = UserRegistry::new();
        let id = registry.insert(user("Ana", "Ana", Role::Member)).unwrap();
        assert_eq!(registry.find_by_handle("aNA").map(|u| u.id), Some(id));
    }

    #[test]
    fn test_name_change_quota() {
        let mut registry = UserRegistry::new();
        let id = registry.insert(user("ana", "Ana", Role::Member)).unwrap();

        let first = registry.change_display_name(id, "Anna").unwrap();
        assert_eq!(first.remaining, Some(1));
        let second = registry.change_display_name(id, "Annie").unwrap();
        assert_eq!(second.remaining, Some(0));

        let third = registry.change_display_name(id, "Anya");
        assert_eq!(third, Err(ChatError::QuotaExceeded));
        assert_eq!(registry.get(id).unwrap().display_name, "Annie");
        assert_eq!(registry.get(id).unwrap().name_change_count, 2);
    }

    #[test]
    fn test_owner_unlimited_name_changes() {
        let mut registry = UserRegistry::new();
        let id = registry.insert(user("boss", "Boss", Role::Owner)).unwrap();
        for name in ["King", "Queen", "Jack", "Ace"] {
            let changed = registry.change_display_name(id, name).unwrap();
            assert_eq!(changed.remaining, None);
        }
        assert_eq!(registry.get(id).unwrap().display_name, "Ace");
    }

    #[test]
    fn test_name_uniqueness_excludes_self() {
        let mut registry = UserRegistry::new();
        let ana = registry.insert(user("ana", "Ana", Role::Member)).unwrap();
        registry.insert(user("bob", "Bob", Role::Member)).unwrap();

        assert_eq!(
            registry.change_display_name(ana, "BOB"),
            Err(ChatError::DisplayNameTaken)
        );
        // Changing only the case of your own name is allowed
        assert!(registry.change_display_name(ana, "ANA").is_ok());
    }

    #[test]
    fn test_rename_conflict() {
        let mut registry = UserRegistry::new();
        let ana = registry.insert(user("ana", "Ana", Role::Member)).unwrap();
        registry.insert(user("bob", "Bob", Role::Member)).unwrap();

        assert_eq!(registry.rename(ana, "bob"), Err(ChatError::NameConflict));
        assert!(registry.rename(ana, "Anastasia").is_ok());
    }

    #[test]
    fn test_profile_picture() {
        let mut registry = UserRegistry::new();
        let id = registry.insert(user("ana", "Ana", Role::Member)).unwrap();

        assert!(registry
            .set_profile_picture(id, Some("https://x.io/me.bmp"))
            .is_err());
        let set = registry
            .set_profile_picture(id, Some("https://x.io/me.WEBP"))
            .unwrap();
        assert_eq!(set.as_deref(), Some("https://x.io/me.WEBP"));
        assert_eq!(registry.set_profile_picture(id, None).unwrap(), None);
        assert!(registry.get(id).unwrap().profile_picture.is_none());
    }

    #[test]
    fn test_gender_tag() {
        assert_eq!(Gender::from_tag("Princess"), Gender::Princess);
        assert_eq!(Gender::from_tag("dragon"), Gender::Unknown);
        assert_eq!(Gender::Prince.avatar(), "🤴");
    }
}
