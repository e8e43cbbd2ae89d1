//! Credential store
//!
//! Registration and authentication over the user registry. Plaintext
//! passwords are hashed immediately and never stored or logged.

use chrono::Utc;

use crate::error::ChatError;
use crate::password::{hash_password, verify_password};
use crate::state::users::{Gender, Role, User, UserRegistry};
use crate::types::UserId;
use crate::validation;

impl UserRegistry {
    /// Register a new member account
    ///
    /// Handle and display name are both checked case-insensitively
    /// against every existing user before anything is created.
    pub fn register(
        &mut self,
        handle: &str,
        password: &str,
        display_name: &str,
        gender_tag: &str,
    ) -> Result<UserId, ChatError> {
        let handle = validation::handle(handle)?;
        let display_name = validation::display_name(display_name)?;
        if password.is_empty() {
            return Err(ChatError::Validation("Password is required".to_string()));
        }

        if self.find_by_handle(&handle).is_some() {
            return Err(ChatError::HandleTaken);
        }
        if self.display_name_taken(&display_name, None) {
            return Err(ChatError::DisplayNameTaken);
        }

        let gender = Gender::from_tag(gender_tag);
        self.insert(User {
            id: UserId::new(),
            handle,
            display_name,
            password_hash: hash_password(password)?,
            role: Role::Member,
            gender,
            avatar: gender.avatar().to_string(),
            profile_picture: None,
            name_change_count: 0,
            can_send_images: false,
            can_send_videos: false,
            joined_at: Utc::now(),
        })
    }

    /// Create the owner account
    ///
    /// Fails if an owner already exists.
    pub fn create_owner(
        &mut self,
        handle: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserId, ChatError> {
        if self.owner().is_some() {
            return Err(ChatError::denied("An owner already exists"));
        }
        let handle = validation::handle(handle)?;
        let display_name = validation::display_name(display_name)?;
        if self.find_by_handle(&handle).is_some() {
            return Err(ChatError::HandleTaken);
        }
        if self.display_name_taken(&display_name, None) {
            return Err(ChatError::DisplayNameTaken);
        }

        self.insert(User {
            id: UserId::new(),
            handle,
            display_name,
            password_hash: hash_password(password)?,
            role: Role::Owner,
            gender: Gender::Prince,
            avatar: "👑".to_string(),
            profile_picture: None,
            name_change_count: 0,
            can_send_images: true,
            can_send_videos: true,
            joined_at: Utc::now(),
        })
    }

    /// Check a handle/password pair
    ///
    /// Unknown handles and wrong passwords both yield `InvalidCredentials`.
    pub fn authenticate(&self, handle: &str, password: &str) -> Result<UserId, ChatError> {
        let user = self
            .find_by_handle(handle.trim())
            .ok_or(ChatError::InvalidCredentials)?;

        if verify_password(password, &user.password_hash) {
            Ok(user.id)
        } else {
            Err(ChatError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_authenticate() {
        let mut registry = UserRegistry::new();
        let id = registry.register("ana", "secret1", "Ana", "princess").unwrap();

        let user = registry.get(id).unwrap();
        assert_eq!(user.name_change_count, 0);
        assert!(!user.is_owner());
        assert_eq!(user.gender, Gender::Princess);
        assert_ne!(user.password_hash, "secret1");

        assert_eq!(registry.authenticate("ANA", "secret1"), Ok(id));
    }

    #[test]
    fn test_authenticate_failures_indistinguishable() {
        let mut registry = UserRegistry::new();
        registry.register("ana", "secret1", "Ana", "princess").unwrap();

        assert_eq!(
            registry.authenticate("ana", "wrong"),
            Err(ChatError::InvalidCredentials)
        );
        assert_eq!(
            registry.authenticate("nobody", "secret1"),
            Err(ChatError::InvalidCredentials)
        );
    }

    #[test]
    fn test_register_conflicts() {
        let mut registry = UserRegistry::new();
        registry.register("ana", "secret1", "Ana", "princess").unwrap();

        assert_eq!(
            registry.register("AnA", "pw", "Other", "prince"),
            Err(ChatError::HandleTaken)
        );
        assert_eq!(
            registry.register("bob", "pw", "aNa", "prince"),
            Err(ChatError::DisplayNameTaken)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_missing_fields() {
        let mut registry = UserRegistry::new();
        assert!(matches!(
            registry.register("", "pw", "Name", ""),
            Err(ChatError::Validation(_))
        ));
        assert!(matches!(
            registry.register("bob", "", "Bobby", ""),
            Err(ChatError::Validation(_))
        ));
    }

    #[test]
    fn test_create_owner_once() {
        let mut registry = UserRegistry::new();
        let id = registry.create_owner("boss", "pw", "The Boss").unwrap();
        assert!(registry.is_owner(id));
        assert!(registry.get(id).unwrap().can_send_videos);

        assert!(registry.create_owner("boss2", "pw", "Other Boss").is_err());
    }
}
