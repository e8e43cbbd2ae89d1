//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety. Every identifier wraps a
//! UUID v4 and serializes as a plain string, so it can be used both as a
//! JSON field and as a JSON object key in the persisted snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Live connection identifier. Never persisted; a reconnect gets a new one.
    ClientId
);

define_id!(
    /// Registered user identifier
    UserId
);

define_id!(
    /// Room identifier
    RoomId
);

define_id!(
    /// Room or private message identifier
    MessageId
);

define_id!(
    /// Support inbox entry identifier (support messages and name-change requests)
    RequestId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
        assert_ne!(UserId::new(), UserId::new());
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = RoomId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));

        let back: RoomId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_as_map_key() {
        let mut map = std::collections::HashMap::new();
        let id = UserId::new();
        map.insert(id, 1u8);

        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::HashMap<UserId, u8> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&id), Some(&1));
    }
}
