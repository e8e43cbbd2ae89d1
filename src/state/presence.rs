//! Presence tracker
//!
//! Ephemeral last-seen map, rebuilt from live connections. Never persisted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::UserId;

#[derive(Debug, Default)]
pub struct Presence {
    last_seen: HashMap<UserId, DateTime<Utc>>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark online (login or liveness ping)
    pub fn touch(&mut self, user_id: UserId, now: DateTime<Utc>) {
        self.last_seen.insert(user_id, now);
    }

    pub fn remove(&mut self, user_id: UserId) {
        self.last_seen.remove(&user_id);
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.last_seen.contains_key(&user_id)
    }

    pub fn last_seen(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.last_seen.get(&user_id).copied()
    }

    pub fn online_count(&self) -> usize {
        self.last_seen.len()
    }
}
