//! Moderation state
//!
//! Mutes, bans and per-user block lists. Independent of rooms except for
//! the room a mute is attributed to.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::state::users::User;
use crate::types::{RoomId, UserId};
use crate::validation;

const DEFAULT_MUTE_REASON: &str = "Rule violation";
const DEFAULT_BAN_REASON: &str = "Violation";

/// An active mute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteRecord {
    /// Target display name at mute time
    pub display_name: String,
    pub reason: String,
    pub muted_by: UserId,
    pub muted_by_name: String,
    /// Issued by the owner; only the owner may lift it
    pub by_owner: bool,
    pub issued_at: DateTime<Utc>,
    /// `None` is permanent
    pub expires_at: Option<DateTime<Utc>>,
    pub room_id: Option<RoomId>,
}

impl MuteRecord {
    /// Expired strictly after `expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now > expires)
    }
}

/// An active ban
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRecord {
    pub display_name: String,
    pub reason: String,
    pub banned_by: String,
    pub banned_at: DateTime<Utc>,
}

/// Who is asking to lift a mute
#[derive(Debug, Clone, Copy)]
pub struct Unmuter {
    pub id: UserId,
    pub is_owner: bool,
    /// Moderator of the room the mute is attributed to
    pub is_moderator: bool,
}

/// Mute list entry as reported to moderators
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutedEntry {
    pub user_id: UserId,
    #[serde(flatten)]
    pub record: MuteRecord,
}

/// Ban list entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedEntry {
    pub user_id: UserId,
    #[serde(flatten)]
    pub record: BanRecord,
}

/// Mutes, bans and blocks
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moderation {
    mutes: HashMap<UserId, MuteRecord>,
    bans: HashMap<UserId, BanRecord>,
    blocks: HashMap<UserId, HashSet<UserId>>,
}

impl Moderation {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Mutes
    // =========================================================================

    /// Mute `target`; zero minutes means permanent
    ///
    /// An active owner-issued mute can only be replaced by the owner.
    pub fn mute(
        &mut self,
        target: &User,
        issuer: &User,
        duration_minutes: u32,
        reason: &str,
        room_id: Option<RoomId>,
        now: DateTime<Utc>,
    ) -> Result<&MuteRecord, ChatError> {
        if target.is_owner() {
            return Err(ChatError::denied("The owner cannot be muted"));
        }
        let owner_mute = self
            .active_mute(target.id, now)
            .is_some_and(|m| m.by_owner);
        if owner_mute && !issuer.is_owner() {
            return Err(ChatError::denied("This user was muted by the owner"));
        }

        let expires_at =
            (duration_minutes > 0).then(|| now + Duration::minutes(i64::from(duration_minutes)));
        let record = MuteRecord {
            display_name: target.display_name.clone(),
            reason: reason_or(reason, DEFAULT_MUTE_REASON),
            muted_by: issuer.id,
            muted_by_name: issuer.display_name.clone(),
            by_owner: issuer.is_owner(),
            issued_at: now,
            expires_at,
            room_id,
        };

        self.mutes.insert(target.id, record);
        Ok(&self.mutes[&target.id])
    }

    /// Active mute for a user, purging it first if expired
    pub fn active_mute(&mut self, user_id: UserId, now: DateTime<Utc>) -> Option<&MuteRecord> {
        if self.mutes.get(&user_id).is_some_and(|m| m.is_expired(now)) {
            self.mutes.remove(&user_id);
        }
        self.mutes.get(&user_id)
    }

    pub fn is_muted(&mut self, user_id: UserId, now: DateTime<Utc>) -> bool {
        self.active_mute(user_id, now).is_some()
    }

    /// Whether `requester` may lift this mute
    pub fn can_unmute(record: &MuteRecord, requester: Unmuter) -> bool {
        requester.is_owner
            || (requester.is_moderator && (record.muted_by == requester.id || !record.by_owner))
    }

    /// Lift a mute; returns false if the user was not muted
    pub fn unmute(&mut self, target: UserId, requester: Unmuter) -> Result<bool, ChatError> {
        let Some(record) = self.mutes.get(&target) else {
            return Ok(false);
        };
        if !Self::can_unmute(record, requester) {
            return Err(ChatError::denied("You can only unmute users you muted"));
        }
        self.mutes.remove(&target);
        Ok(true)
    }

    /// Attribution room of a mute, if any
    pub fn mute_room(&self, target: UserId) -> Option<Option<RoomId>> {
        self.mutes.get(&target).map(|m| m.room_id)
    }

    /// Active mutes visible to `viewer`, expired ones purged first
    ///
    /// The owner sees everything; moderators see mutes they issued and
    /// mutes not issued by the owner.
    pub fn muted_list(&mut self, viewer: UserId, viewer_is_owner: bool, now: DateTime<Utc>) -> Vec<MutedEntry> {
        self.mutes.retain(|_, m| !m.is_expired(now));

        let mut list: Vec<MutedEntry> = self
            .mutes
            .iter()
            .filter(|(_, m)| viewer_is_owner || m.muted_by == viewer || !m.by_owner)
            .map(|(id, m)| MutedEntry {
                user_id: *id,
                record: m.clone(),
            })
            .collect();
        list.sort_by_key(|e| e.record.issued_at);
        list
    }

    // =========================================================================
    // Bans
    // =========================================================================

    /// Ban `target`; the owner cannot be banned
    pub fn ban(
        &mut self,
        target: &User,
        issuer: &User,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<&BanRecord, ChatError> {
        if !issuer.is_owner() {
            return Err(ChatError::denied("Only the owner can ban"));
        }
        if target.is_owner() {
            return Err(ChatError::denied("The owner cannot be banned"));
        }

        self.bans.insert(
            target.id,
            BanRecord {
                display_name: target.display_name.clone(),
                reason: reason_or(reason, DEFAULT_BAN_REASON),
                banned_by: issuer.display_name.clone(),
                banned_at: now,
            },
        );
        Ok(&self.bans[&target.id])
    }

    /// Returns true if the user was banned
    pub fn unban(&mut self, target: UserId) -> bool {
        self.bans.remove(&target).is_some()
    }

    pub fn ban_record(&self, user_id: UserId) -> Option<&BanRecord> {
        self.bans.get(&user_id)
    }

    pub fn banned_list(&self) -> Vec<BannedEntry> {
        let mut list: Vec<BannedEntry> = self
            .bans
            .iter()
            .map(|(id, b)| BannedEntry {
                user_id: *id,
                record: b.clone(),
            })
            .collect();
        list.sort_by_key(|e| e.record.banned_at);
        list
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Returns true if newly blocked
    pub fn block(&mut self, blocker: UserId, blocked: UserId) -> Result<bool, ChatError> {
        if blocker == blocked {
            return Err(ChatError::Validation("You cannot block yourself".to_string()));
        }
        Ok(self.blocks.entry(blocker).or_default().insert(blocked))
    }

    /// Returns true if a block was removed
    pub fn unblock(&mut self, blocker: UserId, blocked: UserId) -> bool {
        self.blocks
            .get_mut(&blocker)
            .is_some_and(|set| set.remove(&blocked))
    }

    /// Whether `blocker` has blocked `other`
    pub fn has_blocked(&self, blocker: UserId, other: UserId) -> bool {
        self.blocks
            .get(&blocker)
            .is_some_and(|set| set.contains(&other))
    }

    pub fn blocked_by(&self, blocker: UserId) -> Vec<UserId> {
        let mut list: Vec<UserId> = self
            .blocks
            .get(&blocker)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        list.sort();
        list
    }

    /// Remove every record referencing a user, including mutes they issued
    pub fn purge_user(&mut self, user_id: UserId) {
        self.mutes
            .retain(|target, m| *target != user_id && m.muted_by != user_id);
        self.bans.remove(&user_id);
        self.blocks.remove(&user_id);
        for set in self.blocks.values_mut() {
            set.remove(&user_id);
        }
    }
}

fn reason_or(reason: &str, default: &str) -> String {
    let reason = reason.trim();
    if reason.is_empty() {
        default.to_string()
    } else {
        validation::truncate_chars(reason, validation::MAX_REASON_CHARS)
    }
}
