//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Every frame carries a
//! kebab-case `"type"` tag and camelCase fields.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::state::moderation::{BannedEntry, MutedEntry};
use crate::state::private::PrivateMessage;
use crate::state::rooms::{ChatMessage, Room, RoomMedia, RoomSummary};
use crate::state::settings::{SettingsUpdate, SystemSettings, VideoKind, VideoSession, VideoSize};
use crate::state::support::SupportEntry;
use crate::state::users::{Gender, User};
use crate::types::{ClientId, MessageId, RequestId, RoomId, UserId};

/// Client → Server message
///
/// Unknown `type` values and wrong field types are rejected at parse time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    // Auth
    Login {
        handle: String,
        password: String,
    },
    Register {
        handle: String,
        password: String,
        display_name: String,
        #[serde(default)]
        gender_tag: String,
    },

    // Profile
    UpdateProfilePicture {
        #[serde(default)]
        url: Option<String>,
    },
    ChangeDisplayName {
        new_name: String,
    },
    RequestNameChange {
        new_name: String,
    },
    ApproveNameChange {
        request_id: RequestId,
    },
    SetMediaPermissions {
        user_id: UserId,
        #[serde(default)]
        can_send_images: Option<bool>,
        #[serde(default)]
        can_send_videos: Option<bool>,
    },
    DeleteAccount {
        user_id: UserId,
    },

    // Room messages
    SendMessage {
        text: String,
    },
    EditMessage {
        message_id: MessageId,
        new_text: String,
    },
    DeleteMessage {
        room_id: RoomId,
        message_id: MessageId,
    },
    SendImage {
        url: String,
    },
    SendVideo {
        url: String,
    },

    // Rooms
    CreateRoom {
        #[serde(default)]
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        password: Option<String>,
    },
    JoinRoom {
        room_id: RoomId,
        #[serde(default)]
        password: Option<String>,
    },
    /// Absent fields are left unchanged; an empty password removes it
    UpdateRoom {
        room_id: RoomId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
    DeleteRoom {
        room_id: RoomId,
    },
    CleanChat {
        room_id: RoomId,
    },
    CleanAllRooms,
    SilenceRoom {
        room_id: RoomId,
    },
    UnsilenceRoom {
        room_id: RoomId,
    },
    GetRoomMedia {
        room_id: RoomId,
    },
    /// Absent fields are left unchanged; empty URLs clear them
    UpdateRoomMedia {
        room_id: RoomId,
        #[serde(default)]
        video_url: Option<String>,
        #[serde(default)]
        music_url: Option<String>,
        #[serde(default)]
        music_volume: Option<f32>,
    },
    AddModerator {
        room_id: RoomId,
        user_id: UserId,
    },
    RemoveModerator {
        room_id: RoomId,
        user_id: UserId,
    },

    // Moderation
    MuteUser {
        user_id: UserId,
        #[serde(default)]
        duration_minutes: u32,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    UnmuteUser {
        user_id: UserId,
    },
    UnmuteMultiple {
        user_ids: Vec<UserId>,
    },
    BanUser {
        user_id: UserId,
        #[serde(default)]
        reason: String,
    },
    UnbanUser {
        user_id: UserId,
    },
    UnbanMultiple {
        user_ids: Vec<UserId>,
    },
    GetMutedList,
    GetBannedList,

    // Private messages
    SendPrivateMessage {
        to_user_id: UserId,
        text: String,
    },
    EditPrivateMessage {
        with_user_id: UserId,
        message_id: MessageId,
        new_text: String,
    },
    GetPrivateMessages {
        with_user_id: UserId,
    },
    BlockUser {
        user_id: UserId,
    },
    UnblockUser {
        user_id: UserId,
    },

    // Support inbox
    SendSupportMessage {
        text: String,
        #[serde(default)]
        from: Option<String>,
    },
    GetSupportMessages,
    DeleteSupportMessage {
        request_id: RequestId,
    },

    // System settings
    UpdateSettings(SettingsUpdate),
    /// `videoType` because `type` is the event tag
    StartVideoWatch {
        url: String,
        #[serde(default)]
        video_type: Option<VideoKind>,
        #[serde(default)]
        size: Option<VideoSize>,
    },
    StopVideoWatch,
    VideoResize {
        size: VideoSize,
    },
    TogglePartyMode {
        #[serde(default)]
        room_id: Option<RoomId>,
        enabled: bool,
    },

    // Listings
    GetRooms,
    GetUsers {
        #[serde(default)]
        room_id: Option<RoomId>,
    },

    /// Liveness signal; refreshes presence
    Ping,
}

/// The requesting user's own profile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub handle: String,
    pub display_name: String,
    pub avatar: String,
    pub gender: Gender,
    pub profile_picture: Option<String>,
    pub is_owner: bool,
    /// Moderates at least one room
    pub is_moderator: bool,
    pub name_change_count: u8,
    /// `None` means unlimited
    pub remaining_name_changes: Option<u8>,
    pub can_send_images: bool,
    pub can_send_videos: bool,
}

impl UserProfile {
    pub fn new(user: &User, is_moderator: bool) -> Self {
        Self {
            id: user.id,
            handle: user.handle.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            gender: user.gender,
            profile_picture: user.profile_picture.clone(),
            is_owner: user.is_owner(),
            is_moderator,
            name_change_count: user.name_change_count,
            remaining_name_changes: user.remaining_name_changes(),
            can_send_images: user.can_send_images,
            can_send_videos: user.can_send_videos,
        }
    }
}

/// A row of a users listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    pub id: UserId,
    pub display_name: String,
    pub avatar: String,
    pub profile_picture: Option<String>,
    pub is_owner: bool,
    /// Moderator of the listed room
    pub is_moderator: bool,
    pub is_online: bool,
}

/// A room as shown to someone who just entered it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub is_official: bool,
    pub has_password: bool,
    pub is_silenced: bool,
    pub party_mode: bool,
    pub moderators: Vec<UserId>,
    pub media: RoomMedia,
    pub messages: Vec<ChatMessage>,
}

impl RoomView {
    pub fn new(room: &Room, party_mode: bool, history: usize) -> Self {
        Self {
            id: room.id,
            name: room.name.clone(),
            description: room.description.clone(),
            is_official: room.is_official,
            has_password: room.has_password(),
            is_silenced: room.is_silenced,
            party_mode,
            moderators: room.moderators.clone(),
            media: room.media.clone(),
            messages: room.recent_messages(history),
        }
    }
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Connection accepted, client ID issued
    Connected { client_id: ClientId },
    /// Error occurred; only ever sent to the requester
    Error { code: ErrorCode, message: String },
    /// Generic acknowledgment of a privileged action
    ActionSuccess { message: String },
    Pong,

    // Auth
    LoginSuccess {
        user: UserProfile,
        room: RoomView,
        settings: SystemSettings,
        video: Option<VideoSession>,
        blocked_users: Vec<UserId>,
    },
    RegisterSuccess { handle: String, message: String },

    // Profile
    ProfileUpdated { user: UserProfile },
    DisplayNameChanged {
        display_name: String,
        remaining_name_changes: Option<u8>,
    },
    NameChangeRequested { request_id: RequestId, requested_name: String },
    NameChangeApproved { display_name: String },
    AccountDeleted { message: String },

    // Room messages
    NewMessage { message: ChatMessage },
    MessageEdited { message: ChatMessage },
    MessageDeleted { room_id: RoomId, message_id: MessageId },

    // Rooms
    RoomCreated { room: RoomSummary },
    RoomJoined {
        room: RoomView,
        video: Option<VideoSession>,
    },
    RoomUpdated { room: RoomSummary },
    RoomDeleted { room_id: RoomId, message: String },
    RoomsList { rooms: Vec<RoomSummary> },
    UsersList { room_id: RoomId, users: Vec<UserEntry> },
    ChatCleaned { room_id: RoomId },
    RoomSilenced { room_id: RoomId },
    RoomUnsilenced { room_id: RoomId },
    RoomMedia { room_id: RoomId, media: RoomMedia },
    RoomMediaUpdated { room_id: RoomId, media: RoomMedia },

    // Moderation
    Muted {
        reason: String,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    },
    MutedList { users: Vec<MutedEntry> },
    BannedList { users: Vec<BannedEntry> },
    Banned { reason: String },

    // Private messages
    NewPrivateMessage { message: PrivateMessage },
    PrivateMessageSent { message: PrivateMessage },
    PrivateMessageEdited { message: PrivateMessage },
    PrivateMessagesList {
        with_user_id: UserId,
        messages: Vec<PrivateMessage>,
    },
    BlockList { blocked_users: Vec<UserId> },

    // Support inbox
    SupportMessageSent { request_id: RequestId },
    SupportMessagesList { messages: Vec<SupportEntry> },

    // System settings
    SettingsUpdated { settings: SystemSettings },
    VideoStarted { video: VideoSession },
    VideoStopped,
    VideoResized { video: VideoSession },
    PartyModeChanged { room_id: RoomId, enabled: bool },
}

impl ServerMessage {
    pub fn action(message: impl Into<String>) -> Self {
        Self::ActionSuccess {
            message: message.into(),
        }
    }

    /// Rejection of a frame that could not be parsed
    pub fn invalid(reason: impl std::fmt::Display) -> Self {
        Self::Error {
            code: ErrorCode::InvalidMessage,
            message: format!("Invalid message format: {}", reason),
        }
    }
}

/// Error codes for ServerMessage::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotAuthenticated,
    PermissionDenied,
    NotFound,
    InvalidCredentials,
    HandleTaken,
    DisplayNameTaken,
    NameConflict,
    WrongPassword,
    QuotaExceeded,
    Muted,
    Banned,
    ValidationFailed,
    Blocked,
    NotInRoom,
    RateLimited,
    /// Frame was not valid protocol JSON
    InvalidMessage,
    Internal,
}

impl From<&ChatError> for ErrorCode {
    fn from(err: &ChatError) -> Self {
        match err {
            ChatError::NotAuthenticated => Self::NotAuthenticated,
            ChatError::PermissionDenied(_) => Self::PermissionDenied,
            ChatError::NotFound(_) => Self::NotFound,
            ChatError::InvalidCredentials => Self::InvalidCredentials,
            ChatError::HandleTaken => Self::HandleTaken,
            ChatError::DisplayNameTaken => Self::DisplayNameTaken,
            ChatError::NameConflict => Self::NameConflict,
            ChatError::WrongPassword => Self::WrongPassword,
            ChatError::QuotaExceeded => Self::QuotaExceeded,
            ChatError::Muted => Self::Muted,
            ChatError::Banned { .. } => Self::Banned,
            ChatError::Validation(_) => Self::ValidationFailed,
            ChatError::Blocked => Self::Blocked,
            ChatError::NotInRoom => Self::NotInRoom,
            ChatError::RateLimited => Self::RateLimited,
            ChatError::Internal(_) => Self::Internal,
        }
    }
}

/// Convert ChatError to ServerMessage for client notification
impl From<ChatError> for ServerMessage {
    fn from(err: ChatError) -> Self {
        let code = ErrorCode::from(&err);
        // Internal details stay in the log
        let message = match err {
            ChatError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        };
        ServerMessage::Error { code, message }
    }
}
