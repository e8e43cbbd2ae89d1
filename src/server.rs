//! ChatServer Actor implementation
//!
//! The central actor owning every live connection and the whole
//! `AppState`. Commands from connection handlers are processed one at a
//! time to completion, so check-then-write sequences need no locking.
//! Every event runs the same pipeline: session check, permission check,
//! payload validation, mutation, then fan-out.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use chrono::Utc;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::config::Config;
use crate::error::ChatError;
use crate::message::{ClientMessage, RoomView, ServerMessage, UserEntry, UserProfile};
use crate::password::{hash_password, verify_password};
use crate::persistence::Persister;
use crate::state::moderation::Unmuter;
use crate::state::rooms::{MessageBody, Room};
use crate::state::settings::{SettingsUpdate, SystemSettings, VideoKind, VideoSize};
use crate::state::AppState;
use crate::types::{ClientId, MessageId, RequestId, RoomId, UserId};
use crate::validation;

/// Messages included when a room is entered
pub const ROOM_HISTORY_TAIL: usize = 50;

const ANONYMOUS: &str = "Anonymous";
const MIN_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Client disconnected
    Disconnect { client_id: ClientId },
    /// Parsed inbound event
    Event {
        client_id: ClientId,
        message: ClientMessage,
    },
    /// Inbound frame that failed to parse
    Malformed { client_id: ClientId, reason: String },
    /// Current system settings, for the HTTP surface
    GetSettings {
        reply: oneshot::Sender<SystemSettings>,
    },
    /// Stop accepting commands, drain the queue, flush and exit
    Shutdown,
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All live connections: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// Every store, owned exclusively by the actor
    state: AppState,
    persister: Persister,
    flush_interval: Duration,
    /// Login attempts keyed by lowercase handle
    login_limiter: DefaultKeyedRateLimiter<String>,
    /// Room password attempts keyed by user and room
    join_limiter: DefaultKeyedRateLimiter<(UserId, RoomId)>,
    /// Set by any handler that mutated persistent state
    dirty: bool,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer over an already bootstrapped state
    pub fn new(
        receiver: mpsc::Receiver<ServerCommand>,
        state: AppState,
        persister: Persister,
        config: &Config,
    ) -> Self {
        let attempts =
            NonZeroU32::new(config.login_attempts_per_minute).unwrap_or(NonZeroU32::MIN);

        Self {
            clients: HashMap::new(),
            state,
            persister,
            flush_interval: config.flush_interval.max(MIN_FLUSH_INTERVAL),
            login_limiter: RateLimiter::keyed(Quota::per_minute(attempts)),
            join_limiter: RateLimiter::keyed(Quota::per_minute(attempts)),
            dirty: false,
            receiver,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the ChatServer event loop
    ///
    /// Processes commands until every sender is dropped or `Shutdown` is
    /// received, flushing on a fixed interval and once more on exit.
    pub async fn run(mut self) {
        info!("ChatServer started");

        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.login_limiter.retain_recent();
                    self.join_limiter.retain_recent();
                    self.flush();
                }
            }
        }

        self.flush();
        info!("ChatServer shutting down");
    }

    /// Process a single command
    pub fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::Event { client_id, message } => {
                self.handle_event(client_id, message);
            }
            ServerCommand::Malformed { client_id, reason } => {
                warn!("Malformed frame from {}: {}", client_id, reason);
                self.send_to(client_id, ServerMessage::invalid(reason));
            }
            ServerCommand::GetSettings { reply } => {
                let _ = reply.send(self.state.settings.clone());
            }
            ServerCommand::Shutdown => {
                info!("Shutdown requested");
                self.receiver.close();
            }
        }

        if self.dirty {
            self.flush();
        }
    }

    /// Hand the current snapshot to the persister
    fn flush(&mut self) {
        match self.state.to_json() {
            Ok(json) => self.persister.submit(json),
            Err(e) => error!("Failed to serialize state: {}", e),
        }
        self.dirty = false;
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        info!("Client {} connected", client_id);
        self.clients.insert(client_id, Client::new(client_id, sender));
        debug!("Total clients: {}", self.clients.len());
    }

    fn handle_disconnect(&mut self, client_id: ClientId) {
        let Some(client) = self.clients.remove(&client_id) else {
            return;
        };
        info!("Client {} disconnected", client_id);

        if let Some(user_id) = client.user_id {
            self.release_user(user_id);
        }
        debug!("Total clients: {}", self.clients.len());
    }

    /// Drop presence and memberships not held by another live connection
    fn release_user(&mut self, user_id: UserId) {
        let still_in: Vec<RoomId> = self
            .clients
            .values()
            .filter(|c| c.is_user(user_id))
            .filter_map(|c| c.current_room)
            .collect();
        if !self.clients.values().any(|c| c.is_user(user_id)) {
            self.state.presence.remove(user_id);
        }

        let left = self.state.rooms.remove_member_everywhere(user_id, &still_in);
        for room_id in &left {
            self.broadcast_users_list(*room_id);
        }
        if !left.is_empty() {
            self.broadcast_rooms_list();
        }
    }

    /// Remove every connection bound to a user after sending `farewell`
    ///
    /// Dropping the client closes its outbound queue; the write task
    /// delivers what is queued and then closes the socket.
    fn close_user_connections(&mut self, user_id: UserId, farewell: ServerMessage) -> usize {
        let ids: Vec<ClientId> = self
            .clients
            .values()
            .filter(|c| c.is_user(user_id))
            .map(|c| c.id)
            .collect();

        for id in &ids {
            if let Some(client) = self.clients.remove(id) {
                if let Err(e) = client.send(farewell.clone()) {
                    debug!("Farewell to {} not delivered: {}", id, e);
                }
            }
        }
        ids.len()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn handle_event(&mut self, client_id: ClientId, message: ClientMessage) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };
        let session = client.user_id;

        if let Err(err) = self.dispatch(client_id, session, message) {
            match &err {
                ChatError::Internal(detail) => error!("Event from {} failed: {}", client_id, detail),
                other => debug!("Event from {} rejected: {}", client_id, other),
            }
            self.send_to(client_id, err.into());
        }
    }

    /// Route one event to its handler
    ///
    /// Everything except login, register, support messages and ping needs
    /// a bound user.
    fn dispatch(
        &mut self,
        client_id: ClientId,
        session: Option<UserId>,
        message: ClientMessage,
    ) -> Result<(), ChatError> {
        let user = move || session.ok_or(ChatError::NotAuthenticated);

        match message {
            // Public
            ClientMessage::Login { handle, password } => {
                self.handle_login(client_id, &handle, &password)
            }
            ClientMessage::Register {
                handle,
                password,
                display_name,
                gender_tag,
            } => self.handle_register(client_id, &handle, &password, &display_name, &gender_tag),
            ClientMessage::SendSupportMessage { text, from } => {
                self.handle_support_message(client_id, session, &text, from)
            }
            ClientMessage::Ping => self.handle_ping(client_id, session),

            // Profile
            ClientMessage::UpdateProfilePicture { url } => {
                self.handle_update_profile_picture(user()?, url.as_deref())
            }
            ClientMessage::ChangeDisplayName { new_name } => {
                self.handle_change_display_name(client_id, user()?, &new_name)
            }
            ClientMessage::RequestNameChange { new_name } => {
                self.file_name_change(client_id, user()?, &new_name)
            }
            ClientMessage::ApproveNameChange { request_id } => {
                self.handle_approve_name_change(client_id, user()?, request_id)
            }
            ClientMessage::SetMediaPermissions {
                user_id,
                can_send_images,
                can_send_videos,
            } => self.handle_set_media_permissions(
                client_id,
                user()?,
                user_id,
                can_send_images,
                can_send_videos,
            ),
            ClientMessage::DeleteAccount { user_id } => {
                self.handle_delete_account(client_id, user()?, user_id)
            }

            // Room messages
            ClientMessage::SendMessage { text } => {
                self.handle_send_message(client_id, user()?, &text)
            }
            ClientMessage::SendImage { url } => self.handle_send_image(client_id, user()?, &url),
            ClientMessage::SendVideo { url } => self.handle_send_video(client_id, user()?, &url),
            ClientMessage::EditMessage {
                message_id,
                new_text,
            } => self.handle_edit_message(client_id, user()?, message_id, &new_text),
            ClientMessage::DeleteMessage {
                room_id,
                message_id,
            } => self.handle_delete_message(user()?, room_id, message_id),

            // Rooms
            ClientMessage::CreateRoom {
                name,
                description,
                password,
            } => self.handle_create_room(client_id, user()?, &name, &description, password),
            ClientMessage::JoinRoom { room_id, password } => {
                self.handle_join_room(client_id, user()?, room_id, password.as_deref())
            }
            ClientMessage::UpdateRoom {
                room_id,
                name,
                description,
                password,
            } => self.handle_update_room(client_id, user()?, room_id, name, description, password),
            ClientMessage::DeleteRoom { room_id } => {
                self.handle_delete_room(client_id, user()?, room_id)
            }
            ClientMessage::CleanChat { room_id } => self.handle_clean_chat(user()?, room_id),
            ClientMessage::CleanAllRooms => self.handle_clean_all_rooms(client_id, user()?),
            ClientMessage::SilenceRoom { room_id } => {
                self.handle_set_silenced(user()?, room_id, true)
            }
            ClientMessage::UnsilenceRoom { room_id } => {
                self.handle_set_silenced(user()?, room_id, false)
            }
            ClientMessage::GetRoomMedia { room_id } => {
                user()?;
                self.handle_get_room_media(client_id, room_id)
            }
            ClientMessage::UpdateRoomMedia {
                room_id,
                video_url,
                music_url,
                music_volume,
            } => self.handle_update_room_media(user()?, room_id, video_url, music_url, music_volume),
            ClientMessage::AddModerator { room_id, user_id } => {
                self.handle_set_moderator(client_id, user()?, room_id, user_id, true)
            }
            ClientMessage::RemoveModerator { room_id, user_id } => {
                self.handle_set_moderator(client_id, user()?, room_id, user_id, false)
            }

            // Moderation
            ClientMessage::MuteUser {
                user_id,
                duration_minutes,
                reason,
                room_id,
            } => self.handle_mute(client_id, user()?, user_id, duration_minutes, &reason, room_id),
            ClientMessage::UnmuteUser { user_id } => {
                self.handle_unmute(client_id, user()?, user_id)
            }
            ClientMessage::UnmuteMultiple { user_ids } => {
                self.handle_unmute_multiple(client_id, user()?, &user_ids)
            }
            ClientMessage::BanUser { user_id, reason } => {
                self.handle_ban(client_id, user()?, user_id, &reason)
            }
            ClientMessage::UnbanUser { user_id } => {
                self.handle_unban(client_id, user()?, user_id)
            }
            ClientMessage::UnbanMultiple { user_ids } => {
                self.handle_unban_multiple(client_id, user()?, &user_ids)
            }
            ClientMessage::GetMutedList => self.handle_get_muted_list(client_id, user()?),
            ClientMessage::GetBannedList => self.handle_get_banned_list(client_id, user()?),

            // Private messages
            ClientMessage::SendPrivateMessage { to_user_id, text } => {
                self.handle_send_private_message(user()?, to_user_id, &text)
            }
            ClientMessage::EditPrivateMessage {
                with_user_id,
                message_id,
                new_text,
            } => self.handle_edit_private_message(user()?, with_user_id, message_id, &new_text),
            ClientMessage::GetPrivateMessages { with_user_id } => {
                self.handle_get_private_messages(client_id, user()?, with_user_id)
            }
            ClientMessage::BlockUser { user_id } => self.handle_block(user()?, user_id, true),
            ClientMessage::UnblockUser { user_id } => self.handle_block(user()?, user_id, false),

            // Support inbox
            ClientMessage::GetSupportMessages => {
                self.handle_get_support_messages(client_id, user()?)
            }
            ClientMessage::DeleteSupportMessage { request_id } => {
                self.handle_delete_support_message(client_id, user()?, request_id)
            }

            // System settings
            ClientMessage::UpdateSettings(update) => self.handle_update_settings(user()?, update),
            ClientMessage::StartVideoWatch {
                url,
                video_type,
                size,
            } => self.handle_start_video(user()?, &url, video_type, size),
            ClientMessage::StopVideoWatch => self.handle_stop_video(user()?),
            ClientMessage::VideoResize { size } => self.handle_resize_video(user()?, size),
            ClientMessage::TogglePartyMode { room_id, enabled } => {
                self.handle_toggle_party_mode(client_id, user()?, room_id, enabled)
            }

            // Listings
            ClientMessage::GetRooms => {
                user()?;
                self.send_to(
                    client_id,
                    ServerMessage::RoomsList {
                        rooms: self.state.rooms.directory(),
                    },
                );
                Ok(())
            }
            ClientMessage::GetUsers { room_id } => {
                user()?;
                self.handle_get_users(client_id, room_id)
            }
        }
    }

    // =========================================================================
    // Auth
    // =========================================================================

    fn handle_login(&mut self, client_id: ClientId, handle: &str, password: &str) -> Result<(), ChatError> {
        if self.clients.get(&client_id).is_some_and(Client::is_authenticated) {
            return Err(ChatError::Validation("Already logged in".to_string()));
        }

        let key = handle.trim().to_lowercase();
        if self.login_limiter.check_key(&key).is_err() {
            warn!("Login rate limit hit for '{}'", key);
            return Err(ChatError::RateLimited);
        }

        let user_id = self.state.users.authenticate(handle, password).inspect_err(|_| {
            warn!("Failed login for '{}'", key);
        })?;
        if let Some(ban) = self.state.moderation.ban_record(user_id) {
            info!("Banned user '{}' refused at login", key);
            return Err(ChatError::Banned {
                reason: ban.reason.clone(),
            });
        }
        let official = self.official_room()?;

        if let Some(client) = self.clients.get_mut(&client_id) {
            client.bind(user_id);
        }
        self.state.presence.touch(user_id, Utc::now());
        let left = self.enter_room(client_id, user_id, official);

        let login = ServerMessage::LoginSuccess {
            user: self.profile(user_id)?,
            room: self.room_view(official)?,
            settings: self.state.settings.clone(),
            video: self.state.settings.video.clone(),
            blocked_users: self.state.moderation.blocked_by(user_id),
        };
        self.send_to(client_id, login);
        self.announce_move(left, official);

        info!("Client {} logged in as '{}'", client_id, key);
        Ok(())
    }

    fn handle_register(
        &mut self,
        client_id: ClientId,
        handle: &str,
        password: &str,
        display_name: &str,
        gender_tag: &str,
    ) -> Result<(), ChatError> {
        let user_id = self
            .state
            .users
            .register(handle, password, display_name, gender_tag)?;
        self.dirty = true;

        let handle = handle.trim().to_string();
        info!("Registered user '{}' ({})", handle, user_id);
        self.send_to(
            client_id,
            ServerMessage::RegisterSuccess {
                handle,
                message: "Account created".to_string(),
            },
        );
        Ok(())
    }

    fn handle_ping(&mut self, client_id: ClientId, session: Option<UserId>) -> Result<(), ChatError> {
        if let Some(user_id) = session {
            self.state.presence.touch(user_id, Utc::now());
        }
        self.send_to(client_id, ServerMessage::Pong);
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    fn handle_update_profile_picture(&mut self, user_id: UserId, url: Option<&str>) -> Result<(), ChatError> {
        self.state.users.set_profile_picture(user_id, url)?;
        self.dirty = true;

        self.push_profile(user_id)?;
        self.refresh_user_rooms(user_id);
        Ok(())
    }

    /// Direct change under the quota; past it, a request is filed instead
    fn handle_change_display_name(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        new_name: &str,
    ) -> Result<(), ChatError> {
        match self.state.users.change_display_name(user_id, new_name) {
            Ok(changed) => {
                self.dirty = true;
                info!("User {} is now '{}'", user_id, changed.display_name);
                self.send_to_user(
                    user_id,
                    ServerMessage::DisplayNameChanged {
                        display_name: changed.display_name,
                        remaining_name_changes: changed.remaining,
                    },
                );
                self.refresh_user_rooms(user_id);
                Ok(())
            }
            Err(ChatError::QuotaExceeded) => {
                self.file_name_change(client_id, user_id, new_name)?;
                Err(ChatError::QuotaExceeded)
            }
            Err(e) => Err(e),
        }
    }

    /// File a request for owner review; the user record is not touched
    fn file_name_change(&mut self, client_id: ClientId, user_id: UserId, new_name: &str) -> Result<(), ChatError> {
        let requested_name = validation::display_name(new_name)?;
        let user = self.state.users.require(user_id)?.clone();

        let request_id = self
            .state
            .support
            .file_name_change(&user, requested_name.clone(), Utc::now());
        self.dirty = true;

        self.send_to(
            client_id,
            ServerMessage::NameChangeRequested {
                request_id,
                requested_name,
            },
        );
        self.notify_inbox();
        Ok(())
    }

    fn handle_approve_name_change(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        request_id: RequestId,
    ) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let (target, display_name) = self.state.approve_name_change(request_id)?;
        self.dirty = true;

        info!("Name change approved: {} is now '{}'", target, display_name);
        self.send_to_user(target, ServerMessage::NameChangeApproved { display_name });
        self.refresh_user_rooms(target);
        self.send_to(client_id, ServerMessage::action("Name change approved"));
        Ok(())
    }

    fn handle_set_media_permissions(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        target: UserId,
        images: Option<bool>,
        videos: Option<bool>,
    ) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        self.state.users.set_media_permissions(target, images, videos)?;
        self.dirty = true;

        self.push_profile(target)?;
        self.send_to(client_id, ServerMessage::action("Media permissions updated"));
        Ok(())
    }

    fn handle_delete_account(&mut self, client_id: ClientId, user_id: UserId, target: UserId) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let deleted = self.state.delete_account(target)?;
        self.dirty = true;

        self.close_user_connections(
            target,
            ServerMessage::AccountDeleted {
                message: "Your account has been deleted".to_string(),
            },
        );
        for room_id in &deleted.affected_rooms {
            self.broadcast_users_list(*room_id);
        }
        self.broadcast_rooms_list();

        info!("Account '{}' deleted", deleted.user.handle);
        self.send_to(client_id, ServerMessage::action("Account deleted"));
        Ok(())
    }

    // =========================================================================
    // Room messages
    // =========================================================================

    fn handle_send_message(&mut self, client_id: ClientId, user_id: UserId, text: &str) -> Result<(), ChatError> {
        let room_id = self.postable_room(client_id, user_id)?;
        let text = validation::message_text(text)?;
        self.append_message(room_id, user_id, MessageBody::Text { text })
    }

    fn handle_send_image(&mut self, client_id: ClientId, user_id: UserId, url: &str) -> Result<(), ChatError> {
        let room_id = self.postable_room(client_id, user_id)?;
        let user = self.state.users.require(user_id)?;
        if !(user.is_owner() || user.can_send_images) {
            return Err(ChatError::denied("You are not allowed to send images"));
        }
        let url = validation::image_url(url)?;
        self.append_message(room_id, user_id, MessageBody::Image { url })
    }

    fn handle_send_video(&mut self, client_id: ClientId, user_id: UserId, url: &str) -> Result<(), ChatError> {
        let room_id = self.postable_room(client_id, user_id)?;
        let user = self.state.users.require(user_id)?;
        if !(user.is_owner() || user.can_send_videos) {
            return Err(ChatError::denied("You are not allowed to send videos"));
        }
        let url = validation::video_url(url)?;
        self.append_message(room_id, user_id, MessageBody::Video { url })
    }

    /// Current room of the connection, if the user may post there
    ///
    /// Muted users may not post anywhere; a silenced room only accepts
    /// posts from the owner and its moderators.
    fn postable_room(&mut self, client_id: ClientId, user_id: UserId) -> Result<RoomId, ChatError> {
        let room_id = self.current_room(client_id)?;
        if self.state.moderation.is_muted(user_id, Utc::now()) {
            return Err(ChatError::Muted);
        }
        let room = self.state.rooms.require(room_id)?;
        if room.is_silenced && !self.state.can_moderate(user_id, room_id) {
            return Err(ChatError::denied("This room is silenced"));
        }
        Ok(room_id)
    }

    fn append_message(&mut self, room_id: RoomId, user_id: UserId, body: MessageBody) -> Result<(), ChatError> {
        let author = self.state.users.require(user_id)?.clone();
        let room = self.state.rooms.require_mut(room_id)?;
        let message = room.compose(&author, body);
        room.push_message(message.clone());
        self.dirty = true;

        self.broadcast_room(room_id, ServerMessage::NewMessage { message });
        Ok(())
    }

    fn handle_edit_message(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        message_id: MessageId,
        new_text: &str,
    ) -> Result<(), ChatError> {
        let room_id = self.current_room(client_id)?;
        let message = self
            .state
            .rooms
            .require_mut(room_id)?
            .edit_message(message_id, user_id, new_text)?
            .clone();
        self.dirty = true;

        self.broadcast_room(room_id, ServerMessage::MessageEdited { message });
        Ok(())
    }

    fn handle_delete_message(&mut self, user_id: UserId, room_id: RoomId, message_id: MessageId) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        if !self.state.rooms.require_mut(room_id)?.delete_message(message_id) {
            return Err(ChatError::NotFound("Message"));
        }
        self.dirty = true;

        self.broadcast_room(
            room_id,
            ServerMessage::MessageDeleted {
                room_id,
                message_id,
            },
        );
        Ok(())
    }

    // =========================================================================
    // Rooms
    // =========================================================================

    fn handle_create_room(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        name: &str,
        description: &str,
        password: Option<String>,
    ) -> Result<(), ChatError> {
        let creator = self.state.users.require(user_id)?.clone();
        let password_hash = password
            .filter(|p| !p.is_empty())
            .map(|p| hash_password(&p))
            .transpose()?;

        let room_id = self
            .state
            .rooms
            .insert(Room::new(name, description, &creator, password_hash));
        self.dirty = true;
        let left = self.enter_room(client_id, user_id, room_id);

        let summary = self.state.rooms.require(room_id)?.summary();
        info!("User {} created room '{}'", user_id, summary.name);
        self.send_to(client_id, ServerMessage::RoomCreated { room: summary });
        self.send_to(
            client_id,
            ServerMessage::RoomJoined {
                room: self.room_view(room_id)?,
                video: None,
            },
        );
        self.announce_move(left, room_id);
        Ok(())
    }

    /// Enter a room, leaving the connection's previous one
    ///
    /// The owner bypasses room passwords.
    fn handle_join_room(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        room_id: RoomId,
        password: Option<&str>,
    ) -> Result<(), ChatError> {
        let room = self.state.rooms.require(room_id)?;
        if let Some(hash) = room.password_hash.as_deref() {
            if !self.state.users.is_owner(user_id) {
                if self.join_limiter.check_key(&(user_id, room_id)).is_err() {
                    warn!("Room password rate limit hit for {} in {}", user_id, room_id);
                    return Err(ChatError::RateLimited);
                }
                if !password.is_some_and(|p| verify_password(p, hash)) {
                    return Err(ChatError::WrongPassword);
                }
            }
        }
        let is_official = room.is_official;

        let left = self.enter_room(client_id, user_id, room_id);
        let video = if is_official {
            self.state.settings.video.clone()
        } else {
            None
        };
        self.send_to(
            client_id,
            ServerMessage::RoomJoined {
                room: self.room_view(room_id)?,
                video,
            },
        );
        self.announce_move(left, room_id);
        Ok(())
    }

    fn handle_update_room(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        room_id: RoomId,
        name: Option<String>,
        description: Option<String>,
        password: Option<String>,
    ) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let is_official = self.state.rooms.require(room_id)?.is_official;

        // Outer None: unchanged. Inner None: remove the password.
        let password_hash = match password {
            None => None,
            Some(p) if p.is_empty() => Some(None),
            Some(_) if is_official => {
                return Err(ChatError::denied("The official room cannot have a password"))
            }
            Some(p) => Some(Some(hash_password(&p)?)),
        };

        let room = self.state.rooms.require_mut(room_id)?;
        if let Some(name) = name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            room.name = validation::truncate_chars(name, validation::MAX_ROOM_NAME_CHARS);
        }
        if let Some(description) = description {
            room.description = validation::truncate_chars(
                description.trim(),
                validation::MAX_ROOM_DESCRIPTION_CHARS,
            );
        }
        if let Some(hash) = password_hash {
            room.password_hash = hash;
        }
        let summary = room.summary();
        self.dirty = true;

        self.broadcast_room(room_id, ServerMessage::RoomUpdated { room: summary });
        self.broadcast_rooms_list();
        self.send_to(client_id, ServerMessage::action("Room updated"));
        Ok(())
    }

    /// Delete a room, evicting every connection currently in it
    fn handle_delete_room(&mut self, client_id: ClientId, user_id: UserId, room_id: RoomId) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let room = self.state.rooms.remove(room_id)?;
        self.state.settings.forget_room(room_id);
        self.dirty = true;

        let notice = ServerMessage::RoomDeleted {
            room_id,
            message: "This room has been deleted".to_string(),
        };
        for client in self.clients.values_mut().filter(|c| c.is_in(room_id)) {
            if let Err(e) = client.send(notice.clone()) {
                debug!("Room deletion notice to {} not delivered: {}", client.id, e);
            }
            client.current_room = None;
        }
        self.broadcast_rooms_list();

        info!("Room '{}' deleted", room.name);
        self.send_to(client_id, ServerMessage::action("Room deleted"));
        Ok(())
    }

    fn handle_clean_chat(&mut self, user_id: UserId, room_id: RoomId) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        self.state.rooms.require_mut(room_id)?.clear_messages();
        self.dirty = true;

        self.broadcast_room(room_id, ServerMessage::ChatCleaned { room_id });
        Ok(())
    }

    fn handle_clean_all_rooms(&mut self, client_id: ClientId, user_id: UserId) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let mut cleaned = Vec::new();
        for room in self.state.rooms.iter_mut() {
            room.clear_messages();
            cleaned.push(room.id);
        }
        self.dirty = true;

        for room_id in cleaned {
            self.broadcast_room(room_id, ServerMessage::ChatCleaned { room_id });
        }
        info!("All rooms cleaned");
        self.send_to(client_id, ServerMessage::action("All rooms cleaned"));
        Ok(())
    }

    fn handle_set_silenced(&mut self, user_id: UserId, room_id: RoomId, silenced: bool) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        self.state.rooms.require_mut(room_id)?.is_silenced = silenced;
        self.dirty = true;

        let event = if silenced {
            ServerMessage::RoomSilenced { room_id }
        } else {
            ServerMessage::RoomUnsilenced { room_id }
        };
        self.broadcast_room(room_id, event);
        Ok(())
    }

    fn handle_get_room_media(&mut self, client_id: ClientId, room_id: RoomId) -> Result<(), ChatError> {
        let media = self.state.rooms.require(room_id)?.media.clone();
        self.send_to(client_id, ServerMessage::RoomMedia { room_id, media });
        Ok(())
    }

    /// Absent fields are left as they are; empty URLs clear them
    fn handle_update_room_media(
        &mut self,
        user_id: UserId,
        room_id: RoomId,
        video_url: Option<String>,
        music_url: Option<String>,
        music_volume: Option<f32>,
    ) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let video_url = video_url.as_deref().map(media_url).transpose()?;
        let music_url = music_url.as_deref().map(media_url).transpose()?;

        let room = self.state.rooms.require_mut(room_id)?;
        if let Some(url) = video_url {
            room.media.video_url = url;
        }
        if let Some(url) = music_url {
            room.media.music_url = url;
        }
        if let Some(volume) = music_volume {
            room.media.music_volume = validation::volume(volume);
        }
        let media = room.media.clone();
        self.dirty = true;

        self.broadcast_room(room_id, ServerMessage::RoomMediaUpdated { room_id, media });
        Ok(())
    }

    fn handle_set_moderator(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        room_id: RoomId,
        target: UserId,
        grant: bool,
    ) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        self.state.users.require(target)?;
        let room = self.state.rooms.require_mut(room_id)?;
        if grant {
            room.add_moderator(target);
        } else if !room.remove_moderator(target) {
            return Err(ChatError::NotFound("Moderator"));
        }
        self.dirty = true;

        info!(
            "User {} {} moderator of room {}",
            target,
            if grant { "made" } else { "no longer" },
            room_id
        );
        self.broadcast_users_list(room_id);
        self.push_profile(target)?;
        self.send_to(client_id, ServerMessage::action("Moderators updated"));
        Ok(())
    }

    // =========================================================================
    // Moderation
    // =========================================================================

    /// Mute attributed to the payload room, else the issuer's current room
    fn handle_mute(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        target: UserId,
        duration_minutes: u32,
        reason: &str,
        room_id: Option<RoomId>,
    ) -> Result<(), ChatError> {
        let room_id = room_id.or_else(|| self.current_room(client_id).ok());
        let allowed = self.state.users.is_owner(user_id)
            || room_id.is_some_and(|room| self.state.can_moderate(user_id, room));
        if !allowed {
            return Err(ChatError::denied("Only the owner or a room moderator can mute"));
        }
        if target == user_id {
            return Err(ChatError::Validation("You cannot mute yourself".to_string()));
        }

        let issuer = self.state.users.require(user_id)?.clone();
        let target_user = self.state.users.require(target)?.clone();
        let record = self
            .state
            .moderation
            .mute(&target_user, &issuer, duration_minutes, reason, room_id, Utc::now())?
            .clone();
        self.dirty = true;

        info!(
            "User '{}' muted by '{}' for {} min",
            target_user.handle, issuer.handle, duration_minutes
        );
        self.send_to_user(
            target,
            ServerMessage::Muted {
                reason: record.reason,
                expires_at: record.expires_at,
            },
        );
        self.send_to(client_id, ServerMessage::action("User muted"));
        Ok(())
    }

    /// Lift one mute; returns false if the target was not muted
    fn unmute(&mut self, user_id: UserId, target: UserId) -> Result<bool, ChatError> {
        let is_moderator = match self.state.moderation.mute_room(target) {
            None => return Ok(false),
            Some(Some(room_id)) => self
                .state
                .rooms
                .get(room_id)
                .is_some_and(|r| r.is_moderator(user_id)),
            Some(None) => self.state.is_any_moderator(user_id),
        };
        let requester = Unmuter {
            id: user_id,
            is_owner: self.state.users.is_owner(user_id),
            is_moderator,
        };
        self.state.moderation.unmute(target, requester)
    }

    fn handle_unmute(&mut self, client_id: ClientId, user_id: UserId, target: UserId) -> Result<(), ChatError> {
        if !self.unmute(user_id, target)? {
            return Err(ChatError::NotFound("Mute"));
        }
        self.dirty = true;

        info!("User {} unmuted by {}", target, user_id);
        self.send_to(client_id, ServerMessage::action("User unmuted"));
        Ok(())
    }

    fn handle_unmute_multiple(&mut self, client_id: ClientId, user_id: UserId, targets: &[UserId]) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let mut count = 0;
        for target in targets {
            if self.unmute(user_id, *target)? {
                count += 1;
            }
        }
        self.dirty = true;

        self.send_to(client_id, ServerMessage::action(format!("Unmuted {} users", count)));
        Ok(())
    }

    /// Ban a user and close every connection bound to them
    fn handle_ban(&mut self, client_id: ClientId, user_id: UserId, target: UserId, reason: &str) -> Result<(), ChatError> {
        let issuer = self.state.users.require(user_id)?.clone();
        let target_user = self.state.users.require(target)?.clone();
        let reason = self
            .state
            .moderation
            .ban(&target_user, &issuer, reason, Utc::now())?
            .reason
            .clone();
        self.dirty = true;

        let closed = self.close_user_connections(target, ServerMessage::Banned { reason });
        self.release_user(target);

        info!(
            "User '{}' banned, {} connection(s) closed",
            target_user.handle, closed
        );
        self.send_to(client_id, ServerMessage::action("User banned"));
        Ok(())
    }

    fn handle_unban(&mut self, client_id: ClientId, user_id: UserId, target: UserId) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        if !self.state.moderation.unban(target) {
            return Err(ChatError::NotFound("Ban"));
        }
        self.dirty = true;

        info!("User {} unbanned", target);
        self.send_to(client_id, ServerMessage::action("User unbanned"));
        Ok(())
    }

    fn handle_unban_multiple(&mut self, client_id: ClientId, user_id: UserId, targets: &[UserId]) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let count = targets
            .iter()
            .filter(|target| self.state.moderation.unban(**target))
            .count();
        self.dirty = true;

        self.send_to(client_id, ServerMessage::action(format!("Unbanned {} users", count)));
        Ok(())
    }

    fn handle_get_muted_list(&mut self, client_id: ClientId, user_id: UserId) -> Result<(), ChatError> {
        let is_owner = self.state.users.is_owner(user_id);
        if !is_owner && !self.state.is_any_moderator(user_id) {
            return Err(ChatError::denied("Only the owner or moderators can view mutes"));
        }
        let users = self
            .state
            .moderation
            .muted_list(user_id, is_owner, Utc::now());
        self.send_to(client_id, ServerMessage::MutedList { users });
        Ok(())
    }

    fn handle_get_banned_list(&mut self, client_id: ClientId, user_id: UserId) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let users = self.state.moderation.banned_list();
        self.send_to(client_id, ServerMessage::BannedList { users });
        Ok(())
    }

    // =========================================================================
    // Private messages
    // =========================================================================

    /// Deliver a private message unless the recipient blocked the sender
    fn handle_send_private_message(&mut self, user_id: UserId, to: UserId, text: &str) -> Result<(), ChatError> {
        if to == user_id {
            return Err(ChatError::Validation("You cannot message yourself".to_string()));
        }
        self.state.users.require(to)?;
        if self.state.moderation.has_blocked(to, user_id) {
            return Err(ChatError::Blocked);
        }
        let text = validation::message_text(text)?;

        let sender = self.state.users.require(user_id)?.clone();
        let message = self
            .state
            .private_messages
            .send(&sender, to, text, Utc::now());
        self.dirty = true;

        self.send_to_user(
            to,
            ServerMessage::NewPrivateMessage {
                message: message.clone(),
            },
        );
        self.send_to_user(user_id, ServerMessage::PrivateMessageSent { message });
        Ok(())
    }

    fn handle_edit_private_message(
        &mut self,
        user_id: UserId,
        with: UserId,
        message_id: MessageId,
        new_text: &str,
    ) -> Result<(), ChatError> {
        let new_text = validation::message_text(new_text)?;
        let message = self
            .state
            .private_messages
            .edit(user_id, with, message_id, &new_text)?;
        self.dirty = true;

        let edited = ServerMessage::PrivateMessageEdited { message };
        if !self.state.moderation.has_blocked(with, user_id) {
            self.send_to_user(with, edited.clone());
        }
        self.send_to_user(user_id, edited);
        Ok(())
    }

    fn handle_get_private_messages(&mut self, client_id: ClientId, user_id: UserId, with: UserId) -> Result<(), ChatError> {
        self.state.users.require(with)?;
        let messages = self.state.private_messages.thread(
            user_id,
            with,
            crate::state::private::THREAD_TAIL,
        );
        self.send_to(
            client_id,
            ServerMessage::PrivateMessagesList {
                with_user_id: with,
                messages,
            },
        );
        Ok(())
    }

    fn handle_block(&mut self, user_id: UserId, target: UserId, block: bool) -> Result<(), ChatError> {
        self.state.users.require(target)?;
        if block {
            self.state.moderation.block(user_id, target)?;
        } else {
            self.state.moderation.unblock(user_id, target);
        }
        self.dirty = true;

        self.send_to_user(
            user_id,
            ServerMessage::BlockList {
                blocked_users: self.state.moderation.blocked_by(user_id),
            },
        );
        Ok(())
    }

    // =========================================================================
    // Support inbox
    // =========================================================================

    /// Works before login; the sender name comes from the session if bound
    fn handle_support_message(
        &mut self,
        client_id: ClientId,
        session: Option<UserId>,
        text: &str,
        from: Option<String>,
    ) -> Result<(), ChatError> {
        let text = validation::message_text(text)?;
        let from = match session.and_then(|id| self.state.users.get(id)) {
            Some(user) => user.display_name.clone(),
            None => validation::non_empty(from)
                .map(|f| validation::truncate_chars(&f, validation::MAX_HANDLE_CHARS))
                .unwrap_or_else(|| ANONYMOUS.to_string()),
        };

        let request_id = self.state.support.file_message(from, text, Utc::now());
        self.dirty = true;

        self.send_to(client_id, ServerMessage::SupportMessageSent { request_id });
        self.notify_inbox();
        Ok(())
    }

    fn handle_get_support_messages(&mut self, client_id: ClientId, user_id: UserId) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        self.send_to(
            client_id,
            ServerMessage::SupportMessagesList {
                messages: self.state.support.list(),
            },
        );
        Ok(())
    }

    /// Removing a name-change request rejects it
    fn handle_delete_support_message(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        request_id: RequestId,
    ) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        self.state
            .support
            .remove(request_id)
            .ok_or(ChatError::NotFound("Request"))?;
        self.dirty = true;

        self.send_to(
            client_id,
            ServerMessage::SupportMessagesList {
                messages: self.state.support.list(),
            },
        );
        Ok(())
    }

    // =========================================================================
    // System settings
    // =========================================================================

    fn handle_update_settings(&mut self, user_id: UserId, update: SettingsUpdate) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        self.state.settings.apply(update);
        self.dirty = true;

        info!("System settings updated");
        self.broadcast_all(ServerMessage::SettingsUpdated {
            settings: self.state.settings.clone(),
        });
        Ok(())
    }

    fn handle_start_video(
        &mut self,
        user_id: UserId,
        url: &str,
        kind: Option<VideoKind>,
        size: Option<VideoSize>,
    ) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let url = url.trim();
        if url.is_empty() {
            return Err(ChatError::Validation("Video URL is required".to_string()));
        }
        let official = self.official_room()?;
        let started_by = self.state.users.require(user_id)?.display_name.clone();

        let video = self
            .state
            .settings
            .start_video(url.to_string(), kind, size, started_by, Utc::now())
            .clone();
        self.dirty = true;

        info!("Video watch started: {}", video.url);
        self.broadcast_room(official, ServerMessage::VideoStarted { video });
        Ok(())
    }

    fn handle_stop_video(&mut self, user_id: UserId) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let official = self.official_room()?;
        if !self.state.settings.stop_video() {
            return Err(ChatError::NotFound("Video session"));
        }
        self.dirty = true;

        self.broadcast_room(official, ServerMessage::VideoStopped);
        Ok(())
    }

    fn handle_resize_video(&mut self, user_id: UserId, size: VideoSize) -> Result<(), ChatError> {
        self.require_owner(user_id)?;
        let official = self.official_room()?;
        let video = self
            .state
            .settings
            .resize_video(size)
            .cloned()
            .ok_or(ChatError::NotFound("Video session"))?;
        self.dirty = true;

        self.broadcast_room(official, ServerMessage::VideoResized { video });
        Ok(())
    }

    fn handle_toggle_party_mode(
        &mut self,
        client_id: ClientId,
        user_id: UserId,
        room_id: Option<RoomId>,
        enabled: bool,
    ) -> Result<(), ChatError> {
        let room_id = match room_id {
            Some(room_id) => room_id,
            None => self.current_room(client_id)?,
        };
        self.state.rooms.require(room_id)?;
        if !self.state.can_moderate(user_id, room_id) {
            return Err(ChatError::denied("Only the owner or a room moderator can toggle party mode"));
        }
        self.state.settings.set_party_mode(room_id, enabled);
        self.dirty = true;

        self.broadcast_room(room_id, ServerMessage::PartyModeChanged { room_id, enabled });
        Ok(())
    }

    // =========================================================================
    // Listings
    // =========================================================================

    fn handle_get_users(&mut self, client_id: ClientId, room_id: Option<RoomId>) -> Result<(), ChatError> {
        let room_id = match room_id {
            Some(room_id) => room_id,
            None => self.current_room(client_id)?,
        };
        self.state.rooms.require(room_id)?;
        self.send_to(
            client_id,
            ServerMessage::UsersList {
                room_id,
                users: self.users_in(room_id),
            },
        );
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_owner(&self, user_id: UserId) -> Result<(), ChatError> {
        if self.state.users.is_owner(user_id) {
            Ok(())
        } else {
            Err(ChatError::denied("Owner only"))
        }
    }

    fn current_room(&self, client_id: ClientId) -> Result<RoomId, ChatError> {
        self.clients
            .get(&client_id)
            .and_then(|c| c.current_room)
            .ok_or(ChatError::NotInRoom)
    }

    fn official_room(&self) -> Result<RoomId, ChatError> {
        self.state
            .official_room()
            .ok_or_else(|| ChatError::Internal("official room missing".to_string()))
    }

    fn profile(&self, user_id: UserId) -> Result<UserProfile, ChatError> {
        let user = self.state.users.require(user_id)?;
        Ok(UserProfile::new(user, self.state.is_any_moderator(user_id)))
    }

    fn room_view(&self, room_id: RoomId) -> Result<RoomView, ChatError> {
        let room = self.state.rooms.require(room_id)?;
        Ok(RoomView::new(
            room,
            self.state.settings.party_mode(room_id),
            ROOM_HISTORY_TAIL,
        ))
    }

    fn users_in(&self, room_id: RoomId) -> Vec<UserEntry> {
        let Some(room) = self.state.rooms.get(room_id) else {
            return Vec::new();
        };
        room.members
            .iter()
            .filter_map(|id| self.state.users.get(*id))
            .map(|user| UserEntry {
                id: user.id,
                display_name: user.display_name.clone(),
                avatar: user.avatar.clone(),
                profile_picture: user.profile_picture.clone(),
                is_owner: user.is_owner(),
                is_moderator: room.is_moderator(user.id),
                is_online: self.state.presence.is_online(user.id),
            })
            .collect()
    }

    /// Point a connection at `room_id`, updating membership
    ///
    /// Returns the room the user actually left, if any. A room stays in
    /// the user's membership while another of their connections is in it.
    fn enter_room(&mut self, client_id: ClientId, user_id: UserId, room_id: RoomId) -> Option<RoomId> {
        let previous = self
            .clients
            .get_mut(&client_id)
            .and_then(|c| c.current_room.replace(room_id));

        let left = previous.filter(|prev| {
            *prev != room_id && !self.clients.values().any(|c| c.is_user(user_id) && c.is_in(*prev))
        });
        if let Some(room) = left.and_then(|prev| self.state.rooms.get_mut(prev)) {
            room.remove_member(user_id);
        }
        if let Some(room) = self.state.rooms.get_mut(room_id) {
            room.add_member(user_id);
        }
        left
    }

    /// Fan out membership changes after `enter_room`
    fn announce_move(&self, left: Option<RoomId>, joined: RoomId) {
        if let Some(left) = left {
            self.broadcast_users_list(left);
        }
        self.broadcast_users_list(joined);
        self.broadcast_rooms_list();
    }

    fn push_profile(&self, user_id: UserId) -> Result<(), ChatError> {
        let user = self.profile(user_id)?;
        self.send_to_user(user_id, ServerMessage::ProfileUpdated { user });
        Ok(())
    }

    /// Re-send member lists of every room the user is in
    fn refresh_user_rooms(&self, user_id: UserId) {
        for room_id in self.state.rooms.rooms_of(user_id) {
            self.broadcast_users_list(room_id);
        }
    }

    /// Push the support inbox to the owner's connections
    fn notify_inbox(&self) {
        if let Some(owner) = self.state.users.owner() {
            self.send_to_user(
                owner.id,
                ServerMessage::SupportMessagesList {
                    messages: self.state.support.list(),
                },
            );
        }
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    fn deliver(client: &Client, msg: ServerMessage) {
        if let Err(e) = client.send(msg) {
            warn!("Dropping message for {}: {}", client.id, e);
        }
    }

    fn send_to(&self, client_id: ClientId, msg: ServerMessage) {
        if let Some(client) = self.clients.get(&client_id) {
            Self::deliver(client, msg);
        }
    }

    /// Every connection bound to a user
    fn send_to_user(&self, user_id: UserId, msg: ServerMessage) {
        for client in self.clients.values().filter(|c| c.is_user(user_id)) {
            Self::deliver(client, msg.clone());
        }
    }

    /// Connections currently in the room, at this instant
    fn broadcast_room(&self, room_id: RoomId, msg: ServerMessage) {
        for client in self.clients.values().filter(|c| c.is_in(room_id)) {
            Self::deliver(client, msg.clone());
        }
    }

    /// Every connection, authenticated or not
    fn broadcast_all(&self, msg: ServerMessage) {
        for client in self.clients.values() {
            Self::deliver(client, msg.clone());
        }
    }

    fn broadcast_rooms_list(&self) {
        let msg = ServerMessage::RoomsList {
            rooms: self.state.rooms.directory(),
        };
        for client in self.clients.values().filter(|c| c.is_authenticated()) {
            Self::deliver(client, msg.clone());
        }
    }

    fn broadcast_users_list(&self, room_id: RoomId) {
        self.broadcast_room(
            room_id,
            ServerMessage::UsersList {
                room_id,
                users: self.users_in(room_id),
            },
        );
    }
}

/// Room media URL: empty clears, otherwise http(s) only
fn media_url(url: &str) -> Result<Option<String>, ChatError> {
    let url = url.trim();
    if url.is_empty() {
        Ok(None)
    } else if validation::is_http_url(url) {
        Ok(Some(url.to_string()))
    } else {
        Err(ChatError::Validation("Media URL must use http or https".to_string()))
    }
}
