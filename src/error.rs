//! Error types for the chat server
//!
//! Defines fatal infrastructure errors, the recoverable chat error
//! taxonomy reported back to clients, and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Fatal or infrastructure failures. These end a connection task or
/// startup; they are never sent to a client verbatim.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Durable store failure
    #[error("Store error: {0}")]
    Store(#[from] crate::persistence::StoreError),

    /// Bootstrap could not establish the owner or official room
    #[error("Bootstrap error: {0}")]
    Bootstrap(String),
}

/// Recoverable chat errors
///
/// Every variant is surfaced to the requesting connection as an error
/// event; none of them terminate the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChatError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username already taken")]
    HandleTaken,

    #[error("Display name already taken")]
    DisplayNameTaken,

    #[error("Requested name is no longer available")]
    NameConflict,

    #[error("Wrong room password")]
    WrongPassword,

    #[error("Maximum free name changes used")]
    QuotaExceeded,

    #[error("You are muted")]
    Muted,

    #[error("You are banned: {reason}")]
    Banned { reason: String },

    #[error("{0}")]
    Validation(String),

    #[error("You are blocked by this user")]
    Blocked,

    #[error("You are not in a room")]
    NotInRoom,

    #[error("Too many attempts, try again later")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Shorthand for a permission failure with a reason
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied(reason.into())
    }
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed or full channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client is not draining its outbound queue
    #[error("Channel full")]
    ChannelFull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_messages() {
        assert_eq!(ChatError::NotFound("Room").to_string(), "Room not found");
        assert_eq!(
            ChatError::Banned { reason: "spam".into() }.to_string(),
            "You are banned: spam"
        );
        assert_eq!(
            ChatError::denied("Owner only").to_string(),
            "Permission denied: Owner only"
        );
    }
}
