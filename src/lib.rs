//! Multi-room WebSocket Chat Server Library
//!
//! A real-time chat server built with tokio-tungstenite using the Actor
//! pattern for state management.
//!
//! # Features
//! - Accounts with hashed passwords, a single owner and display-name quotas
//! - Public and password-protected rooms plus a permanent official room
//! - Bounded per-room history with edits and owner deletion
//! - Per-room moderators, timed mutes, bans and directional blocks
//! - Private messages, support inbox and name-change requests
//! - Site settings, party mode and a shared video session
//! - JSON snapshots written off the event loop
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning all state
//! - Each connection has a `handler` task communicating with the server
//! - No locks needed - all state access goes through message passing
//! - A `Persister` task writes snapshots handed over by the actor
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_room_server::persistence::{MemoryStore, Persister};
//! use chat_room_server::{handle_connection, AppState, ChatServer, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().unwrap();
//!     let mut state = AppState::new();
//!     state.bootstrap(&config.owner).unwrap();
//!
//!     let (persister, _writer) = Persister::spawn(Arc::new(MemoryStore::new()));
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!     tokio::spawn(ChatServer::new(cmd_rx, state, persister, &config).run());
//!
//!     let listener = TcpListener::bind(&config.ws_addr).await.unwrap();
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, cmd_tx.clone()));
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod message;
pub mod password;
pub mod persistence;
pub mod server;
pub mod state;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use client::Client;
pub use config::Config;
pub use error::{AppError, ChatError, SendError};
pub use handler::handle_connection;
pub use message::{ClientMessage, ErrorCode, ServerMessage};
pub use server::{ChatServer, ServerCommand};
pub use state::AppState;
pub use types::{ClientId, MessageId, RequestId, RoomId, UserId};
