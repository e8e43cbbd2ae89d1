//! Multi-room Chat Server - Entry Point
//!
//! Loads configuration and the last snapshot, starts the ChatServer
//! actor, the HTTP surface and the WebSocket accept loop.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_room_server::persistence::{JsonFileStore, Persister, SnapshotStore};
use chat_room_server::{handle_connection, http, AppError, AppState, ChatServer, Config, ServerCommand};

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG to control log level, e.g. RUST_LOG=chat_room_server=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_room_server=info")),
        )
        .init();

    let mut config = Config::from_env()?;
    // A bind address on the command line wins over CHAT_WS_ADDR
    if let Some(addr) = env::args().nth(1) {
        config.ws_addr = addr;
    }

    // Load the last snapshot; a corrupt one stops startup
    let store = Arc::new(JsonFileStore::new(&config.data_file));
    let mut state = match store.load()? {
        Some(json) => {
            info!("Loaded snapshot from {}", store.path().display());
            AppState::from_json(&json).map_err(AppError::Json)?
        }
        None => {
            info!("No snapshot at {}, starting fresh", store.path().display());
            AppState::new()
        }
    };
    state.bootstrap(&config.owner)?;

    let (persister, writer) = Persister::spawn(store);

    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let server = ChatServer::new(cmd_rx, state, persister, &config);
    let actor = tokio::spawn(server.run());
    info!("ChatServer actor started");

    let http_listener = TcpListener::bind(&config.http_addr).await?;
    let app = http::router(cmd_tx.clone(), &config.static_dir);
    tokio::spawn(async move {
        if let Err(e) = http::serve(http_listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    let listener = TcpListener::bind(&config.ws_addr).await?;
    info!("WebSocket Chat Server listening on {}", config.ws_addr);

    // Connection accept loop
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let cmd_tx = cmd_tx.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, cmd_tx).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // The actor flushes a final snapshot; the writer exits once it is saved
    let _ = cmd_tx.send(ServerCommand::Shutdown).await;
    actor.await?;
    writer.await?;

    info!("Server stopped");
    Ok(())
}
