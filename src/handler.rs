//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake,
//! frame parsing, and bidirectional communication with the ChatServer.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::types::ClientId;

/// Outbound queue size per connection
const OUTBOUND_BUFFER_SIZE: usize = 64;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers the connection with the
/// actor, and forwards frames in both directions until either side ends.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER_SIZE);

    if cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - server closed", client_id);
        return Err(AppError::ChannelSend);
    }

    let json = serde_json::to_string(&ServerMessage::Connected { client_id })?;
    ws_sender.send(Message::Text(json.into())).await?;

    let cmd_tx_read = cmd_tx.clone();

    // Read task (WebSocket -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            let cmd = match msg_result {
                Ok(Message::Text(text)) => parse_frame(client_id, &text),
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(Message::Binary(_)) => ServerCommand::Malformed {
                    client_id,
                    reason: "binary frames are not supported".to_string(),
                },
                // Pings are answered by tungstenite
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            };

            if cmd_tx_read.send(cmd).await.is_err() {
                debug!("Server closed, ending read task for {}", client_id);
                break;
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Write task (ServerMessage -> WebSocket)
    //
    // Ends when the actor drops the client's sender (ban, account
    // deletion) after flushing what was already queued.
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
        debug!("Write task ended for client");

        let _ = ws_sender.close().await;
    });

    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            read_task.abort();
        }
    }

    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Turn a text frame into a command for the actor
///
/// Frames that do not parse are still forwarded so the actor can answer
/// with an error; the connection stays open.
fn parse_frame(client_id: ClientId, text: &str) -> ServerCommand {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => ServerCommand::Event { client_id, message },
        Err(e) => {
            warn!("Invalid JSON from {}: {}", client_id, e);
            ServerCommand::Malformed {
                client_id,
                reason: e.to_string(),
            }
        }
    }
}
