//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::entity::ConnectionId;
use crate::game::registry::ChannelSink;
use crate::game::{GameCommand, GameHandle};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outbound messages buffered per connection before drops start
const OUTBOUND_BUFFER: usize = 128;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.game))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, game: GameHandle) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

    let connected = game
        .send(GameCommand::Connect {
            sink: Box::new(ChannelSink::new(connection_id, outbound_tx)),
        })
        .await;
    if !connected {
        error!(connection_id = %connection_id, "Game loop unavailable");
        return;
    }

    run_session(connection_id, &game, ws_sink, ws_stream, outbound_rx).await;

    // Signal disconnect to the game loop
    let _ = game.send(GameCommand::Disconnect { connection_id }).await;

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: ConnectionId,
    game: &GameHandle,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: mpsc::Receiver<Arc<ServerMsg>>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Spawn writer task: game loop -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        debug!(connection_id = %connection_id, "Outbound channel closed");
    });

    // Reader loop: WebSocket -> game loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(msg) => {
                    if !admit(&rate_limiter, &msg) {
                        warn!(connection_id = %connection_id, ?msg, "Rate limited client message");
                        continue;
                    }

                    let command = GameCommand::Client { connection_id, msg };
                    if !game.send(command).await {
                        debug!(connection_id = %connection_id, "Game loop stopped");
                        break;
                    }
                }
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Charge a decoded message to its rate bucket. Input is last-write-wins and
/// may be dropped; join/fire/respawn draw from their own bucket.
fn admit(limiter: &ConnectionRateLimiter, msg: &ClientMsg) -> bool {
    match msg {
        ClientMsg::PlayerInput(_) => limiter.check_input(),
        ClientMsg::JoinGame { .. } | ClientMsg::Shoot | ClientMsg::Respawn => {
            limiter.check_action()
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
