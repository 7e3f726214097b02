//! Connection registry - join/leave lifecycle, buffered input and outbound sinks

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::GameConfig;
use crate::ws::protocol::ServerMsg;

use super::entity::{ConnectionId, GameState, InputState, Player, PLAYER_COLORS};
use super::physics::PhysicsSystem;

/// Longest display name kept after trimming
pub const MAX_NAME_LEN: usize = 24;

/// Outbound capability of a connection. The simulation only ever needs a
/// stable id and a way to push a message.
pub trait ClientSink: Send {
    fn id(&self) -> ConnectionId;

    /// Queue a message for delivery. Returns false if it was dropped.
    fn send(&self, msg: Arc<ServerMsg>) -> bool;
}

/// Sink backed by a bounded channel drained by the connection's writer task
pub struct ChannelSink {
    id: ConnectionId,
    tx: mpsc::Sender<Arc<ServerMsg>>,
}

impl ChannelSink {
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<ServerMsg>>) -> Self {
        Self { id, tx }
    }
}

impl ClientSink for ChannelSink {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, msg: Arc<ServerMsg>) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(connection_id = %self.id, "Outbound buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(connection_id = %self.id, "Outbound channel closed");
                false
            }
        }
    }
}

/// Why a join request was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Game is full ({0} players)")]
    GameFull(usize),

    #[error("Connection already joined")]
    AlreadyJoined,
}

impl JoinError {
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::GameFull(_) => "game_full",
            JoinError::AlreadyJoined => "already_joined",
        }
    }
}

/// Maps connections to their sink and buffered input
#[derive(Default)]
pub struct ConnectionRegistry {
    sinks: HashMap<ConnectionId, Box<dyn ClientSink>>,
    inputs: HashMap<ConnectionId, InputState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound sink
    pub fn attach(&mut self, sink: Box<dyn ClientSink>) {
        self.sinks.insert(sink.id(), sink);
    }

    /// Drop a connection's sink. Returns true if it was attached.
    pub fn detach(&mut self, id: ConnectionId) -> bool {
        self.sinks.remove(&id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.sinks.len()
    }

    /// Create a player for a connection and insert it into the game state.
    ///
    /// Color and ring slot are picked round-robin from the number of players
    /// already in the game.
    pub fn add_player(
        &mut self,
        state: &mut GameState,
        id: ConnectionId,
        name: &str,
        config: &GameConfig,
    ) -> Result<Player, JoinError> {
        if state.players.contains_key(&id) {
            return Err(JoinError::AlreadyJoined);
        }
        if state.players.len() >= config.max_players {
            return Err(JoinError::GameFull(config.max_players));
        }

        let slot = state.players.len() % PLAYER_COLORS.len();
        let (position, yaw) = PhysicsSystem::ring_spawn(slot, config);
        let player = Player::new(
            id,
            sanitize_name(name, id),
            PLAYER_COLORS[slot],
            position,
            yaw,
            config,
        );

        state.players.insert(id, player.clone());
        self.inputs.insert(id, InputState::idle());
        Ok(player)
    }

    /// Remove a connection's player. Projectiles it fired stay in flight.
    pub fn remove_player(&mut self, state: &mut GameState, id: ConnectionId) -> Option<Player> {
        self.inputs.remove(&id);
        state.players.remove(&id)
    }

    /// Replace the buffered input of a connection.
    ///
    /// Dead players get an idle input no matter what was sent. Mouse-look is
    /// applied once here rather than every tick. Returns false for unknown
    /// connections.
    pub fn set_input(
        &mut self,
        state: &mut GameState,
        id: ConnectionId,
        input: InputState,
        config: &GameConfig,
    ) -> bool {
        let Some(player) = state.players.get_mut(&id) else {
            return false;
        };

        if player.is_dead {
            self.inputs.insert(id, InputState::idle());
            return true;
        }

        *player = PhysicsSystem::apply_look(player, &input, config);
        self.inputs.insert(
            id,
            InputState {
                mouse_x: None,
                mouse_y: None,
                ..input
            },
        );
        true
    }

    /// Buffered input for a connection, idle if none
    pub fn input(&self, id: ConnectionId) -> InputState {
        self.inputs.get(&id).copied().unwrap_or_default()
    }

    /// Force a connection's buffered input to idle
    pub fn clear_input(&mut self, id: ConnectionId) {
        if let Some(input) = self.inputs.get_mut(&id) {
            *input = InputState::idle();
        }
    }

    /// Send a message to one connection
    pub fn send_to(&self, id: ConnectionId, msg: ServerMsg) -> bool {
        match self.sinks.get(&id) {
            Some(sink) => sink.send(Arc::new(msg)),
            None => {
                debug!(connection_id = %id, "No sink for connection");
                false
            }
        }
    }

    /// Send a message to every attached connection. Returns the delivery count.
    pub fn broadcast(&self, msg: ServerMsg) -> usize {
        let msg = Arc::new(msg);
        self.sinks
            .values()
            .filter(|sink| sink.send(Arc::clone(&msg)))
            .count()
    }
}

/// Trim and bound a display name, generating one for blank input
pub fn sanitize_name(raw: &str, id: ConnectionId) -> String {
    let trimmed: String = raw.trim().chars().take(MAX_NAME_LEN).collect();
    if trimmed.is_empty() {
        let simple = id.simple().to_string();
        format!("Player{}", &simple[..4])
    } else {
        trimmed
    }
}
