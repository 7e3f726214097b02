//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::entity::{ConnectionId, InputState, Player, Projectile};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request to join the arena
    JoinGame {
        /// Display name; blank names get a generated one
        #[serde(default)]
        name: String,
    },

    /// Latest movement/fire intent, replaces the buffered one
    PlayerInput(InputState),

    /// Fire a projectile along the current heading
    Shoot,

    /// Ask to come back to life before the respawn delay elapses
    Respawn,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Join acknowledgement, sent to the joining connection only
    PlayerJoined { player: Player },

    /// Full authoritative state
    GameState {
        /// Server tick number
        tick: u64,
        /// Seconds of active simulation
        game_time: f64,
        is_game_active: bool,
        /// Players in ascending id order
        players: Vec<Player>,
        /// Projectiles in creation order
        projectiles: Vec<Projectile>,
    },

    /// A player's health reached zero
    PlayerKilled {
        killer_id: ConnectionId,
        victim_id: ConnectionId,
    },

    /// Error message
    Error { code: String, message: String },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
