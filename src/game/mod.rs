//! Game simulation modules

pub mod combat;
pub mod entity;
pub mod game_loop;
pub mod physics;
pub mod registry;
pub mod respawn;
pub mod simulation;
pub mod snapshot;

pub use game_loop::{GameHandle, GameLoop};

use crate::ws::protocol::ClientMsg;

use self::entity::ConnectionId;
use self::registry::ClientSink;

/// Work item for the simulation, produced by connection sessions
pub enum GameCommand {
    /// A transport connection opened
    Connect { sink: Box<dyn ClientSink> },
    /// A decoded client message
    Client {
        connection_id: ConnectionId,
        msg: ClientMsg,
    },
    /// The transport connection closed
    Disconnect { connection_id: ConnectionId },
}

impl std::fmt::Debug for GameCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameCommand::Connect { sink } => f
                .debug_struct("Connect")
                .field("connection_id", &sink.id())
                .finish(),
            GameCommand::Client { connection_id, msg } => f
                .debug_struct("Client")
                .field("connection_id", connection_id)
                .field("msg", msg)
                .finish(),
            GameCommand::Disconnect { connection_id } => f
                .debug_struct("Disconnect")
                .field("connection_id", connection_id)
                .finish(),
        }
    }
}
