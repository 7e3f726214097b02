//! Snapshot building and status publishing

use serde::Serialize;

use crate::ws::protocol::ServerMsg;

use super::entity::{ConnectionId, GameState};

/// Builds full-state snapshots for network transmission
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    /// Snapshots built so far
    built: u64,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot message. Always full state, never a delta.
    pub fn build(&mut self, tick: u64, state: &GameState) -> ServerMsg {
        self.built += 1;
        ServerMsg::GameState {
            tick,
            game_time: state.game_time,
            is_game_active: state.is_game_active,
            players: state.players.values().cloned().collect(),
            projectiles: state.projectiles.values().cloned().collect(),
        }
    }

    pub fn built(&self) -> u64 {
        self.built
    }
}

/// Read-only summary of a player for status endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub id: ConnectionId,
    pub name: String,
    pub health: u32,
    pub color: String,
}

/// Summary published by the loop once per tick for the HTTP surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBoard {
    pub tick: u64,
    pub game_time: f64,
    pub is_game_active: bool,
    pub connections: usize,
    pub projectiles: usize,
    pub snapshots_sent: u64,
    pub players: Vec<PlayerSummary>,
}

impl StatusBoard {
    pub fn capture(
        tick: u64,
        state: &GameState,
        connections: usize,
        snapshots_sent: u64,
    ) -> Self {
        Self {
            tick,
            game_time: state.game_time,
            is_game_active: state.is_game_active,
            connections,
            projectiles: state.projectiles.len(),
            snapshots_sent,
            players: state
                .players
                .values()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    health: p.health,
                    color: p.color.clone(),
                })
                .collect(),
        }
    }
}
