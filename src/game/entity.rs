//! Entity model - players, projectiles and the game state aggregate

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GameConfig;

/// Stable identifier of a client connection, doubling as its player id
pub type ConnectionId = Uuid;

/// Colors handed out round-robin on join
pub const PLAYER_COLORS: [&str; 8] = [
    "#ff4444", // red
    "#44ff44", // green
    "#4444ff", // blue
    "#ffff44", // yellow
    "#ff44ff", // magenta
    "#44ffff", // cyan
    "#ff8844", // orange
    "#8844ff", // purple
];

/// Authoritative player record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,
    pub position: Vec3,
    /// Heading around the up-axis in radians, kept in `[0, 2π)`
    pub yaw: f32,
    pub health: u32,
    pub max_health: u32,
    pub color: String,
    pub is_dead: bool,
    /// Game time (seconds) of the last death, present iff dead
    pub death_time: Option<f64>,
    pub kills: u32,
    pub deaths: u32,
    /// Seconds until this player may fire again
    #[serde(skip)]
    pub fire_cooldown: f32,
}

impl Player {
    pub fn new(
        id: ConnectionId,
        name: String,
        color: &str,
        position: Vec3,
        yaw: f32,
        config: &GameConfig,
    ) -> Self {
        Self {
            id,
            name,
            position,
            yaw,
            health: config.max_health,
            max_health: config.max_health,
            color: color.to_string(),
            is_dead: false,
            death_time: None,
            kills: 0,
            deaths: 0,
            fire_cooldown: 0.0,
        }
    }

    /// Unit vector the player is facing on the ground plane
    pub fn forward(&self) -> Vec3 {
        heading(self.yaw)
    }
}

/// Ground-plane direction for a yaw angle. Yaw 0 faces +z.
pub fn heading(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Projectile in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u64,
    pub position: Vec3,
    /// Units per second
    pub velocity: Vec3,
    pub owner_id: ConnectionId,
    pub damage: u32,
    /// Remaining lifetime in seconds
    pub lifetime: f32,
}

impl Projectile {
    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }
}

/// Movement and fire intent for one connection. Last write wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    #[serde(default)]
    pub forward: bool,
    #[serde(default)]
    pub backward: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub shoot: bool,
    /// Horizontal mouse delta since the previous input message
    #[serde(default)]
    pub mouse_x: Option<f32>,
    /// Vertical mouse delta; accepted but unused by the server
    #[serde(default)]
    pub mouse_y: Option<f32>,
}

impl InputState {
    /// Input with every intent released
    pub fn idle() -> Self {
        Self::default()
    }
}

/// The single mutable aggregate, owned by the simulation
#[derive(Debug, Clone, Default)]
pub struct GameState {
    /// Keyed and iterated in ascending id order
    pub players: BTreeMap<ConnectionId, Player>,
    /// Keyed by id; ids are monotonic so iteration follows creation order
    pub projectiles: BTreeMap<u64, Projectile>,
    /// Seconds of active simulation
    pub game_time: f64,
    pub is_game_active: bool,
}

impl GameState {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| !p.is_dead).count()
    }
}
