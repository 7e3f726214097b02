//! Configuration module - environment variable parsing and game tunables

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,
    /// Simulation tunables
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string())
        };

        let mut game = GameConfig::default();
        if let Some(v) = parse_var("ARENA_HALF_EXTENT")? {
            game.half_arena = v;
        }
        if let Some(v) = parse_var("TICK_RATE")? {
            game.tick_rate = v;
        }
        if let Some(v) = parse_var("RESPAWN_DELAY_SECS")? {
            game.respawn_delay = v;
        }
        if let Some(v) = parse_var("MIN_PLAYERS")? {
            game.min_players = v;
        }
        if let Some(v) = parse_var("MAX_PLAYERS")? {
            game.max_players = v;
        }
        if let Some(v) = parse_var("PROJECTILE_GRAVITY")? {
            game.projectile_gravity = v;
        }
        if let Some(v) = parse_var("RNG_SEED")? {
            game.seed = v;
        }
        game.validate()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            game,
        })
    }
}

/// Read an optional environment variable and parse it
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

/// Static simulation tunables. Pure data.
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    /// Half-extent of the square arena on x and z
    pub half_arena: f32,
    /// Distance players are kept away from the arena walls
    pub wall_margin: f32,
    /// Player linear speed (units/second)
    pub player_speed: f32,
    /// Player turn rate (radians/second)
    pub turn_rate: f32,
    pub max_health: u32,

    pub projectile_speed: f32,
    pub projectile_damage: u32,
    /// Initial projectile lifetime (seconds)
    pub projectile_lifetime: f32,
    /// Upward velocity added to every projectile at creation
    pub projectile_lift: f32,
    /// Vertical acceleration applied to projectiles; 0 disables gravity
    pub projectile_gravity: f32,
    /// Forward distance from the player to the projectile spawn point
    pub muzzle_offset: f32,
    /// Height above the player position of the projectile spawn point
    pub muzzle_height: f32,
    pub collision_radius: f32,
    /// Lowest y a projectile may reach before it expires
    pub floor_min: f32,
    /// Highest y a projectile may reach before it expires
    pub ceiling_max: f32,
    /// Minimum seconds between two shots of the same player
    pub fire_cooldown: f32,

    /// Seconds between death and automatic respawn
    pub respawn_delay: f64,
    /// Radius of the ring players join on
    pub spawn_radius: f32,
    /// Ground height players stand at
    pub spawn_height: f32,
    /// Half-width of the square random respawn points are drawn from
    pub spawn_spread: f32,

    /// Yaw change per unit of mouse delta
    pub mouse_sensitivity: f32,
    /// Largest accepted mouse delta per input message
    pub max_mouse_delta: f32,

    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Player count at which the game becomes active
    pub min_players: usize,
    pub max_players: usize,
    /// Seed for spawn randomisation
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            half_arena: 25.0,
            wall_margin: 1.0,
            player_speed: 5.0,
            turn_rate: 3.0,
            max_health: 100,
            projectile_speed: 15.0,
            projectile_damage: 25,
            projectile_lifetime: 5.0,
            projectile_lift: 0.5,
            projectile_gravity: 0.0,
            muzzle_offset: 1.2,
            muzzle_height: 0.5,
            collision_radius: 1.0,
            floor_min: -5.0,
            ceiling_max: 10.0,
            fire_cooldown: 0.2,
            respawn_delay: 3.0,
            spawn_radius: 10.0,
            spawn_height: 0.5,
            spawn_spread: 10.0,
            mouse_sensitivity: 0.008,
            max_mouse_delta: 200.0,
            tick_rate: 30,
            min_players: 1,
            max_players: 8,
            seed: 0x5EED,
        }
    }
}

impl GameConfig {
    /// Fixed simulation step in seconds
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Largest |x| or |z| a player may occupy
    pub fn player_limit(&self) -> f32 {
        self.half_arena - self.wall_margin
    }

    /// Reject tunables the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.half_arena > self.wall_margin && self.wall_margin >= 0.0) {
            return Err(ConfigError::Invalid("ARENA_HALF_EXTENT"));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }
        if !(self.respawn_delay >= 0.0) {
            return Err(ConfigError::Invalid("RESPAWN_DELAY_SECS"));
        }
        if self.max_players == 0 || self.min_players > self.max_players {
            return Err(ConfigError::Invalid("MAX_PLAYERS"));
        }
        if self.max_health == 0 || self.projectile_damage == 0 {
            return Err(ConfigError::Invalid("max_health/projectile_damage"));
        }
        if !(self.projectile_speed > 0.0 && self.projectile_lifetime > 0.0) {
            return Err(ConfigError::Invalid("projectile_speed/projectile_lifetime"));
        }
        if !self.projectile_gravity.is_finite() {
            return Err(ConfigError::Invalid("PROJECTILE_GRAVITY"));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for configuration option: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
