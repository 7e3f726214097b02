//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{GameHandle, GameLoop};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub game: GameHandle,
}

impl AppState {
    /// Build the state together with the loop it talks to. The caller spawns
    /// the returned loop.
    pub fn new(config: Config) -> (Self, GameLoop) {
        let (game_loop, game) = GameLoop::new(config.game.clone());
        let state = Self {
            config: Arc::new(config),
            game,
        };
        (state, game_loop)
    }
}
