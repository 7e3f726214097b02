//! Authoritative simulation context: owns the game state and runs ticks
//!
//! Every handler and every tick runs to completion against `&mut self`, so
//! nothing here needs locking. The loop task in `game_loop` is the only owner.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use crate::config::GameConfig;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::combat::{CombatSystem, HitResult};
use super::entity::{ConnectionId, GameState, InputState, Player, Projectile};
use super::physics::PhysicsSystem;
use super::registry::{ClientSink, ConnectionRegistry, JoinError};
use super::respawn::RespawnQueue;
use super::snapshot::{SnapshotBuilder, StatusBoard};
use super::GameCommand;

/// What happened during one tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub respawned: Vec<ConnectionId>,
    /// Projectiles fired by held triggers
    pub fired: Vec<u64>,
    /// Projectiles removed for timing out or leaving the arena
    pub expired: usize,
    pub hits: Vec<HitResult>,
}

impl TickReport {
    pub fn kills(&self) -> impl Iterator<Item = &HitResult> {
        self.hits.iter().filter(|h| h.target_killed)
    }
}

pub struct Simulation {
    config: GameConfig,
    state: GameState,
    registry: ConnectionRegistry,
    respawns: RespawnQueue,
    snapshots: SnapshotBuilder,
    rng: ChaCha8Rng,
    next_projectile_id: u64,
    tick: u64,
}

impl Simulation {
    pub fn new(config: GameConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            state: GameState::default(),
            registry: ConnectionRegistry::new(),
            respawns: RespawnQueue::new(),
            snapshots: SnapshotBuilder::new(),
            rng,
            next_projectile_id: 0,
            tick: 0,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn status(&self) -> StatusBoard {
        StatusBoard::capture(
            self.tick,
            &self.state,
            self.registry.connection_count(),
            self.snapshots.built(),
        )
    }

    /// Route a command from a connection session
    pub fn dispatch(&mut self, command: GameCommand) {
        match command {
            GameCommand::Connect { sink } => self.handle_connect(sink),
            GameCommand::Client { connection_id, msg } => match msg {
                ClientMsg::JoinGame { name } => {
                    self.handle_join(connection_id, &name);
                }
                ClientMsg::PlayerInput(input) => {
                    self.handle_input(connection_id, input);
                }
                ClientMsg::Shoot => {
                    self.handle_fire(connection_id);
                }
                ClientMsg::Respawn => {
                    self.handle_respawn(connection_id);
                }
            },
            GameCommand::Disconnect { connection_id } => self.handle_disconnect(connection_id),
        }
    }

    pub fn handle_connect(&mut self, sink: Box<dyn ClientSink>) {
        debug!(connection_id = %sink.id(), "Connection attached");
        self.registry.attach(sink);
    }

    /// Handle a join request. Replies to the joiner and broadcasts a snapshot.
    pub fn handle_join(&mut self, id: ConnectionId, name: &str) -> Option<Player> {
        match self
            .registry
            .add_player(&mut self.state, id, name, &self.config)
        {
            Ok(player) => {
                info!(
                    player_id = %id,
                    name = %player.name,
                    player_count = self.state.player_count(),
                    "Player joined game"
                );
                self.update_activation();
                self.registry.send_to(
                    id,
                    ServerMsg::PlayerJoined {
                        player: player.clone(),
                    },
                );
                self.broadcast_snapshot();
                Some(player)
            }
            Err(JoinError::AlreadyJoined) => {
                warn!(player_id = %id, "Player already in game");
                None
            }
            Err(e) => {
                warn!(player_id = %id, error = %e, "Join refused");
                self.registry
                    .send_to(id, ServerMsg::error(e.code(), e.to_string()));
                None
            }
        }
    }

    /// Replace a player's buffered input
    pub fn handle_input(&mut self, id: ConnectionId, input: InputState) -> bool {
        let known = self
            .registry
            .set_input(&mut self.state, id, input, &self.config);
        if !known {
            debug!(connection_id = %id, "Input from unknown connection ignored");
        }
        known
    }

    /// Fire for a player. Returns the new projectile id, or None when the
    /// request is ignored (unknown sender, dead, cooling down, game inactive).
    pub fn handle_fire(&mut self, id: ConnectionId) -> Option<u64> {
        if !self.state.is_game_active {
            debug!(connection_id = %id, "Fire ignored, game inactive");
            return None;
        }
        let Some(player) = self.state.players.get_mut(&id) else {
            debug!(connection_id = %id, "Fire from unknown connection ignored");
            return None;
        };
        if !CombatSystem::can_fire(player) {
            debug!(player_id = %id, dead = player.is_dead, "Fire ignored");
            return None;
        }

        let projectile_id = fire(
            player,
            &mut self.state.projectiles,
            &mut self.next_projectile_id,
            &self.config,
        );
        self.broadcast_snapshot();
        Some(projectile_id)
    }

    /// Manual respawn request. Only a dead player comes back.
    pub fn handle_respawn(&mut self, id: ConnectionId) -> bool {
        match self.state.players.get(&id) {
            None => {
                debug!(connection_id = %id, "Respawn from unknown connection ignored");
                false
            }
            Some(player) if !player.is_dead => {
                debug!(player_id = %id, "Respawn ignored, player alive");
                false
            }
            Some(_) => self.respawn_player(id),
        }
    }

    pub fn handle_disconnect(&mut self, id: ConnectionId) {
        let attached = self.registry.detach(id);
        self.respawns.cancel(id);

        match self.registry.remove_player(&mut self.state, id) {
            Some(player) => {
                info!(
                    player_id = %id,
                    name = %player.name,
                    player_count = self.state.player_count(),
                    "Player left game"
                );
                self.update_activation();
                self.broadcast_snapshot();
            }
            None if attached => debug!(connection_id = %id, "Connection closed before joining"),
            None => debug!(connection_id = %id, "Disconnect for unknown connection"),
        }
    }

    /// Run one fixed step. Does nothing while the game is inactive.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport::default();
        if !self.state.is_game_active {
            return report;
        }

        self.tick += 1;
        report.tick = self.tick;

        let now = self.state.game_time;
        for id in self.respawns.drain_due(now) {
            if self.respawn_player(id) {
                report.respawned.push(id);
            }
        }

        self.update_players(dt, &mut report);
        self.update_projectiles(dt, &mut report);
        self.resolve_collisions(&mut report);

        self.state.game_time += f64::from(dt);

        self.broadcast_snapshot();

        trace!(
            tick = self.tick,
            alive = self.state.alive_count(),
            projectiles = self.state.projectiles.len(),
            pending_respawns = self.respawns.len(),
            hits = report.hits.len(),
            "Tick complete"
        );
        report
    }

    /// Advance living players and fire held triggers
    fn update_players(&mut self, dt: f32, report: &mut TickReport) {
        let config = &self.config;
        let registry = &self.registry;
        let projectiles = &mut self.state.projectiles;
        let next_id = &mut self.next_projectile_id;

        for player in self.state.players.values_mut() {
            if player.is_dead {
                continue;
            }

            let input = registry.input(player.id);
            *player = PhysicsSystem::advance_player(player, &input, dt, config);
            player.fire_cooldown = CombatSystem::update_cooldown(player.fire_cooldown, dt);

            if input.shoot && CombatSystem::can_fire(player) {
                report.fired.push(fire(player, projectiles, next_id, config));
            }
        }
    }

    /// Advance projectiles and drop the expired ones
    fn update_projectiles(&mut self, dt: f32, report: &mut TickReport) {
        let config = &self.config;
        let projectiles = std::mem::take(&mut self.state.projectiles);

        self.state.projectiles = projectiles
            .into_values()
            .filter_map(|projectile| {
                let next = PhysicsSystem::advance_projectile(&projectile, dt, config);
                if next.is_expired() {
                    report.expired += 1;
                    None
                } else {
                    Some((next.id, next))
                }
            })
            .collect();
    }

    /// Each projectile hits at most one player: the first living one in
    /// ascending id order that it overlaps.
    fn resolve_collisions(&mut self, report: &mut TickReport) {
        let now = self.state.game_time;
        let projectile_ids: Vec<u64> = self.state.projectiles.keys().copied().collect();

        for projectile_id in projectile_ids {
            let Some(projectile) = self.state.projectiles.get(&projectile_id) else {
                continue;
            };
            let target_id = self
                .state
                .players
                .values()
                .find(|p| !p.is_dead && PhysicsSystem::check_collision(p, projectile, &self.config))
                .map(|p| p.id);

            let Some(target_id) = target_id else {
                continue;
            };
            if let Some(projectile) = self.state.projectiles.remove(&projectile_id) {
                let hit = self.apply_hit(&projectile, target_id, now);
                debug!(
                    projectile_id = hit.projectile_id,
                    shooter_id = %hit.shooter_id,
                    target_id = %hit.target_id,
                    damage = hit.damage,
                    x = hit.position.x,
                    y = hit.position.y,
                    z = hit.position.z,
                    killed = hit.target_killed,
                    "Projectile hit"
                );
                report.hits.push(hit);
            }
        }
    }

    fn apply_hit(&mut self, projectile: &Projectile, target_id: ConnectionId, now: f64) -> HitResult {
        let mut killed = false;
        if let Some(target) = self.state.players.get_mut(&target_id) {
            let (health, dead) = CombatSystem::apply_damage(target.health, projectile.damage);
            target.health = health;
            if dead {
                killed = CombatSystem::kill(target, now);
            }
        }

        if killed {
            self.respawns
                .schedule(target_id, now + self.config.respawn_delay);
            self.registry.clear_input(target_id);

            if projectile.owner_id != target_id {
                if let Some(shooter) = self.state.players.get_mut(&projectile.owner_id) {
                    shooter.kills += 1;
                }
            }

            info!(
                killer_id = %projectile.owner_id,
                victim_id = %target_id,
                game_time = now,
                "Player killed"
            );
            self.registry.broadcast(ServerMsg::PlayerKilled {
                killer_id: projectile.owner_id,
                victim_id: target_id,
            });
        }

        HitResult {
            projectile_id: projectile.id,
            shooter_id: projectile.owner_id,
            target_id,
            damage: projectile.damage,
            position: projectile.position,
            target_killed: killed,
        }
    }

    /// Dead -> Alive. Whichever of the queue or a manual request comes first
    /// wins; the other finds the player alive and does nothing.
    fn respawn_player(&mut self, id: ConnectionId) -> bool {
        if !self.state.players.get(&id).is_some_and(|p| p.is_dead) {
            return false;
        }

        let spawn = PhysicsSystem::random_spawn(&mut self.rng, &self.config);
        let Some(player) = self.state.players.get_mut(&id) else {
            return false;
        };
        if !CombatSystem::revive(player, spawn) {
            return false;
        }

        self.respawns.cancel(id);
        self.registry.clear_input(id);
        info!(player_id = %id, x = spawn.x, z = spawn.z, "Player respawned");
        true
    }

    fn update_activation(&mut self) {
        let active = self.state.player_count() >= self.config.min_players.max(1);
        if active != self.state.is_game_active {
            self.state.is_game_active = active;
            info!(
                active,
                player_count = self.state.player_count(),
                "Game activity changed"
            );
        }
    }

    fn broadcast_snapshot(&mut self) {
        let snapshot = self.snapshots.build(self.tick, &self.state);
        self.registry.broadcast(snapshot);
    }
}

/// Spawn a projectile for `player` and start its cooldown
fn fire(
    player: &mut Player,
    projectiles: &mut BTreeMap<u64, Projectile>,
    next_id: &mut u64,
    config: &GameConfig,
) -> u64 {
    *next_id += 1;
    let id = *next_id;
    projectiles.insert(id, PhysicsSystem::create_projectile(player, id, config));
    player.fire_cooldown = config.fire_cooldown;
    id
}
