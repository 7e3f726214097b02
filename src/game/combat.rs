//! Combat system - damage, death and respawn transitions

use glam::Vec3;

use super::entity::{ConnectionId, Player};

/// Combat system for managing weapons, damage and life state
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a player can fire (alive and off cooldown)
    pub fn can_fire(player: &Player) -> bool {
        !player.is_dead && player.fire_cooldown <= 0.0
    }

    /// Tick a weapon cooldown down, never below zero
    pub fn update_cooldown(cooldown: f32, dt: f32) -> f32 {
        (cooldown - dt).max(0.0)
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: u32, damage: u32) -> (u32, bool) {
        let new_health = current_health.saturating_sub(damage);
        (new_health, new_health == 0)
    }

    /// Alive -> Dead. Returns false if the player was already dead.
    pub fn kill(player: &mut Player, now: f64) -> bool {
        if player.is_dead {
            return false;
        }
        player.health = 0;
        player.is_dead = true;
        player.death_time = Some(now);
        player.deaths += 1;
        true
    }

    /// Dead -> Alive at `spawn`. A no-op returning false for living players.
    pub fn revive(player: &mut Player, spawn: Vec3) -> bool {
        if !player.is_dead {
            return false;
        }
        player.health = player.max_health;
        player.is_dead = false;
        player.death_time = None;
        player.fire_cooldown = 0.0;
        player.position = spawn;
        true
    }
}

/// Hit result from collision resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub projectile_id: u64,
    pub shooter_id: ConnectionId,
    pub target_id: ConnectionId,
    pub damage: u32,
    pub position: Vec3,
    pub target_killed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::entity::PLAYER_COLORS;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn fresh_player() -> Player {
        Player::new(
            Uuid::new_v4(),
            "target".to_string(),
            PLAYER_COLORS[1],
            Vec3::new(0.0, 0.5, 0.0),
            0.0,
            &GameConfig::default(),
        )
    }

    #[test]
    fn damage_floors_at_zero() {
        assert_eq!(CombatSystem::apply_damage(100, 25), (75, false));
        assert_eq!(CombatSystem::apply_damage(25, 25), (0, true));
        assert_eq!(CombatSystem::apply_damage(10, 25), (0, true));
    }

    #[test]
    fn kill_and_revive_happen_once() {
        let mut player = fresh_player();

        assert!(CombatSystem::kill(&mut player, 12.5));
        assert!(player.is_dead);
        assert_eq!(player.death_time, Some(12.5));
        assert!(!CombatSystem::kill(&mut player, 13.0));
        assert_eq!(player.deaths, 1);
        assert_eq!(player.death_time, Some(12.5));

        let spawn = Vec3::new(4.0, 0.5, -3.0);
        assert!(CombatSystem::revive(&mut player, spawn));
        assert_eq!(player.health, player.max_health);
        assert_eq!(player.position, spawn);
        assert!(player.death_time.is_none());

        // second respawn attempt must not teleport a living player
        assert!(!CombatSystem::revive(&mut player, Vec3::ZERO));
        assert_eq!(player.position, spawn);
    }

    #[test]
    fn dead_players_cannot_fire() {
        let mut player = fresh_player();
        assert!(CombatSystem::can_fire(&player));
        player.fire_cooldown = 0.1;
        assert!(!CombatSystem::can_fire(&player));
        player.fire_cooldown = CombatSystem::update_cooldown(player.fire_cooldown, 0.5);
        assert_eq!(player.fire_cooldown, 0.0);
        CombatSystem::kill(&mut player, 0.0);
        assert!(!CombatSystem::can_fire(&player));
    }

    proptest! {
        #[test]
        fn health_stays_in_range(events in proptest::collection::vec(prop_oneof![
            (1u32..60).prop_map(Some),
            Just(None),
        ], 0..40)) {
            let mut player = fresh_player();
            for event in events {
                match event {
                    Some(damage) => {
                        if player.is_dead {
                            continue;
                        }
                        let (health, dead) = CombatSystem::apply_damage(player.health, damage);
                        player.health = health;
                        if dead {
                            CombatSystem::kill(&mut player, 1.0);
                        }
                    }
                    None => {
                        CombatSystem::revive(&mut player, Vec3::ZERO);
                    }
                }
                prop_assert!(player.health <= player.max_health);
                prop_assert_eq!(player.is_dead, player.health == 0);
            }
        }
    }
}
