//! Motion and collision engine
//!
//! Pure functions over value copies. Nothing here touches shared state, so
//! every function is deterministic given its inputs.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use crate::config::GameConfig;

use super::entity::{heading, InputState, Player, Projectile, PLAYER_COLORS};

/// Physics system for advancing players and projectiles
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance a player by one step of buffered input.
    ///
    /// Turning is applied first and translation then follows the new heading,
    /// so turning while moving curves instead of sliding along a stale yaw.
    /// Left and right are additive. The vertical position is never changed.
    pub fn advance_player(
        player: &Player,
        input: &InputState,
        dt: f32,
        config: &GameConfig,
    ) -> Player {
        let dt = dt.max(0.0);
        let mut next = player.clone();

        let mut turn = 0.0;
        if input.left {
            turn += config.turn_rate * dt;
        }
        if input.right {
            turn -= config.turn_rate * dt;
        }
        if turn != 0.0 {
            next.yaw = wrap_yaw(player.yaw + turn);
        }

        let mut step = 0.0;
        if input.forward {
            step += config.player_speed * dt;
        }
        if input.backward {
            step -= config.player_speed * dt;
        }
        if step != 0.0 {
            next.position += heading(next.yaw) * step;
        }

        next.position = Self::clamp_to_arena(next.position, config);
        next
    }

    /// Apply mouse-look turning carried by an input message.
    ///
    /// Client deltas are untrusted; the magnitude is clamped before use.
    pub fn apply_look(player: &Player, input: &InputState, config: &GameConfig) -> Player {
        let mut next = player.clone();
        if let Some(dx) = input.mouse_x.filter(|dx| dx.is_finite() && *dx != 0.0) {
            let dx = dx.clamp(-config.max_mouse_delta, config.max_mouse_delta);
            next.yaw = wrap_yaw(player.yaw - dx * config.mouse_sensitivity);
        }
        next
    }

    /// Advance a projectile by `dt` seconds.
    ///
    /// Leaving the arena or the vertical play band expires the projectile
    /// immediately.
    pub fn advance_projectile(projectile: &Projectile, dt: f32, config: &GameConfig) -> Projectile {
        let dt = dt.max(0.0);
        let mut next = projectile.clone();

        next.position += projectile.velocity * dt;
        if config.projectile_gravity != 0.0 {
            next.velocity.y += config.projectile_gravity * dt;
        }
        next.lifetime -= dt;

        if Self::is_out_of_bounds(next.position, config) {
            next.lifetime = next.lifetime.min(0.0);
        }
        next
    }

    /// Spawn a projectile at the player's muzzle, travelling along its heading
    pub fn create_projectile(player: &Player, id: u64, config: &GameConfig) -> Projectile {
        let forward = player.forward();
        let position =
            player.position + forward * config.muzzle_offset + Vec3::Y * config.muzzle_height;
        let velocity = forward * config.projectile_speed + Vec3::Y * config.projectile_lift;

        Projectile {
            id,
            position,
            velocity,
            owner_id: player.id,
            damage: config.projectile_damage,
            lifetime: config.projectile_lifetime,
        }
    }

    /// True when the projectile overlaps the player and was fired by someone else.
    /// Distance is full 3-D Euclidean.
    pub fn check_collision(player: &Player, projectile: &Projectile, config: &GameConfig) -> bool {
        if projectile.owner_id == player.id {
            return false;
        }
        let radius = config.collision_radius;
        player.position.distance_squared(projectile.position) < radius * radius
    }

    /// Clamp a position into the walkable part of the arena
    pub fn clamp_to_arena(position: Vec3, config: &GameConfig) -> Vec3 {
        let limit = config.player_limit();
        Vec3::new(
            position.x.clamp(-limit, limit),
            position.y,
            position.z.clamp(-limit, limit),
        )
    }

    /// Check if a point has left the arena or the vertical play band
    pub fn is_out_of_bounds(position: Vec3, config: &GameConfig) -> bool {
        position.x.abs() > config.half_arena
            || position.z.abs() > config.half_arena
            || position.y < config.floor_min
            || position.y > config.ceiling_max
    }

    /// Join spawn on a ring around the centre, facing inwards.
    /// Returns (position, yaw).
    pub fn ring_spawn(slot: usize, config: &GameConfig) -> (Vec3, f32) {
        let angle = TAU * (slot % PLAYER_COLORS.len()) as f32 / PLAYER_COLORS.len() as f32;
        let position = Self::clamp_to_arena(
            Vec3::new(
                angle.cos() * config.spawn_radius,
                config.spawn_height,
                angle.sin() * config.spawn_radius,
            ),
            config,
        );
        let yaw = wrap_yaw((-position.x).atan2(-position.z));
        (position, yaw)
    }

    /// Random in-bounds respawn point
    pub fn random_spawn<R: Rng>(rng: &mut R, config: &GameConfig) -> Vec3 {
        let spread = config.spawn_spread.min(config.player_limit());
        if spread <= 0.0 {
            return Vec3::new(0.0, config.spawn_height, 0.0);
        }
        let x = rng.gen_range(-spread..=spread);
        let z = rng.gen_range(-spread..=spread);
        Self::clamp_to_arena(Vec3::new(x, config.spawn_height, z), config)
    }
}

/// Normalize an angle to `[0, 2π)`
pub fn wrap_yaw(yaw: f32) -> f32 {
    let wrapped = yaw.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    fn player_at(position: Vec3, yaw: f32) -> Player {
        Player::new(
            Uuid::new_v4(),
            "tester".to_string(),
            PLAYER_COLORS[0],
            position,
            yaw,
            &GameConfig::default(),
        )
    }

    fn forward_only() -> InputState {
        InputState {
            forward: true,
            ..InputState::default()
        }
    }

    #[test]
    fn forward_step_moves_along_heading() {
        let config = GameConfig::default();
        let player = player_at(Vec3::new(0.0, 0.5, 0.0), 0.0);

        let next = PhysicsSystem::advance_player(&player, &forward_only(), 1.0 / 60.0, &config);

        assert!(next.position.x.abs() < 1e-6);
        assert_eq!(next.position.y, 0.5);
        assert!((next.position.z - 0.083_333).abs() < 1e-4);
        assert_eq!(next.yaw, 0.0);
    }

    #[test]
    fn turn_is_applied_before_translation() {
        let config = GameConfig::default();
        let player = player_at(Vec3::new(0.0, 0.5, 0.0), 0.0);
        let input = InputState {
            forward: true,
            left: true,
            ..InputState::default()
        };

        let next = PhysicsSystem::advance_player(&player, &input, 0.5, &config);

        // yaw 1.5 rad after the turn; translation must use it
        assert!((next.yaw - 1.5).abs() < 1e-5);
        let expected = heading(1.5) * 2.5;
        assert!((next.position.x - expected.x).abs() < 1e-4);
        assert!((next.position.z - expected.z).abs() < 1e-4);
    }

    #[test]
    fn opposite_turns_cancel() {
        let config = GameConfig::default();
        let player = player_at(Vec3::new(1.0, 0.5, 1.0), 1.0);
        let input = InputState {
            left: true,
            right: true,
            ..InputState::default()
        };

        let next = PhysicsSystem::advance_player(&player, &input, 0.1, &config);
        assert_eq!(next, player);
    }

    #[test]
    fn right_turn_wraps_below_zero() {
        let config = GameConfig::default();
        let player = player_at(Vec3::new(0.0, 0.5, 0.0), 0.0);
        let input = InputState {
            right: true,
            ..InputState::default()
        };

        let next = PhysicsSystem::advance_player(&player, &input, 0.1, &config);
        assert!((next.yaw - (TAU - 0.3)).abs() < 1e-5);
    }

    #[test]
    fn player_is_held_off_the_walls() {
        let config = GameConfig::default();
        let player = player_at(Vec3::new(0.0, 0.5, 23.9), 0.0);

        let next = PhysicsSystem::advance_player(&player, &forward_only(), 1.0, &config);
        assert_eq!(next.position.z, config.player_limit());
    }

    #[test]
    fn mouse_look_is_clamped() {
        let config = GameConfig::default();
        let player = player_at(Vec3::new(0.0, 0.5, 0.0), 1.0);
        let input = InputState {
            mouse_x: Some(-1.0e6),
            ..InputState::default()
        };

        let next = PhysicsSystem::apply_look(&player, &input, &config);
        let expected = wrap_yaw(1.0 + config.max_mouse_delta * config.mouse_sensitivity);
        assert!((next.yaw - expected).abs() < 1e-5);
        assert_eq!(next.position, player.position);
    }

    #[test]
    fn projectile_spawns_at_muzzle() {
        let config = GameConfig::default();
        let player = player_at(Vec3::new(2.0, 0.5, 3.0), 0.0);

        let projectile = PhysicsSystem::create_projectile(&player, 7, &config);

        assert_eq!(projectile.id, 7);
        assert_eq!(projectile.owner_id, player.id);
        assert!((projectile.position - Vec3::new(2.0, 1.0, 4.2)).length() < 1e-5);
        assert!((projectile.velocity - Vec3::new(0.0, 0.5, 15.0)).length() < 1e-5);
        assert_eq!(projectile.damage, config.projectile_damage);
        assert_eq!(projectile.lifetime, config.projectile_lifetime);
    }

    #[test]
    fn projectile_flies_fifteen_units_per_second() {
        let config = GameConfig::default();
        let player = player_at(Vec3::new(0.0, 0.5, 0.0), 0.0);
        let mut projectile = PhysicsSystem::create_projectile(&player, 1, &config);
        let start_z = projectile.position.z;

        let dt = 1.0 / 30.0;
        for _ in 0..30 {
            projectile = PhysicsSystem::advance_projectile(&projectile, dt, &config);
        }

        assert!((projectile.position.z - start_z - 15.0).abs() < 1e-3);
        assert!(!projectile.is_expired());
    }

    #[test]
    fn projectile_expires_when_leaving_arena() {
        let config = GameConfig::default();
        let player = player_at(Vec3::new(0.0, 0.5, 0.0), 0.0);
        let mut projectile = PhysicsSystem::create_projectile(&player, 1, &config);

        let dt = 1.0 / 30.0;
        while projectile.position.z <= config.half_arena {
            assert!(!projectile.is_expired());
            projectile = PhysicsSystem::advance_projectile(&projectile, dt, &config);
        }
        assert_eq!(projectile.lifetime, 0.0);
    }

    #[test]
    fn gravity_bends_projectile_down() {
        let config = GameConfig {
            projectile_gravity: -1.0,
            ..GameConfig::default()
        };
        let player = player_at(Vec3::new(0.0, 0.5, 0.0), 0.0);
        let projectile = PhysicsSystem::create_projectile(&player, 1, &config);

        let next = PhysicsSystem::advance_projectile(&projectile, 1.0, &config);
        assert!((next.velocity.y - (config.projectile_lift - 1.0)).abs() < 1e-6);
    }

    #[test]
    fn projectile_below_floor_expires() {
        let config = GameConfig::default();
        let projectile = Projectile {
            id: 1,
            position: Vec3::new(0.0, -4.9, 0.0),
            velocity: Vec3::new(0.0, -1.0, 0.0),
            owner_id: Uuid::new_v4(),
            damage: 25,
            lifetime: 4.0,
        };
        let next = PhysicsSystem::advance_projectile(&projectile, 0.5, &config);
        assert!(next.is_expired());
    }

    #[test]
    fn collision_uses_full_3d_distance() {
        let config = GameConfig::default();
        let target = player_at(Vec3::new(0.0, 0.5, 0.0), 0.0);
        let mut projectile = Projectile {
            id: 1,
            position: Vec3::new(0.0, 0.5, 0.9),
            velocity: Vec3::ZERO,
            owner_id: Uuid::new_v4(),
            damage: 25,
            lifetime: 1.0,
        };
        assert!(PhysicsSystem::check_collision(&target, &projectile, &config));

        // horizontally overlapping but too high
        projectile.position = Vec3::new(0.0, 1.6, 0.0);
        assert!(!PhysicsSystem::check_collision(&target, &projectile, &config));
    }

    #[test]
    fn ring_spawn_faces_centre() {
        let config = GameConfig::default();
        for slot in 0..PLAYER_COLORS.len() {
            let (position, yaw) = PhysicsSystem::ring_spawn(slot, &config);
            assert!((position.length_squared() - 100.25).abs() < 1e-3);
            let towards_centre = -Vec3::new(position.x, 0.0, position.z).normalize();
            assert!((heading(yaw) - towards_centre).length() < 1e-4);
        }
    }

    #[test]
    fn random_spawn_is_seeded_and_in_bounds() {
        let config = GameConfig::default();
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..50 {
            let spawn = PhysicsSystem::random_spawn(&mut a, &config);
            assert_eq!(spawn, PhysicsSystem::random_spawn(&mut b, &config));
            assert!(spawn.x.abs() <= config.spawn_spread);
            assert!(spawn.z.abs() <= config.spawn_spread);
            assert_eq!(spawn.y, config.spawn_height);
        }
    }

    fn arb_input() -> impl Strategy<Value = InputState> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(forward, backward, left, right)| InputState {
                forward,
                backward,
                left,
                right,
                ..InputState::default()
            },
        )
    }

    proptest! {
        #[test]
        fn players_never_leave_the_walkable_area(
            inputs in proptest::collection::vec(arb_input(), 1..60),
            dt in 0.0f32..2.0,
            yaw in 0.0f32..TAU,
        ) {
            let config = GameConfig::default();
            let limit = config.player_limit();
            let mut player = player_at(Vec3::new(0.0, 0.5, 0.0), yaw);
            for input in &inputs {
                player = PhysicsSystem::advance_player(&player, input, dt, &config);
                prop_assert!(player.position.x.abs() <= limit);
                prop_assert!(player.position.z.abs() <= limit);
                prop_assert!(player.yaw >= 0.0 && player.yaw < TAU);
            }
        }

        #[test]
        fn zero_step_is_identity(input in arb_input(), x in -24.0f32..24.0, z in -24.0f32..24.0, yaw in 0.0f32..TAU) {
            let config = GameConfig::default();
            let player = player_at(Vec3::new(x, 0.5, z), yaw);
            prop_assert_eq!(PhysicsSystem::advance_player(&player, &input, 0.0, &config), player.clone());

            let projectile = PhysicsSystem::create_projectile(&player, 3, &config);
            prop_assert_eq!(PhysicsSystem::advance_projectile(&projectile, 0.0, &config), projectile);
        }

        #[test]
        fn lifetime_never_increases(
            dt in 0.0f32..1.0,
            lifetime in -1.0f32..5.0,
            px in -40.0f32..40.0,
            py in -10.0f32..20.0,
            vz in -30.0f32..30.0,
        ) {
            let config = GameConfig::default();
            let projectile = Projectile {
                id: 1,
                position: Vec3::new(px, py, 0.0),
                velocity: Vec3::new(0.0, 0.0, vz),
                owner_id: Uuid::new_v4(),
                damage: 25,
                lifetime,
            };
            let next = PhysicsSystem::advance_projectile(&projectile, dt, &config);
            prop_assert!(next.lifetime <= projectile.lifetime);
        }

        #[test]
        fn owner_is_never_hit(dx in -0.5f32..0.5, dy in -0.5f32..0.5, dz in -0.5f32..0.5) {
            let config = GameConfig::default();
            let player = player_at(Vec3::new(0.0, 0.5, 0.0), 0.0);
            let projectile = Projectile {
                id: 1,
                position: player.position + Vec3::new(dx, dy, dz),
                velocity: Vec3::ZERO,
                owner_id: player.id,
                damage: 25,
                lifetime: 1.0,
            };
            prop_assert!(!PhysicsSystem::check_collision(&player, &projectile, &config));
        }
    }
}
