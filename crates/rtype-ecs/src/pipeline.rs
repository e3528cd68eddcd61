//! Orchestrates every system in the fixed per-tick order. A room's game loop
//! calls `Pipeline::step` once per fixed timestep and gets back the
//! collision and destruction events the network layer needs to notify peers.

use crate::registry::Registry;
use crate::systems::{self, CollisionEvent, Destroyed, ScriptHost};

/// Bounds and knobs the pipeline needs but that don't belong on any single entity.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub screen_width: f32,
    pub screen_height: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { screen_width: 1920.0, screen_height: 1080.0 }
    }
}

/// Everything a caller might want to react to after a tick: the collisions that
/// occurred and the entities that were destroyed, with why.
pub struct TickReport {
    pub collisions: Vec<CollisionEvent>,
    pub destroyed: Vec<Destroyed>,
}

/// A no-op `ScriptHost` for rooms with no scripted entities, or for tests.
pub struct NullScriptHost;

impl ScriptHost for NullScriptHost {
    fn on_update(
        &mut self,
        _registry: &mut Registry,
        _entity: rtype_types::EntityId,
        _script_path: &str,
        _dt: f32,
    ) -> Result<(), String> {
        Ok(())
    }
}

/// Runs one fixed-timestep tick: Movement, Collision, Collision Resolution,
/// Health, Spawn, AI, Projectile, Boundary, Weapon, Orbital, Scripted
/// behavior, Buff timers, Map scrolling, then end-of-tick cleanup.
pub fn step(
    registry: &mut Registry,
    config: &PipelineConfig,
    script_host: &mut dyn ScriptHost,
    dt: f32,
    elapsed_seconds: f32,
) -> TickReport {
    systems::movement::update(registry, dt);

    let collisions = systems::collision::update(registry);
    systems::collision_resolution::update(registry, &collisions);

    systems::health::update(registry, dt);
    systems::spawn::update(registry, dt);
    systems::ai::update(registry, elapsed_seconds);
    systems::projectile::update(registry, dt);
    systems::boundary::update(registry, config.screen_width, config.screen_height);
    systems::weapon::update(registry, dt);
    systems::orbital::update(registry, dt);
    systems::scripted::update(registry, script_host, dt);
    systems::buff::update(registry, dt);
    systems::map::update(registry, dt);

    let destroyed = systems::cleanup::update(registry);

    TickReport { collisions, destroyed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Collider, CollisionLayer, Health, Projectile, Transform, Velocity};

    #[test]
    fn a_single_tick_runs_every_system_without_panicking() {
        let mut reg = Registry::with_seed(1);
        let player = reg.new_entity();
        reg.set_component(player, Transform::at(100.0, 100.0)).unwrap();
        reg.set_component(player, Velocity::new(rtype_types::Vec2::ZERO, 0.0)).unwrap();
        reg.set_component(player, Health::new(100)).unwrap();
        reg.set_component(
            player,
            Collider::new(rtype_types::Vec2::new(32.0, 32.0), CollisionLayer::PLAYER, CollisionLayer::ENEMY),
        )
        .unwrap();

        let enemy = reg.new_entity();
        reg.set_component(enemy, Transform::at(110.0, 100.0)).unwrap();
        reg.set_component(enemy, Velocity::new(rtype_types::Vec2::new(-1.0, 0.0), 50.0)).unwrap();
        reg.set_component(enemy, Health::new(10)).unwrap();
        reg.set_component(
            enemy,
            Collider::new(rtype_types::Vec2::new(32.0, 32.0), CollisionLayer::ENEMY, CollisionLayer::PLAYER),
        )
        .unwrap();

        let projectile = reg.new_entity();
        reg.set_component(projectile, Transform::at(105.0, 100.0)).unwrap();
        reg.set_component(
            projectile,
            Projectile { damage: 15, lifetime_seconds: 1.0, owner: player, friendly: true },
        )
        .unwrap();
        reg.set_component(
            projectile,
            Collider::new(
                rtype_types::Vec2::new(8.0, 8.0),
                CollisionLayer::PLAYER_PROJECTILE,
                CollisionLayer::ENEMY,
            ),
        )
        .unwrap();

        let config = PipelineConfig::default();
        let mut host = NullScriptHost;
        let report = step(&mut reg, &config, &mut host, 1.0 / 60.0, 0.0);

        assert!(!report.collisions.is_empty());
    }

    #[test]
    fn deterministic_across_identical_seeds_and_inputs() {
        fn run(seed: u64) -> Vec<rtype_types::EntityId> {
            let mut reg = Registry::with_seed(seed);
            let config = PipelineConfig::default();
            let mut host = NullScriptHost;
            for _ in 0..5 {
                reg.new_entity();
            }
            for _ in 0..120 {
                step(&mut reg, &config, &mut host, 1.0 / 60.0, 0.0);
            }
            reg.query(0)
        }

        assert_eq!(run(7), run(7));
    }
}
