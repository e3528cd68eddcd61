//! Glue between a room's `rtype_ecs::Registry` and the wire protocol: entity
//! type codes, player spawning, and per-tick snapshot construction.

use rtype_ecs::components::{Collider, CollisionLayer, Health, Player, Transform, Velocity, Weapon};
use rtype_ecs::registry::Registry;
use rtype_protocol::{EntityState, GameruleEntry};
use rtype_types::{PlayerId, Vec2};

/// `EntityState.entity_type` codes. Not versioned by the codec itself (the
/// handshake's `server_version` is what clients key their interpretation of
/// these on), just a closed set the client-side renderer switches over.
pub mod entity_type {
    pub const PLAYER: u16 = 0;
    pub const ENEMY_BASIC: u16 = 10;
    pub const ENEMY_HEAVY: u16 = 11;
    pub const ENEMY_FAST: u16 = 12;
    pub const ENEMY_BOSS: u16 = 13;
    pub const PROJECTILE_FRIENDLY: u16 = 20;
    pub const PROJECTILE_ENEMY: u16 = 21;
    pub const COLLECTIBLE: u16 = 30;
    pub const ORBITAL_MODULE: u16 = 40;
    pub const UNKNOWN: u16 = u16::MAX;
}

const PLAYER_SIZE: Vec2 = Vec2 { x: 32.0, y: 24.0 };
const PLAYER_SPEED: f32 = 300.0;
const PLAYER_MAX_HEALTH: i32 = 100;
const PLAYER_FIRE_RATE: f32 = 7.0;
const PLAYER_DAMAGE: f32 = 10.0;
const PLAYER_LIVES: i32 = 3;

/// Spawns a fresh player ship for a gameplay session. Players are laid out
/// on a vertical line near the left edge of the playfield, spaced apart so
/// they don't start overlapping.
pub fn spawn_player(registry: &mut Registry, player_id: PlayerId, spawn_index: usize, screen_height: f32) -> rtype_types::EntityId {
    let entity = registry.new_entity();
    let y = (spawn_index as f32 + 1.0) * (screen_height / 6.0).max(40.0);
    registry
        .set_component(entity, Transform::at(80.0, y))
        .expect("freshly created entity accepts components");
    registry
        .set_component(entity, Velocity::new(Vec2::ZERO, PLAYER_SPEED))
        .expect("freshly created entity accepts components");
    registry
        .set_component(entity, Health::new(PLAYER_MAX_HEALTH))
        .expect("freshly created entity accepts components");
    registry
        .set_component(
            entity,
            Collider::new(PLAYER_SIZE, CollisionLayer::PLAYER, CollisionLayer::ENEMY | CollisionLayer::ENEMY_PROJECTILE | CollisionLayer::COLLECTIBLE),
        )
        .expect("freshly created entity accepts components");
    registry
        .set_component(entity, Weapon::new(PLAYER_FIRE_RATE, PLAYER_DAMAGE))
        .expect("freshly created entity accepts components");
    registry
        .set_component(
            entity,
            Player {
                score: 0,
                lives: PLAYER_LIVES,
                player_id,
            },
        )
        .expect("freshly created entity accepts components");
    entity
}

/// Seeds a room with a small default enemy wave so a match has something to
/// shoot at. There is no level-editor or map format in scope (spec.md has no
/// [MAP] authoring module), so this stands in for "whatever the client's
/// campaign data would normally describe".
pub fn spawn_default_waves(registry: &mut Registry, screen_width: f32) {
    use rtype_ecs::components::{EnemyArchetype, SpawnRequest, Spawner, Wave};

    let director = registry.new_entity();
    let wave = Wave {
        enemies: vec![
            SpawnRequest {
                position: Vec2::new(screen_width - 80.0, 200.0),
                archetype: EnemyArchetype::Basic,
                script_path: None,
                health: 0,
                score_value: 0,
                spawn_delay_seconds: 1.0,
                has_spawned: false,
            },
            SpawnRequest {
                position: Vec2::new(screen_width - 80.0, 400.0),
                archetype: EnemyArchetype::Basic,
                script_path: None,
                health: 0,
                score_value: 0,
                spawn_delay_seconds: 2.5,
                has_spawned: false,
            },
            SpawnRequest {
                position: Vec2::new(screen_width - 120.0, 600.0),
                archetype: EnemyArchetype::Fast,
                script_path: None,
                health: 0,
                score_value: 0,
                spawn_delay_seconds: 4.0,
                has_spawned: false,
            },
        ],
        wave_interval_seconds: 8.0,
    };
    registry
        .set_component(director, Spawner::with_waves(vec![wave]))
        .expect("freshly created entity accepts components");
}

/// The ruleset sent as a `GamerulePacket` at game start (spec.md §6.1).
/// There is no per-room override mechanism yet, so every room starts with
/// the same values derived from the player archetype's own constants.
pub fn default_gamerules() -> Vec<GameruleEntry> {
    vec![
        GameruleEntry {
            key: "player.health".to_string(),
            value: PLAYER_MAX_HEALTH as f32,
        },
        GameruleEntry {
            key: "player.speed".to_string(),
            value: PLAYER_SPEED,
        },
        GameruleEntry {
            key: "player.fireRate".to_string(),
            value: PLAYER_FIRE_RATE,
        },
    ]
}

fn entity_type_of(registry: &Registry, entity: rtype_types::EntityId) -> u16 {
    use rtype_ecs::components::{Collectible, Enemy, OrbitalModule, Projectile};

    if registry.has_component::<Player>(entity) {
        return entity_type::PLAYER;
    }
    if let Ok(enemy) = registry.get_component::<Enemy>(entity) {
        return match enemy.archetype {
            rtype_ecs::components::EnemyArchetype::Basic => entity_type::ENEMY_BASIC,
            rtype_ecs::components::EnemyArchetype::Heavy => entity_type::ENEMY_HEAVY,
            rtype_ecs::components::EnemyArchetype::Fast => entity_type::ENEMY_FAST,
            rtype_ecs::components::EnemyArchetype::Boss => entity_type::ENEMY_BOSS,
        };
    }
    if let Ok(projectile) = registry.get_component::<Projectile>(entity) {
        return if projectile.friendly {
            entity_type::PROJECTILE_FRIENDLY
        } else {
            entity_type::PROJECTILE_ENEMY
        };
    }
    if registry.has_component::<Collectible>(entity) {
        return entity_type::COLLECTIBLE;
    }
    if registry.has_component::<OrbitalModule>(entity) {
        return entity_type::ORBITAL_MODULE;
    }
    entity_type::UNKNOWN
}

/// Builds the `EntityState` list for one tick's `GameState`/`GameStart`
/// snapshot (spec.md §4.3 step 3): every live entity that has a `Transform`,
/// in ascending entity-id order (same order `Registry::query` returns).
pub fn build_snapshot(registry: &Registry, last_processed_input: &std::collections::HashMap<PlayerId, u32>) -> Vec<EntityState> {
    let transform_mask = rtype_ecs::registry::mask_of::<Transform>();
    registry
        .query(transform_mask)
        .into_iter()
        .map(|entity| {
            let transform = registry
                .get_component::<Transform>(entity)
                .expect("query guarantees Transform is present");
            let health = registry
                .get_component::<Health>(entity)
                .map(|h| h.current)
                .unwrap_or(-1);
            let last_input = registry
                .get_component::<Player>(entity)
                .and_then(|p| last_processed_input.get(&p.player_id))
                .copied()
                .unwrap_or(0);
            EntityState {
                entity_id: entity.get(),
                entity_type: entity_type_of(registry, entity),
                position: (transform.position.x, transform.position.y),
                health,
                last_processed_input: last_input,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_player_appears_in_the_snapshot_with_its_last_processed_input() {
        let mut registry = Registry::with_seed(1);
        let entity = spawn_player(&mut registry, PlayerId(7), 0, 1080.0);

        let mut last_processed_input = std::collections::HashMap::new();
        last_processed_input.insert(PlayerId(7), 42);

        let snapshot = build_snapshot(&registry, &last_processed_input);
        assert_eq!(snapshot.len(), 1);
        let state = &snapshot[0];
        assert_eq!(state.entity_id, entity.get());
        assert_eq!(state.entity_type, entity_type::PLAYER);
        assert_eq!(state.health, PLAYER_MAX_HEALTH);
        assert_eq!(state.last_processed_input, 42);
    }

    #[test]
    fn default_waves_spawn_without_touching_the_snapshot() {
        let mut registry = Registry::with_seed(1);
        spawn_default_waves(&mut registry, 1920.0);

        // Spawners have no Transform of their own, so they stay invisible to clients
        // until a system materializes an actual enemy entity for them.
        let snapshot = build_snapshot(&registry, &std::collections::HashMap::new());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn default_gamerules_carry_the_player_spawn_constants() {
        let rules = default_gamerules();
        let health = rules.iter().find(|r| r.key == "player.health").unwrap();
        assert_eq!(health.value, PLAYER_MAX_HEALTH as f32);
    }
}
