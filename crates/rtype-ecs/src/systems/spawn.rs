//! Advances each `Spawner`'s wave clock and instantiates enemies whose
//! individual spawn delay has elapsed, then rolls over to the next wave once
//! every enemy in the current one has spawned.
//!
//! Grounded on the original engine's `SpawnSystem`: enemies within a wave spawn
//! on their own delay, and the wave only advances once all of them have fired.

use rtype_types::Vec2;
use tracing::warn;

use crate::components::{
    Collider, CollisionLayer, Enemy, Health, Transform, Velocity, Wave,
};
use crate::registry::{mask_of, Registry};

pub fn spawn_enemy(registry: &mut Registry, position: Vec2, request: &crate::components::SpawnRequest) -> rtype_types::EntityId {
    let (speed, archetype_hp, score, size) = request.archetype.stats();
    let health = if request.health > 0 { request.health } else { archetype_hp };

    let entity = registry.new_entity();
    let _ = registry.set_component(entity, Transform::at(position.x, position.y));
    let _ = registry.set_component(
        entity,
        Velocity::new(Vec2::new(-1.0, 0.0), speed),
    );
    let _ = registry.set_component(entity, Health::new(health));
    let _ = registry.set_component(
        entity,
        Collider::new(size, CollisionLayer::ENEMY, CollisionLayer::PLAYER | CollisionLayer::PLAYER_PROJECTILE),
    );
    let _ = registry.set_component(
        entity,
        Enemy {
            archetype: request.archetype,
            attack_pattern: crate::components::AttackPattern::LinearLeft,
            score_value: if request.score_value != 0 { request.score_value } else { score },
        },
    );
    if let Some(path) = &request.script_path {
        let _ = registry.set_component(entity, crate::components::LuaScript { script_path: path.clone() });
    }
    entity
}

fn advance_wave(wave: &Wave, spawner: &mut crate::components::Spawner, registry: &mut Registry, dt: f32) {
    spawner.elapsed_in_wave += dt;

    for enemy in &wave.enemies {
        if !enemy.has_spawned && spawner.elapsed_in_wave >= enemy.spawn_delay_seconds {
            spawn_enemy(registry, enemy.position, enemy);
        }
    }
}

pub fn update(registry: &mut Registry, dt: f32) {
    let mask = mask_of::<crate::components::Spawner>();
    for entity in registry.query(mask) {
        let mut spawner = match registry.get_component::<crate::components::Spawner>(entity) {
            Ok(s) => s.clone(),
            Err(_) => continue,
        };

        if !spawner.active || spawner.waves.is_empty() {
            continue;
        }
        if spawner.current_wave_index >= spawner.waves.len() {
            spawner.active = false;
            let _ = registry.set_component(entity, spawner);
            continue;
        }

        let mut wave = spawner.waves[spawner.current_wave_index].clone();
        advance_wave(&wave, &mut spawner, registry, dt);
        for enemy in wave.enemies.iter_mut() {
            if !enemy.has_spawned && spawner.elapsed_in_wave >= enemy.spawn_delay_seconds {
                enemy.has_spawned = true;
            }
        }
        spawner.waves[spawner.current_wave_index] = wave.clone();

        if spawner.elapsed_in_wave >= spawner.waves[spawner.current_wave_index].wave_interval_seconds {
            let all_spawned = wave.enemies.iter().all(|e| e.has_spawned);
            if all_spawned {
                spawner.current_wave_index += 1;
                spawner.elapsed_in_wave = 0.0;
                if spawner.current_wave_index >= spawner.waves.len() {
                    spawner.active = false;
                } else {
                    for enemy in spawner.waves[spawner.current_wave_index].enemies.iter_mut() {
                        enemy.has_spawned = false;
                    }
                }
            } else {
                warn!(entity = entity.get(), "wave interval elapsed with enemies still unspawned");
            }
        }

        let _ = registry.set_component(entity, spawner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{EnemyArchetype, Spawner, SpawnRequest};

    fn request(delay: f32) -> SpawnRequest {
        SpawnRequest {
            position: Vec2::new(800.0, 300.0),
            archetype: EnemyArchetype::Basic,
            script_path: None,
            health: 0,
            score_value: 0,
            spawn_delay_seconds: delay,
            has_spawned: false,
        }
    }

    #[test]
    fn enemies_spawn_at_their_individual_delay() {
        let mut reg = Registry::with_seed(1);
        let e = reg.new_entity();
        reg.set_component(
            e,
            Spawner::with_waves(vec![Wave {
                enemies: vec![request(0.0), request(1.0)],
                wave_interval_seconds: 2.0,
            }]),
        )
        .unwrap();

        update(&mut reg, 0.5);
        let enemies = reg.query(mask_of::<Enemy>());
        assert_eq!(enemies.len(), 1);

        update(&mut reg, 0.6);
        let enemies = reg.query(mask_of::<Enemy>());
        assert_eq!(enemies.len(), 2);
    }

    #[test]
    fn wave_advances_only_after_all_enemies_spawned() {
        let mut reg = Registry::with_seed(2);
        let e = reg.new_entity();
        reg.set_component(
            e,
            Spawner::with_waves(vec![
                Wave { enemies: vec![request(0.0)], wave_interval_seconds: 0.1 },
                Wave { enemies: vec![request(0.0)], wave_interval_seconds: 0.1 },
            ]),
        )
        .unwrap();

        update(&mut reg, 0.2);
        let spawner = reg.get_component::<Spawner>(e).unwrap();
        assert_eq!(spawner.current_wave_index, 1);
    }
}
