//! Drives enemy movement for entities that aren't scripted: each `AttackPattern`
//! maps to a fixed velocity/heading rule, applied before the generic movement
//! integration step consumes the resulting `Velocity`.
//!
//! Grounded on the original engine's `AISystem`, which dispatches on an enemy
//! "behavior" tag the same way.

use rtype_types::Vec2;

use crate::components::{AttackPattern, Enemy, Transform, Velocity};
use crate::registry::{mask_of, Registry};

const SINE_AMPLITUDE: f32 = 60.0;
const SINE_FREQUENCY: f32 = 1.5;

pub fn update(registry: &mut Registry, elapsed_seconds: f32) {
    let mask = mask_of::<Enemy>() | mask_of::<Velocity>() | mask_of::<Transform>();
    for entity in registry.query(mask) {
        let Ok(enemy) = registry.get_component::<Enemy>(entity) else {
            continue;
        };
        let pattern = enemy.attack_pattern;

        let Ok(velocity) = registry.get_component_mut::<Velocity>(entity) else {
            continue;
        };

        match pattern {
            AttackPattern::LinearLeft => {
                velocity.direction = Vec2::new(-1.0, 0.0);
            }
            AttackPattern::SineDrift => {
                let y = (elapsed_seconds * SINE_FREQUENCY).sin() * SINE_AMPLITUDE;
                velocity.direction = Vec2::new(-1.0, y / velocity.speed.max(1.0)).normalized();
            }
            AttackPattern::Stationary => {
                velocity.direction = Vec2::ZERO;
                velocity.speed = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::EnemyArchetype;

    fn spawn_enemy(reg: &mut Registry, pattern: AttackPattern) -> rtype_types::EntityId {
        let e = reg.new_entity();
        reg.set_component(e, Transform::at(0.0, 0.0)).unwrap();
        reg.set_component(e, Velocity::new(Vec2::new(1.0, 0.0), 100.0)).unwrap();
        reg.set_component(
            e,
            Enemy {
                archetype: EnemyArchetype::Basic,
                attack_pattern: pattern,
                score_value: 10,
            },
        )
        .unwrap();
        e
    }

    #[test]
    fn linear_left_always_drifts_left() {
        let mut reg = Registry::with_seed(1);
        let e = spawn_enemy(&mut reg, AttackPattern::LinearLeft);
        update(&mut reg, 3.0);
        let v = reg.get_component::<Velocity>(e).unwrap();
        assert_eq!(v.direction, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn stationary_has_zero_speed() {
        let mut reg = Registry::with_seed(2);
        let e = spawn_enemy(&mut reg, AttackPattern::Stationary);
        update(&mut reg, 1.0);
        let v = reg.get_component::<Velocity>(e).unwrap();
        assert_eq!(v.speed, 0.0);
    }
}
