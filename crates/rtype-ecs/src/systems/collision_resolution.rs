//! Applies the gameplay consequences of this tick's collisions: projectile damage,
//! collectible pickup, and orbital-module contact/blocking.
//!
//! The original engine detects overlaps in `CollisionSystem` but never wires up a
//! response (see spec.md §9 Open Questions); this system is the reimplementation's
//! answer, run immediately after collision detection.

use rtype_types::EntityId;

use crate::components::{Buff, Collectible, DestroyReason, Health, OrbitalModule, PendingDestroy, Player, Projectile};
use crate::registry::Registry;
use crate::systems::collision::CollisionEvent;

fn grant_buff(registry: &mut Registry, player: EntityId, kind: crate::components::BuffKind, duration: f32, value: f32) {
    if let Ok(buffs) = registry.get_component_mut::<Buff>(player) {
        buffs.add(kind, duration, value);
    } else {
        let mut buffs = Buff::default();
        buffs.add(kind, duration, value);
        let _ = registry.set_component(player, buffs);
    }
}

fn apply_collectible(registry: &mut Registry, player: EntityId, collectible: Collectible) {
    match collectible {
        Collectible::PowerUp { buff, duration, value } => {
            grant_buff(registry, player, buff, duration, value);
        }
        Collectible::Upgrade { buff, value } => {
            grant_buff(registry, player, buff, 0.0, value);
        }
        Collectible::HealthPack { restore } => {
            if let Ok(health) = registry.get_component_mut::<Health>(player) {
                health.heal(restore);
            }
        }
        Collectible::Score { value } => {
            if let Ok(p) = registry.get_component_mut::<Player>(player) {
                p.score += value;
            }
        }
    }
}

fn mark_destroyed(registry: &mut Registry, entity: EntityId, reason: DestroyReason) {
    if !registry.has_component::<PendingDestroy>(entity) {
        let _ = registry.set_component(entity, PendingDestroy::new(reason));
    }
}

pub fn update(registry: &mut Registry, events: &[CollisionEvent]) {
    for event in events {
        for (source, target) in [(event.a, event.b), (event.b, event.a)] {
            if let Some(projectile) = registry.get_component::<Projectile>(source).ok().copied() {
                if projectile.owner == target {
                    continue;
                }
                if registry.has_component::<Health>(target) {
                    if let Ok(health) = registry.get_component_mut::<Health>(target) {
                        health.take_damage(projectile.damage);
                    }
                    mark_destroyed(registry, source, DestroyReason::Manual);
                    continue;
                }
                if let Some(orbital) = registry.get_component::<OrbitalModule>(target).ok().copied() {
                    if orbital.blocks_projectiles {
                        mark_destroyed(registry, source, DestroyReason::Manual);
                    }
                    continue;
                }
            }

            if let Some(collectible) = registry.get_component::<Collectible>(source).ok().copied() {
                if registry.has_component::<Player>(target) {
                    apply_collectible(registry, target, collectible);
                    mark_destroyed(registry, source, DestroyReason::Manual);
                }
                continue;
            }

            if let Some(orbital) = registry.get_component::<OrbitalModule>(source).ok().copied() {
                if orbital.parent == target {
                    continue;
                }
                if let Ok(health) = registry.get_component_mut::<Health>(target) {
                    health.take_damage(orbital.damage);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::BuffKind;

    #[test]
    fn projectile_damages_target_and_is_consumed() {
        let mut reg = Registry::with_seed(1);
        let owner = reg.new_entity();
        let shooter_projectile = reg.new_entity();
        reg.set_component(
            shooter_projectile,
            Projectile {
                damage: 10,
                lifetime_seconds: 1.0,
                owner,
                friendly: true,
            },
        )
        .unwrap();
        let target = reg.new_entity();
        reg.set_component(target, Health::new(30)).unwrap();

        update(&mut reg, &[CollisionEvent { a: shooter_projectile, b: target }]);

        assert_eq!(reg.get_component::<Health>(target).unwrap().current, 20);
        assert!(reg.has_component::<PendingDestroy>(shooter_projectile));
    }

    #[test]
    fn projectile_ignores_its_own_owner() {
        let mut reg = Registry::with_seed(2);
        let owner = reg.new_entity();
        reg.set_component(owner, Health::new(30)).unwrap();
        let projectile = reg.new_entity();
        reg.set_component(
            projectile,
            Projectile {
                damage: 10,
                lifetime_seconds: 1.0,
                owner,
                friendly: true,
            },
        )
        .unwrap();

        update(&mut reg, &[CollisionEvent { a: projectile, b: owner }]);

        assert_eq!(reg.get_component::<Health>(owner).unwrap().current, 30);
        assert!(!reg.has_component::<PendingDestroy>(projectile));
    }

    #[test]
    fn collectible_grants_buff_to_player() {
        let mut reg = Registry::with_seed(3);
        let player = reg.new_entity();
        reg.set_component(
            player,
            Player {
                score: 0,
                lives: 3,
                player_id: rtype_types::PlayerId(1),
            },
        )
        .unwrap();
        let pickup = reg.new_entity();
        reg.set_component(
            pickup,
            Collectible::PowerUp {
                buff: BuffKind::SpeedBoost,
                duration: 5.0,
                value: 1.5,
            },
        )
        .unwrap();

        update(&mut reg, &[CollisionEvent { a: pickup, b: player }]);

        let buffs = reg.get_component::<Buff>(player).unwrap();
        assert!(buffs.has(BuffKind::SpeedBoost));
        assert!(reg.has_component::<PendingDestroy>(pickup));
    }
}
