//! Weapon cooldown, charge accumulation, and shot release.
//!
//! Grounded on the original engine's `WeaponSystem`: `shouldShoot` held down
//! accumulates charge at `charge_rate` per second up to 1.0; releasing it below
//! the 0.5 threshold fires a normal shot, at or above it fires a charged shot
//! with damage/speed multipliers; `MultiShot`/`TripleShot`/`DoubleShot` buffs
//! (highest one wins) fan the shot out into an angled spread instead of firing
//! straight ahead.

use rtype_types::{EntityId, Vec2};

use crate::components::{Buff, BuffKind, Projectile, Transform, Velocity, Weapon};
use crate::registry::{mask_of, Registry};

const CHARGE_THRESHOLD: f32 = 0.5;
const BASE_PROJECTILE_SPEED: f32 = 500.0;
const PROJECTILE_LIFETIME_SECONDS: f32 = 10.0;
const MUZZLE_OFFSET_X: f32 = 40.0;
const FALLBACK_FIRE_RATE: f32 = 7.0;

fn shot_count(buffs: Option<&Buff>) -> u32 {
    let Some(buffs) = buffs else { return 1 };
    if buffs.has(BuffKind::MultiShot) {
        5
    } else if buffs.has(BuffKind::TripleShot) {
        3
    } else if buffs.has(BuffKind::DoubleShot) {
        2
    } else {
        1
    }
}

fn spread_angles_degrees(shot_count: u32) -> Vec<f32> {
    match shot_count {
        1 => vec![0.0],
        2 => vec![-7.5, 7.5],
        3 => vec![-15.0, 0.0, 15.0],
        5 => vec![-30.0, -15.0, 0.0, 15.0, 30.0],
        n => {
            let spread = 10.0;
            let start = -(spread * (n as f32 - 1.0)) / 2.0;
            (0..n).map(|i| start + i as f32 * spread).collect()
        }
    }
}

pub fn spawn_projectile(
    registry: &mut Registry,
    owner: EntityId,
    muzzle: Vec2,
    angle_degrees: f32,
    speed: f32,
    damage: f32,
    friendly: bool,
) -> EntityId {
    let direction = Vec2::new(1.0, 0.0).rotated_degrees(angle_degrees);
    let entity = registry.new_entity();
    let _ = registry.set_component(entity, Transform::at(muzzle.x, muzzle.y));
    let _ = registry.set_component(entity, Velocity::new(direction, speed));
    let _ = registry.set_component(
        entity,
        Projectile {
            damage: damage.round() as i32,
            lifetime_seconds: PROJECTILE_LIFETIME_SECONDS,
            owner,
            friendly,
        },
    );
    entity
}

fn fire(registry: &mut Registry, owner: EntityId, damage: f32, speed: f32, friendly: bool) {
    let muzzle = registry
        .get_component::<Transform>(owner)
        .map(|t| Vec2::new(t.position.x + MUZZLE_OFFSET_X, t.position.y))
        .unwrap_or(Vec2::ZERO);

    let buffs = registry.get_component::<Buff>(owner).ok().cloned();
    let count = shot_count(buffs.as_ref());

    for angle in spread_angles_degrees(count) {
        spawn_projectile(registry, owner, muzzle, angle, speed, damage, friendly);
    }
}

pub fn update(registry: &mut Registry, dt: f32) {
    let mask = mask_of::<Weapon>() | mask_of::<Transform>();
    for entity in registry.query(mask) {
        let Some(weapon) = registry.get_component::<Weapon>(entity).ok().copied() else {
            continue;
        };
        let friendly = registry.has_component::<crate::components::Player>(entity);
        let mut weapon = weapon;
        weapon.cooldown = (weapon.cooldown - dt).max(0.0);

        if weapon.should_shoot && weapon.cooldown <= 0.0 {
            if !weapon.charging {
                weapon.charging = true;
                weapon.charge_level = 0.0;
            }
            weapon.charge_level = (weapon.charge_level + weapon.charge_rate * dt).min(1.0);
        } else if !weapon.should_shoot && weapon.charging {
            let charge_level = weapon.charge_level;
            if charge_level < CHARGE_THRESHOLD {
                fire(registry, entity, weapon.damage, BASE_PROJECTILE_SPEED, friendly);
            } else {
                let damage_mult = 1.0 + charge_level * 1.5;
                let speed_mult = 1.0 + charge_level * 0.5;
                fire(
                    registry,
                    entity,
                    weapon.damage * damage_mult,
                    BASE_PROJECTILE_SPEED * speed_mult,
                    friendly,
                );
            }
            weapon.charging = false;
            weapon.charge_level = 0.0;
            weapon.cooldown = if weapon.fire_rate > 0.0 {
                1.0 / weapon.fire_rate
            } else {
                1.0 / FALLBACK_FIRE_RATE
            };
        } else if !weapon.should_shoot && !weapon.charging {
            weapon.charge_level = 0.0;
        }

        let _ = registry.set_component(entity, weapon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::mask_of as mk;

    fn armed(reg: &mut Registry) -> EntityId {
        let e = reg.new_entity();
        reg.set_component(e, Transform::at(100.0, 200.0)).unwrap();
        reg.set_component(e, Weapon::new(2.0, 10.0)).unwrap();
        reg.set_component(
            e,
            crate::components::Player { score: 0, lives: 3, player_id: rtype_types::PlayerId(1) },
        )
        .unwrap();
        e
    }

    #[test]
    fn quick_release_below_threshold_fires_normal_shot() {
        let mut reg = Registry::with_seed(1);
        let e = armed(&mut reg);
        reg.get_component_mut::<Weapon>(e).unwrap().should_shoot = true;
        update(&mut reg, 0.05);
        reg.get_component_mut::<Weapon>(e).unwrap().should_shoot = false;
        update(&mut reg, 0.0);

        let projectiles = reg.query(mk::<Projectile>());
        assert_eq!(projectiles.len(), 1);
        let p = reg.get_component::<Projectile>(projectiles[0]).unwrap();
        assert_eq!(p.damage, 10);
    }

    #[test]
    fn full_charge_applies_damage_and_speed_multipliers() {
        let mut reg = Registry::with_seed(2);
        let e = armed(&mut reg);
        reg.get_component_mut::<Weapon>(e).unwrap().should_shoot = true;
        for _ in 0..200 {
            update(&mut reg, 1.0 / 60.0);
        }
        reg.get_component_mut::<Weapon>(e).unwrap().should_shoot = false;
        update(&mut reg, 0.0);

        let projectiles = reg.query(mk::<Projectile>());
        assert_eq!(projectiles.len(), 1);
        let p = reg.get_component::<Projectile>(projectiles[0]).unwrap();
        assert_eq!(p.damage, 25);
        let v = reg.get_component::<Velocity>(projectiles[0]).unwrap();
        assert!((v.speed - 750.0).abs() < 1e-3);
    }

    #[test]
    fn multishot_buff_fires_five_spread_projectiles() {
        let mut reg = Registry::with_seed(3);
        let e = armed(&mut reg);
        let mut buffs = Buff::default();
        buffs.add(BuffKind::MultiShot, 5.0, 1.0);
        reg.set_component(e, buffs).unwrap();

        reg.get_component_mut::<Weapon>(e).unwrap().should_shoot = true;
        update(&mut reg, 0.05);
        reg.get_component_mut::<Weapon>(e).unwrap().should_shoot = false;
        update(&mut reg, 0.0);

        assert_eq!(reg.query(mk::<Projectile>()).len(), 5);
    }
}
