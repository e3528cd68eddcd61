//! Decrements buff timers, drops expired ones, and applies stat modifications
//! each tick: speed/damage/fire-rate multipliers, shield invincibility, and
//! health regen.
//!
//! Grounded on the original engine's `BuffSystem` header (no corresponding
//! `.cpp` was available in the retrieved source; the implementation below
//! follows the documented per-buff responsibilities).

use crate::components::{Buff, BuffKind, Health, Velocity, Weapon};
use crate::registry::{mask_of, Registry};

fn tick_timers(buff: &mut Buff, dt: f32) {
    for instance in buff.instances.iter_mut() {
        if !instance.is_permanent() {
            instance.remaining_duration -= dt;
        }
    }
    buff.instances.retain(|b| b.is_permanent() || b.remaining_duration > 0.0);
}

pub fn update(registry: &mut Registry, dt: f32) {
    let mask = mask_of::<Buff>();
    for entity in registry.query(mask) {
        let Ok(buff) = registry.get_component_mut::<Buff>(entity) else {
            continue;
        };
        tick_timers(buff, dt);
        let buff = buff.clone();

        if let Ok(velocity) = registry.get_component_mut::<Velocity>(entity) {
            velocity.speed = velocity.base_speed
                * if buff.has(BuffKind::SpeedBoost) { buff.value_of(BuffKind::SpeedBoost) } else { 1.0 };
        }

        if let Ok(weapon) = registry.get_component_mut::<Weapon>(entity) {
            weapon.damage = weapon.base_damage
                * if buff.has(BuffKind::DamageBoost) { buff.value_of(BuffKind::DamageBoost) } else { 1.0 };
            weapon.fire_rate = weapon.base_fire_rate
                * if buff.has(BuffKind::FireRateBoost) { buff.value_of(BuffKind::FireRateBoost) } else { 1.0 };
        }

        if let Ok(health) = registry.get_component_mut::<Health>(entity) {
            health.invincible = buff.has(BuffKind::Shield);
            if buff.has(BuffKind::HealthRegen) {
                let regen_rate = buff.value_of(BuffKind::HealthRegen);
                health.heal((regen_rate * dt) as i32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_buff_is_removed_and_stops_applying() {
        let mut reg = Registry::with_seed(1);
        let e = reg.new_entity();
        reg.set_component(e, Velocity::new(rtype_types::Vec2::new(1.0, 0.0), 100.0))
            .unwrap();
        let mut buff = Buff::default();
        buff.add(BuffKind::SpeedBoost, 1.0, 2.0);
        reg.set_component(e, buff).unwrap();

        update(&mut reg, 0.5);
        assert_eq!(reg.get_component::<Velocity>(e).unwrap().speed, 200.0);

        update(&mut reg, 1.0);
        assert!(!reg.get_component::<Buff>(e).unwrap().has(BuffKind::SpeedBoost));
    }

    #[test]
    fn shield_grants_invincibility_while_active() {
        let mut reg = Registry::with_seed(2);
        let e = reg.new_entity();
        reg.set_component(e, Health::new(10)).unwrap();
        let mut buff = Buff::default();
        buff.add(BuffKind::Shield, 2.0, 1.0);
        reg.set_component(e, buff).unwrap();

        update(&mut reg, 0.1);
        assert!(reg.get_component::<Health>(e).unwrap().invincible);
    }
}
