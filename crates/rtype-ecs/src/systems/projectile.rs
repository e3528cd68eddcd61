//! Counts down each projectile's remaining lifetime and queues expired ones
//! for destruction. Grounded on the original engine's `ProjectileSystem`.

use crate::components::{DestroyReason, PendingDestroy, Projectile};
use crate::registry::{mask_of, Registry};

pub fn update(registry: &mut Registry, dt: f32) {
    let mask = mask_of::<Projectile>();
    for entity in registry.query(mask) {
        let Ok(projectile) = registry.get_component_mut::<Projectile>(entity) else {
            continue;
        };
        projectile.lifetime_seconds -= dt;
        if projectile.lifetime_seconds <= 0.0 && !registry.has_component::<PendingDestroy>(entity) {
            let _ = registry.set_component(entity, PendingDestroy::new(DestroyReason::Expired));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtype_types::EntityId;

    #[test]
    fn expired_projectile_is_queued_for_destruction() {
        let mut reg = Registry::with_seed(1);
        let owner = EntityId::new(1).unwrap();
        let e = reg.new_entity();
        reg.set_component(
            e,
            Projectile { damage: 5, lifetime_seconds: 0.1, owner, friendly: true },
        )
        .unwrap();

        update(&mut reg, 0.05);
        assert!(!reg.has_component::<PendingDestroy>(e));

        update(&mut reg, 0.1);
        assert!(reg.has_component::<PendingDestroy>(e));
        assert_eq!(
            reg.get_component::<PendingDestroy>(e).unwrap().reason,
            DestroyReason::Expired
        );
    }
}
