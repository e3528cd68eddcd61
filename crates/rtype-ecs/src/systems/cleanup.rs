//! Final pipeline step: actually destroys every entity the earlier systems
//! marked with `PendingDestroy`, returning the reasons so the caller can emit
//! `EntityDestroyed` notifications before the entity drops out of the next
//! snapshot.

use rtype_types::EntityId;

use crate::components::{DestroyReason, PendingDestroy};
use crate::registry::{mask_of, Registry};

pub struct Destroyed {
    pub entity: EntityId,
    pub reason: DestroyReason,
}

pub fn update(registry: &mut Registry) -> Vec<Destroyed> {
    let mask = mask_of::<PendingDestroy>();
    let mut destroyed = Vec::new();
    for entity in registry.query(mask) {
        let reason = registry
            .get_component::<PendingDestroy>(entity)
            .map(|p| p.reason)
            .unwrap_or(DestroyReason::Manual);
        registry.destroy_entity(entity);
        destroyed.push(Destroyed { entity, reason });
    }
    destroyed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_entities_are_destroyed_and_reported() {
        let mut reg = Registry::with_seed(1);
        let e = reg.new_entity();
        reg.set_component(e, PendingDestroy::new(DestroyReason::Expired)).unwrap();

        let destroyed = update(&mut reg);
        assert_eq!(destroyed.len(), 1);
        assert_eq!(destroyed[0].entity, e);
        assert_eq!(destroyed[0].reason, DestroyReason::Expired);
        assert!(!reg.is_alive(e));
    }

    #[test]
    fn entities_without_the_marker_survive() {
        let mut reg = Registry::with_seed(2);
        let e = reg.new_entity();
        assert!(update(&mut reg).is_empty());
        assert!(reg.is_alive(e));
    }
}
