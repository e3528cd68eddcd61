//! Marks entities that drift off the play field for destruction rather than
//! removing them immediately, so the server still gets a chance to notify
//! clients before the entity disappears from the next snapshot.
//!
//! Grounded on the original engine's `BoundarySystem`; the 100-unit margin
//! beyond the screen bounds is carried over unchanged.

use crate::components::{DestroyReason, PendingDestroy, Transform};
use crate::registry::{mask_of, Registry};

const MARGIN: f32 = 100.0;

pub fn update(registry: &mut Registry, screen_width: f32, screen_height: f32) {
    let mask = mask_of::<Transform>();
    for entity in registry.query(mask) {
        if registry.has_component::<PendingDestroy>(entity) {
            continue;
        }
        let Ok(transform) = registry.get_component::<Transform>(entity) else {
            continue;
        };
        let pos = transform.position;
        let out_of_bounds = pos.x < -MARGIN
            || pos.x > screen_width + MARGIN
            || pos.y < -MARGIN
            || pos.y > screen_height + MARGIN;

        if out_of_bounds {
            let _ = registry.set_component(entity, PendingDestroy::new(DestroyReason::OutOfBounds));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_beyond_margin_is_queued_for_destruction() {
        let mut reg = Registry::with_seed(1);
        let e = reg.new_entity();
        reg.set_component(e, Transform::at(-150.0, 0.0)).unwrap();
        update(&mut reg, 1920.0, 1080.0);
        assert!(reg.has_component::<PendingDestroy>(e));
    }

    #[test]
    fn entity_within_bounds_is_left_alone() {
        let mut reg = Registry::with_seed(2);
        let e = reg.new_entity();
        reg.set_component(e, Transform::at(500.0, 500.0)).unwrap();
        update(&mut reg, 1920.0, 1080.0);
        assert!(!reg.has_component::<PendingDestroy>(e));
    }

    #[test]
    fn already_pending_entity_is_not_overridden() {
        let mut reg = Registry::with_seed(3);
        let e = reg.new_entity();
        reg.set_component(e, Transform::at(-150.0, 0.0)).unwrap();
        reg.set_component(e, PendingDestroy::new(DestroyReason::Killed)).unwrap();
        update(&mut reg, 1920.0, 1080.0);
        assert_eq!(
            reg.get_component::<PendingDestroy>(e).unwrap().reason,
            DestroyReason::Killed
        );
    }
}
