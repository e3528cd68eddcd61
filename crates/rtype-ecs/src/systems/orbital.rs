//! Advances each orbital module's angle and derives its `Transform` from its
//! parent's position plus the resulting point on the orbit circle.
//!
//! Grounded on the original engine's `OrbitalSystem`, including destroying a
//! module whose parent has disappeared.

use std::f32::consts::TAU;

use crate::components::{DestroyReason, PendingDestroy, Transform};
use crate::registry::{mask_of, Registry};

pub fn update(registry: &mut Registry, dt: f32) {
    let mask = mask_of::<crate::components::OrbitalModule>() | mask_of::<Transform>();
    for entity in registry.query(mask) {
        let Some(orbital) = registry.get_component::<crate::components::OrbitalModule>(entity).ok().copied() else {
            continue;
        };

        if !registry.has_component::<Transform>(orbital.parent) {
            if !registry.has_component::<PendingDestroy>(entity) {
                let _ = registry.set_component(entity, PendingDestroy::new(DestroyReason::Manual));
            }
            continue;
        }

        let parent_pos = registry.get_component::<Transform>(orbital.parent).unwrap().position;

        let mut new_angle = orbital.current_angle_rad + orbital.angular_velocity_rad_s * dt;
        new_angle = new_angle.rem_euclid(TAU);

        let new_x = parent_pos.x + orbital.orbit_radius * new_angle.cos();
        let new_y = parent_pos.y + orbital.orbit_radius * new_angle.sin();

        if let Ok(updated) = registry.get_component_mut::<crate::components::OrbitalModule>(entity) {
            updated.current_angle_rad = new_angle;
        }
        if let Ok(transform) = registry.get_component_mut::<Transform>(entity) {
            transform.position = rtype_types::Vec2::new(new_x, new_y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::OrbitalModule;

    #[test]
    fn orbital_tracks_circle_around_parent() {
        let mut reg = Registry::with_seed(1);
        let parent = reg.new_entity();
        reg.set_component(parent, Transform::at(100.0, 100.0)).unwrap();

        let module = reg.new_entity();
        reg.set_component(module, Transform::at(0.0, 0.0)).unwrap();
        reg.set_component(
            module,
            OrbitalModule {
                parent,
                orbit_radius: 50.0,
                angular_velocity_rad_s: std::f32::consts::PI,
                current_angle_rad: 0.0,
                damage: 5,
                blocks_projectiles: true,
            },
        )
        .unwrap();

        update(&mut reg, 1.0);
        let transform = reg.get_component::<Transform>(module).unwrap();
        assert!((transform.position.x - 50.0).abs() < 1e-3);
        assert!((transform.position.y - 100.0).abs() < 1e-2);
    }

    #[test]
    fn module_is_destroyed_when_parent_gone() {
        let mut reg = Registry::with_seed(2);
        let parent = reg.new_entity();
        reg.set_component(parent, Transform::at(0.0, 0.0)).unwrap();
        let module = reg.new_entity();
        reg.set_component(module, Transform::at(0.0, 0.0)).unwrap();
        reg.set_component(
            module,
            OrbitalModule {
                parent,
                orbit_radius: 10.0,
                angular_velocity_rad_s: 1.0,
                current_angle_rad: 0.0,
                damage: 1,
                blocks_projectiles: false,
            },
        )
        .unwrap();
        reg.destroy_entity(parent);

        update(&mut reg, 1.0 / 60.0);
        assert!(reg.has_component::<PendingDestroy>(module));
    }
}
