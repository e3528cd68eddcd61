//! Ticks invincibility windows down and queues entities whose health has
//! reached zero for end-of-tick destruction.
//!
//! Grounded on the original engine's `HealthSystem`: damage application itself
//! happens in collision resolution, this system only advances the timer and
//! reacts to the resulting health value.

use crate::components::{DestroyReason, Health, PendingDestroy};
use crate::registry::{mask_of, Registry};

pub fn update(registry: &mut Registry, dt: f32) {
    let mask = mask_of::<Health>();
    for entity in registry.query(mask) {
        let Ok(health) = registry.get_component_mut::<Health>(entity) else {
            continue;
        };
        if health.invincibility_timer > 0.0 {
            health.invincibility_timer = (health.invincibility_timer - dt).max(0.0);
            if health.invincibility_timer == 0.0 {
                health.invincible = false;
            }
        }
        let dead = health.is_dead();
        if dead && !registry.has_component::<PendingDestroy>(entity) {
            let _ = registry.set_component(entity, PendingDestroy::new(DestroyReason::Killed));
        }
    }
}
