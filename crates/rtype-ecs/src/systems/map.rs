//! Advances the active map's elapsed time, scrolls every non-player entity
//! leftward at the map's scroll speed, and marks the map completed once its
//! duration has elapsed (0 means infinite).
//!
//! Grounded on the original engine's `MapSystem`.

use crate::components::{MapData, Player, Transform};
use crate::registry::{mask_of, Registry};

fn apply_scrolling(registry: &mut Registry, scroll_speed: f32, dt: f32) {
    let offset = -scroll_speed * dt;
    let mask = mask_of::<Transform>();
    for entity in registry.query(mask) {
        if registry.has_component::<Player>(entity) {
            continue;
        }
        if let Ok(transform) = registry.get_component_mut::<Transform>(entity) {
            transform.position.x += offset;
        }
    }
}

pub fn update(registry: &mut Registry, dt: f32) {
    let mask = mask_of::<MapData>();
    for entity in registry.query(mask) {
        let Some(mut map) = registry.get_component::<MapData>(entity).ok().cloned() else {
            continue;
        };
        if map.completed {
            continue;
        }

        map.elapsed_seconds += dt;

        if map.scroll_speed_px_s > 0.0 {
            apply_scrolling(registry, map.scroll_speed_px_s, dt);
        }

        if map.duration_seconds > 0.0 && map.elapsed_seconds >= map.duration_seconds {
            map.completed = true;
        }

        let _ = registry.set_component(entity, map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtype_types::PlayerId;

    #[test]
    fn non_player_entities_scroll_left() {
        let mut reg = Registry::with_seed(1);
        let map = reg.new_entity();
        reg.set_component(map, MapData::new("level-1", 100.0, 0.0)).unwrap();

        let obstacle = reg.new_entity();
        reg.set_component(obstacle, Transform::at(500.0, 0.0)).unwrap();

        update(&mut reg, 1.0);
        assert!((reg.get_component::<Transform>(obstacle).unwrap().position.x - 400.0).abs() < 1e-3);
    }

    #[test]
    fn player_entities_are_not_scrolled() {
        let mut reg = Registry::with_seed(2);
        let map = reg.new_entity();
        reg.set_component(map, MapData::new("level-1", 100.0, 0.0)).unwrap();

        let player = reg.new_entity();
        reg.set_component(player, Transform::at(500.0, 0.0)).unwrap();
        reg.set_component(player, Player { score: 0, lives: 3, player_id: PlayerId(1) })
            .unwrap();

        update(&mut reg, 1.0);
        assert_eq!(reg.get_component::<Transform>(player).unwrap().position.x, 500.0);
    }

    #[test]
    fn map_completes_after_duration() {
        let mut reg = Registry::with_seed(3);
        let map = reg.new_entity();
        reg.set_component(map, MapData::new("level-1", 0.0, 5.0)).unwrap();

        update(&mut reg, 3.0);
        assert!(!reg.get_component::<MapData>(map).unwrap().completed);
        update(&mut reg, 3.0);
        assert!(reg.get_component::<MapData>(map).unwrap().completed);
    }
}
