use rtype_types::EntityId;

use crate::components::{can_collide, Collider, Transform};
use crate::registry::{mask_of, Registry};

/// An unordered pair of entities whose colliders overlapped this tick, carried to
/// the resolution system. Reported once per overlapping pair per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent {
    pub a: EntityId,
    pub b: EntityId,
}

fn overlaps(t1: &Transform, c1: &Collider, t2: &Transform, c2: &Collider) -> bool {
    let left1 = t1.position.x + c1.offset.x;
    let right1 = left1 + c1.size.x;
    let top1 = t1.position.y + c1.offset.y;
    let bottom1 = top1 + c1.size.y;

    let left2 = t2.position.x + c2.offset.x;
    let right2 = left2 + c2.size.x;
    let top2 = t2.position.y + c2.offset.y;
    let bottom2 = top2 + c2.size.y;

    !(right1 < left2 || left1 > right2 || bottom1 < top2 || top1 > bottom2)
}

/// Tests every unordered pair of colliding-capable entities and returns the set that
/// overlapped this tick. O(n^2) as the spec allows; a spatial index may replace this
/// as long as reported ordering stays deterministic per seed, which the sorted query
/// order here already guarantees.
pub fn update(registry: &Registry) -> Vec<CollisionEvent> {
    let mask = mask_of::<Transform>() | mask_of::<Collider>();
    let entities = registry.query(mask);
    let mut events = Vec::new();

    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            let a = entities[i];
            let b = entities[j];
            let (Ok(ta), Ok(ca), Ok(tb), Ok(cb)) = (
                registry.get_component::<Transform>(a),
                registry.get_component::<Collider>(a),
                registry.get_component::<Transform>(b),
                registry.get_component::<Collider>(b),
            ) else {
                continue;
            };

            if !can_collide(ca.layer, ca.mask, cb.layer, cb.mask) {
                continue;
            }
            if overlaps(ta, ca, tb, cb) {
                events.push(CollisionEvent { a, b });
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::CollisionLayer;
    use rtype_types::Vec2;

    #[test]
    fn overlapping_compatible_layers_reported() {
        let mut reg = Registry::with_seed(1);
        let player = reg.new_entity();
        reg.set_component(player, Transform::at(0.0, 0.0)).unwrap();
        reg.set_component(
            player,
            Collider::new(
                Vec2::new(10.0, 10.0),
                CollisionLayer::PLAYER,
                CollisionLayer::ENEMY,
            ),
        )
        .unwrap();

        let enemy = reg.new_entity();
        reg.set_component(enemy, Transform::at(5.0, 5.0)).unwrap();
        reg.set_component(
            enemy,
            Collider::new(
                Vec2::new(10.0, 10.0),
                CollisionLayer::ENEMY,
                CollisionLayer::PLAYER,
            ),
        )
        .unwrap();

        let events = update(&reg);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn incompatible_masks_are_not_reported() {
        let mut reg = Registry::with_seed(2);
        let a = reg.new_entity();
        reg.set_component(a, Transform::at(0.0, 0.0)).unwrap();
        reg.set_component(a, Collider::new(Vec2::new(10.0, 10.0), CollisionLayer::WALL, 0))
            .unwrap();

        let b = reg.new_entity();
        reg.set_component(b, Transform::at(0.0, 0.0)).unwrap();
        reg.set_component(
            b,
            Collider::new(Vec2::new(10.0, 10.0), CollisionLayer::ENEMY, CollisionLayer::PLAYER),
        )
        .unwrap();

        assert!(update(&reg).is_empty());
    }

    #[test]
    fn can_collide_is_symmetric() {
        let cases = [
            (CollisionLayer::PLAYER, CollisionLayer::ENEMY, CollisionLayer::ENEMY, CollisionLayer::PLAYER),
            (CollisionLayer::PLAYER, 0, CollisionLayer::ENEMY, CollisionLayer::PLAYER),
        ];
        for (la, ma, lb, mb) in cases {
            assert_eq!(can_collide(la, ma, lb, mb), can_collide(lb, mb, la, ma));
        }
    }
}
