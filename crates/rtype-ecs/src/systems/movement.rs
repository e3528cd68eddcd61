use crate::components::{Transform, Velocity};
use crate::registry::{mask_of, Registry};

/// For each entity with `Transform, Velocity`, integrates `position += direction * speed * dt`.
pub fn update(registry: &mut Registry, dt: f32) {
    let mask = mask_of::<Transform>() | mask_of::<Velocity>();
    for entity in registry.query(mask) {
        let velocity = match registry.get_component::<Velocity>(entity) {
            Ok(v) => *v,
            Err(_) => continue,
        };
        let Ok(transform) = registry.get_component_mut::<Transform>(entity) else {
            continue;
        };
        transform.position = transform.position + velocity.direction * (velocity.speed * dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtype_types::Vec2;

    #[test]
    fn constant_velocity_moves_linearly() {
        let mut reg = Registry::with_seed(1);
        let e = reg.new_entity();
        reg.set_component(e, Transform::at(50.0, 300.0)).unwrap();
        reg.set_component(e, Velocity::new(Vec2::new(1.0, 0.0), 200.0))
            .unwrap();

        for _ in 0..60 {
            update(&mut reg, 1.0 / 60.0);
        }

        let transform = reg.get_component::<Transform>(e).unwrap();
        assert!((transform.position.x - 250.0).abs() < 0.01);
        assert!((transform.position.y - 300.0).abs() < 0.01);
    }

    #[test]
    fn framerate_independence() {
        let mut a = Registry::with_seed(2);
        let e1 = a.new_entity();
        a.set_component(e1, Transform::at(0.0, 0.0)).unwrap();
        a.set_component(e1, Velocity::new(Vec2::new(1.0, 0.0), 90.0))
            .unwrap();
        for _ in 0..60 {
            update(&mut a, 1.0 / 60.0);
        }

        let mut b = Registry::with_seed(2);
        let e2 = b.new_entity();
        b.set_component(e2, Transform::at(0.0, 0.0)).unwrap();
        b.set_component(e2, Velocity::new(Vec2::new(1.0, 0.0), 90.0))
            .unwrap();
        for _ in 0..30 {
            update(&mut b, 1.0 / 30.0);
        }

        let xa = a.get_component::<Transform>(e1).unwrap().position.x;
        let xb = b.get_component::<Transform>(e2).unwrap().position.x;
        assert!((xa - xb).abs() < 1e-3);
    }
}
