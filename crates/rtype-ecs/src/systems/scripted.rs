//! Runs the scripted-behavior step of the pipeline: for every entity carrying
//! a `LuaScript`, dispatches to a host-provided `ScriptHost` implementation.
//!
//! `rtype-ecs` cannot depend on `rtype-scripting` (the scripting crate binds
//! `Registry`/components the other way around), so the bridge is a trait
//! object supplied by the caller — grounded on the original engine's
//! `LuaSystem`, which looks up each entity's script path and invokes its
//! `onUpdate` entry point, catching and logging per-entity errors rather than
//! aborting the tick.

use rtype_types::EntityId;
use tracing::warn;

use crate::components::LuaScript;
use crate::registry::{mask_of, Registry};

/// Implemented by the scripting crate's runtime; kept minimal so `rtype-ecs`
/// never needs to know about `mlua` types.
pub trait ScriptHost {
    /// Invokes `onUpdate(entity, dt)` for the script at `script_path` bound to `entity`.
    /// Errors are per-entity: a failing script must not abort the tick for the rest.
    fn on_update(&mut self, registry: &mut Registry, entity: EntityId, script_path: &str, dt: f32) -> Result<(), String>;
}

pub fn update(registry: &mut Registry, host: &mut dyn ScriptHost, dt: f32) {
    let mask = mask_of::<LuaScript>();
    for entity in registry.query(mask) {
        let Some(script) = registry.get_component::<LuaScript>(entity).ok().cloned() else {
            continue;
        };
        if let Err(err) = host.on_update(registry, entity, &script.script_path, dt) {
            warn!(entity = entity.get(), script = %script.script_path, error = %err, "scripted behavior failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHost {
        calls: usize,
    }

    impl ScriptHost for CountingHost {
        fn on_update(&mut self, _registry: &mut Registry, _entity: EntityId, _script_path: &str, _dt: f32) -> Result<(), String> {
            self.calls += 1;
            Ok(())
        }
    }

    struct FailingHost;

    impl ScriptHost for FailingHost {
        fn on_update(&mut self, _registry: &mut Registry, _entity: EntityId, _script_path: &str, _dt: f32) -> Result<(), String> {
            Err("boom".to_string())
        }
    }

    #[test]
    fn every_scripted_entity_is_dispatched() {
        let mut reg = Registry::with_seed(1);
        for _ in 0..3 {
            let e = reg.new_entity();
            reg.set_component(e, LuaScript { script_path: "enemies/basic.lua".into() })
                .unwrap();
        }
        let mut host = CountingHost { calls: 0 };
        update(&mut reg, &mut host, 1.0 / 60.0);
        assert_eq!(host.calls, 3);
    }

    #[test]
    fn failing_script_does_not_panic() {
        let mut reg = Registry::with_seed(2);
        let e = reg.new_entity();
        reg.set_component(e, LuaScript { script_path: "broken.lua".into() }).unwrap();
        let mut host = FailingHost;
        update(&mut reg, &mut host, 1.0 / 60.0);
    }
}
