//! Owns the Lua VM behind the ECS's `ScriptHost` trait: one interpreter per
//! room, every `LuaScript`-bearing entity's script loaded into it once and
//! cached by path, dispatched each tick through the registry-scoped context
//! from `bridge`.

use std::collections::HashMap;
use std::sync::Arc;

use mlua::{Lua, RegistryKey, StdLib};
use rtype_ecs::registry::Registry;
use rtype_ecs::systems::ScriptHost;
use rtype_types::EntityId;

use crate::bridge::{self, EntityHandle, ScriptContext};

/// The spec calls for "no I/O, no process control, no untrusted
/// deserialization" — `StdLib::ALL_SAFE` excludes `io`, `os`, `package`,
/// `ffi` and `debug`, leaving only string/table/math/etc.
pub struct LuaScriptHost {
    lua: Lua,
    context: Arc<ScriptContext>,
    loaded: HashMap<String, RegistryKey>,
}

impl LuaScriptHost {
    pub fn new() -> anyhow::Result<Self> {
        let lua = Lua::new_with(StdLib::ALL_SAFE, mlua::LuaOptions::default())
            .map_err(|e| anyhow::anyhow!("creating sandboxed Lua VM: {e}"))?;
        let context = Arc::new(ScriptContext::new());
        lua.set_app_data(context.clone());
        bridge::install_globals(&lua)?;
        Ok(Self {
            lua,
            context,
            loaded: HashMap::new(),
        })
    }

    fn ensure_loaded(&mut self, script_path: &str) -> anyhow::Result<()> {
        if self.loaded.contains_key(script_path) {
            return Ok(());
        }
        let source = std::fs::read_to_string(script_path)
            .map_err(|e| anyhow::anyhow!("reading script {script_path}: {e}"))?;
        let on_update = crate::sandbox::load_script(&self.lua, script_path, &source)?;
        let key = self.lua.create_registry_value(on_update)?;
        self.loaded.insert(script_path.to_string(), key);
        Ok(())
    }
}

impl ScriptHost for LuaScriptHost {
    fn on_update(
        &mut self,
        registry: &mut Registry,
        entity: EntityId,
        script_path: &str,
        dt: f32,
    ) -> Result<(), String> {
        self.ensure_loaded(script_path).map_err(|e| e.to_string())?;
        let key = self
            .loaded
            .get(script_path)
            .expect("ensure_loaded just populated this entry");
        let on_update: mlua::Function = self
            .lua
            .registry_value(key)
            .map_err(|e| format!("retrieving cached onUpdate for {script_path}: {e}"))?;
        let handle = EntityHandle(entity);
        let context = self.context.clone();
        context.with_registry(registry, || {
            on_update
                .call::<_, ()>((handle, dt))
                .map_err(|e| format!("{script_path} onUpdate: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtype_ecs::components::{LuaScript, Transform};
    use std::io::Write;

    fn write_script(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn onupdate_can_read_and_write_transform() {
        let file = write_script(
            r#"
            function onUpdate(entity, dt)
                local t = entity:getTransform()
                entity:setTransform(t.x + 1.0, t.y)
            end
            "#,
        );
        let mut reg = Registry::with_seed(1);
        let e = reg.new_entity();
        reg.set_component(e, Transform::at(10.0, 20.0)).unwrap();
        let path = file.path().to_str().unwrap();
        reg.set_component(
            e,
            LuaScript {
                script_path: path.to_string(),
            },
        )
        .unwrap();

        let mut host = LuaScriptHost::new().unwrap();
        host.on_update(&mut reg, e, path, 1.0 / 60.0).unwrap();

        let t = reg.get_component::<Transform>(e).unwrap();
        assert_eq!(t.position.x, 11.0);
    }

    #[test]
    fn missing_onupdate_is_reported_as_an_error() {
        let file = write_script("local x = 1");
        let mut reg = Registry::with_seed(2);
        let e = reg.new_entity();
        let path = file.path().to_str().unwrap();

        let mut host = LuaScriptHost::new().unwrap();
        assert!(host.on_update(&mut reg, e, path, 1.0 / 60.0).is_err());
    }
}
