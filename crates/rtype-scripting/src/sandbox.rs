//! Loads a script file's source into its own Lua environment table so two
//! scripts defining `onUpdate` don't clobber each other's globals, then hands
//! back the compiled `onUpdate` function. Grounded on the original engine's
//! `LuaEngine`/`sandbox::load_mod` pattern of running each script body once
//! and keeping only what it needs afterward.

use mlua::{Function, Lua, Table};

/// Runs `source` in a table that falls back to the shared globals for reads
/// (so scripts can still call `log`, `spawnEnemy`, ...) but keeps its own
/// writes private. Returns the `onUpdate(entity, dt)` function it defined.
pub(crate) fn load_script(lua: &Lua, script_path: &str, source: &str) -> anyhow::Result<Function> {
    let env: Table = lua.create_table()?;
    let meta = lua.create_table()?;
    meta.set("__index", lua.globals())?;
    env.set_metatable(Some(meta));

    lua.load(source)
        .set_name(script_path)
        .set_environment(env.clone())
        .exec()
        .map_err(|e| anyhow::anyhow!("executing {script_path}: {e}"))?;

    env.get::<_, Function>("onUpdate")
        .map_err(|_| anyhow::anyhow!("{script_path} does not define onUpdate(entity, dt)"))
}
