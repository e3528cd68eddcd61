//! Lua-facing bindings: the entity handle userdata and the global functions
//! scripts call to read/write components and spawn things. Every binding in
//! this file is grounded on `original_source/server/Scripting/LuaBindings/`.
//!
//! Bindings need a `&mut Registry` that only exists for the duration of one
//! `on_update` call, but Lua closures registered once at startup must be
//! `'static`. The original engine solves this with a raw `world_ptr: *mut ()`
//! stashed in a `LuaGameContext` before each synchronous call and cleared
//! after; this does the same, scoped through mlua's `app_data` mechanism
//! instead of a bare global.

use std::cell::Cell;
use std::sync::Arc;

use mlua::{Lua, UserData, UserDataMethods};

use rtype_ecs::components::{EnemyArchetype, Health, SpawnRequest, Spawner, Transform, Velocity};
use rtype_ecs::registry::Registry;
use rtype_ecs::systems::{spawn_enemy, spawn_projectile};
use rtype_types::{EntityId, Vec2};

/// Holds the registry pointer for the lifetime of one `on_update` call.
/// Safety: `with_registry` is the only way to populate or read the pointer,
/// and it always clears it before returning, so no Lua callback can observe
/// it outside the synchronous call that set it.
pub(crate) struct ScriptContext {
    registry_ptr: Cell<*mut Registry>,
}

unsafe impl Send for ScriptContext {}
unsafe impl Sync for ScriptContext {}

impl ScriptContext {
    pub(crate) fn new() -> Self {
        Self {
            registry_ptr: Cell::new(std::ptr::null_mut()),
        }
    }

    /// Runs `f` with `registry` reachable from Lua bindings, then clears the
    /// pointer unconditionally.
    pub(crate) fn with_registry<R>(&self, registry: &mut Registry, f: impl FnOnce() -> R) -> R {
        self.registry_ptr.set(registry as *mut Registry);
        let result = f();
        self.registry_ptr.set(std::ptr::null_mut());
        result
    }

    fn registry(&self) -> mlua::Result<&mut Registry> {
        let ptr = self.registry_ptr.get();
        if ptr.is_null() {
            return Err(mlua::Error::RuntimeError(
                "no registry bound for this call".into(),
            ));
        }
        Ok(unsafe { &mut *ptr })
    }
}

fn context(lua: &Lua) -> mlua::Result<Arc<ScriptContext>> {
    lua.app_data_ref::<Arc<ScriptContext>>()
        .map(|ctx| ctx.clone())
        .ok_or_else(|| mlua::Error::RuntimeError("script context not installed".into()))
}

fn ecs_err(err: rtype_ecs::EcsError) -> mlua::Error {
    mlua::Error::RuntimeError(err.to_string())
}

/// Userdata handle scripts receive for `onUpdate(entity, dt)` and anything
/// they spawn. Wraps a bare `EntityId`; all state lives in the registry.
#[derive(Clone, Copy)]
pub struct EntityHandle(pub EntityId);

impl UserData for EntityHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("id", |_, this, ()| Ok(this.0.get()));

        methods.add_method("hasTransform", |lua, this, ()| {
            let registry = context(lua)?.registry()?;
            Ok(registry.has_component::<Transform>(this.0))
        });
        methods.add_method("getTransform", |lua, this, ()| {
            let registry = context(lua)?.registry()?;
            let t = registry.get_component::<Transform>(this.0).map_err(ecs_err)?;
            let table = lua.create_table()?;
            table.set("x", t.position.x)?;
            table.set("y", t.position.y)?;
            table.set("rotation", t.rotation_degrees)?;
            Ok(table)
        });
        methods.add_method(
            "setTransform",
            |lua, this, (x, y, rotation): (f32, f32, Option<f32>)| {
                let registry = context(lua)?.registry()?;
                let t = registry
                    .get_component_mut::<Transform>(this.0)
                    .map_err(ecs_err)?;
                t.position.x = x;
                t.position.y = y;
                if let Some(rotation) = rotation {
                    t.rotation_degrees = rotation;
                }
                Ok(())
            },
        );

        methods.add_method("hasVelocity", |lua, this, ()| {
            let registry = context(lua)?.registry()?;
            Ok(registry.has_component::<Velocity>(this.0))
        });
        methods.add_method("getVelocity", |lua, this, ()| {
            let registry = context(lua)?.registry()?;
            let v = registry.get_component::<Velocity>(this.0).map_err(ecs_err)?;
            let table = lua.create_table()?;
            table.set("dirX", v.direction.x)?;
            table.set("dirY", v.direction.y)?;
            table.set("speed", v.speed)?;
            Ok(table)
        });
        methods.add_method(
            "setVelocity",
            |lua, this, (dir_x, dir_y, speed): (f32, f32, Option<f32>)| {
                let registry = context(lua)?.registry()?;
                let v = registry
                    .get_component_mut::<Velocity>(this.0)
                    .map_err(ecs_err)?;
                v.direction = Vec2::new(dir_x, dir_y);
                if let Some(speed) = speed {
                    v.speed = speed;
                }
                Ok(())
            },
        );

        methods.add_method("hasHealth", |lua, this, ()| {
            let registry = context(lua)?.registry()?;
            Ok(registry.has_component::<Health>(this.0))
        });
        methods.add_method("getHealth", |lua, this, ()| {
            let registry = context(lua)?.registry()?;
            let h = registry.get_component::<Health>(this.0).map_err(ecs_err)?;
            let table = lua.create_table()?;
            table.set("current", h.current)?;
            table.set("max", h.max)?;
            table.set("invincible", h.invincible)?;
            Ok(table)
        });
        methods.add_method(
            "setHealth",
            |lua, this, (current, invincible): (i32, Option<bool>)| {
                let registry = context(lua)?.registry()?;
                let h = registry.get_component_mut::<Health>(this.0).map_err(ecs_err)?;
                h.current = current;
                if let Some(invincible) = invincible {
                    h.invincible = invincible;
                }
                Ok(())
            },
        );
    }
}

fn parse_archetype(name: &str) -> mlua::Result<EnemyArchetype> {
    match name.to_ascii_lowercase().as_str() {
        "basic" => Ok(EnemyArchetype::Basic),
        "heavy" => Ok(EnemyArchetype::Heavy),
        "fast" => Ok(EnemyArchetype::Fast),
        "boss" => Ok(EnemyArchetype::Boss),
        other => Err(mlua::Error::RuntimeError(format!(
            "unknown enemy archetype '{other}'"
        ))),
    }
}

/// Installs every global a script body is allowed to call. Called once per
/// `Lua` VM; bindings read the active registry through `ScriptContext`.
pub(crate) fn install_globals(lua: &Lua) -> mlua::Result<()> {
    let log_fn = lua.create_function(|_, message: String| {
        tracing::info!(target: "rtype_scripting::lua", "{message}");
        Ok(())
    })?;
    lua.globals().set("log", log_fn)?;

    let create_entity_fn = lua.create_function(|lua, ()| {
        let registry = context(lua)?.registry()?;
        Ok(EntityHandle(registry.new_entity()))
    })?;
    lua.globals().set("createEntity", create_entity_fn)?;

    let spawn_enemy_fn =
        lua.create_function(|lua, (x, y, archetype): (f32, f32, String)| {
            let archetype = parse_archetype(&archetype)?;
            let registry = context(lua)?.registry()?;
            let request = SpawnRequest {
                position: Vec2::new(x, y),
                archetype,
                script_path: None,
                health: 0,
                score_value: 0,
                spawn_delay_seconds: 0.0,
                has_spawned: false,
            };
            let entity = spawn_enemy(registry, request.position, &request);
            Ok(EntityHandle(entity))
        })?;
    lua.globals().set("spawnEnemy", spawn_enemy_fn)?;

    let spawn_projectile_fn = lua.create_function(
        |lua,
         (owner, x, y, dir_x, dir_y, speed, damage): (
            EntityHandle,
            f32,
            f32,
            f32,
            f32,
            f32,
            Option<f32>,
        )| {
            let registry = context(lua)?.registry()?;
            let angle_degrees = dir_y.atan2(dir_x).to_degrees();
            let entity = spawn_projectile(
                registry,
                owner.0,
                Vec2::new(x, y),
                angle_degrees,
                speed,
                damage.unwrap_or(10.0),
                false,
            );
            Ok(EntityHandle(entity))
        },
    )?;
    lua.globals().set("spawnProjectile", spawn_projectile_fn)?;

    let queue_spawn_fn = lua.create_function(
        |lua,
         (spawner, x, y, archetype, script_path, health, score_value): (
            EntityHandle,
            f32,
            f32,
            String,
            Option<String>,
            Option<i32>,
            Option<i64>,
        )| {
            let archetype = parse_archetype(&archetype)?;
            let registry = context(lua)?.registry()?;
            let request = SpawnRequest {
                position: Vec2::new(x, y),
                archetype,
                script_path,
                health: health.unwrap_or(0),
                score_value: score_value.unwrap_or(0),
                spawn_delay_seconds: 0.0,
                has_spawned: false,
            };
            let spawner_comp = registry
                .get_component_mut::<Spawner>(spawner.0)
                .map_err(ecs_err)?;
            spawner_comp.queue(request);
            Ok(())
        },
    )?;
    lua.globals().set("queueSpawn", queue_spawn_fn)?;

    let distance_fn = lua.create_function(|_, (x1, y1, x2, y2): (f32, f32, f32, f32)| {
        Ok(((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt())
    })?;
    lua.globals().set("distance", distance_fn)?;

    let normalize_fn = lua.create_function(|lua, (x, y): (f32, f32)| {
        let n = Vec2::new(x, y).normalized();
        let table = lua.create_table()?;
        table.set("x", n.x)?;
        table.set("y", n.y)?;
        Ok(table)
    })?;
    lua.globals().set("normalize", normalize_fn)?;

    let random_fn = lua.create_function(|_, (min, max): (f32, f32)| {
        Ok(min + rand::random::<f32>() * (max - min))
    })?;
    lua.globals().set("random", random_fn)?;

    Ok(())
}
