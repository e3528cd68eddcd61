//! Data-only component types. Systems hold the behavior; these hold the state.

use rtype_types::{PlayerId, Vec2};

/// Position, rotation and scale in 2D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub rotation_degrees: f32,
    pub scale: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation_degrees: 0.0,
            scale: Vec2::new(1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Default::default()
        }
    }
}

/// Movement direction (expected normalized) and scalar speed.
///
/// `base_speed` mirrors `Weapon`'s `base_fire_rate`/`base_damage`: buffs scale
/// `speed` off of it each tick instead of compounding on the previous result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub direction: Vec2,
    pub speed: f32,
    pub base_speed: f32,
}

impl Velocity {
    pub fn new(direction: Vec2, speed: f32) -> Self {
        Self { direction, speed, base_speed: speed }
    }
}

/// Current/max health plus a temporary invincibility window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: i32,
    pub max: i32,
    pub invincible: bool,
    pub invincibility_timer: f32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self {
            current: max,
            max,
            invincible: false,
            invincibility_timer: 0.0,
        }
    }

    /// Applies damage unless invincible. Returns `true` if health was actually reduced.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.invincible || amount <= 0 {
            return false;
        }
        self.current = (self.current - amount).max(0);
        true
    }

    pub fn heal(&mut self, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.current = (self.current + amount).min(self.max);
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }
}

/// Collision layers, one distinct bit each (spec.md §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionLayer;

impl CollisionLayer {
    pub const PLAYER: u32 = 1 << 0;
    pub const ENEMY: u32 = 1 << 1;
    pub const PLAYER_PROJECTILE: u32 = 1 << 2;
    pub const ENEMY_PROJECTILE: u32 = 1 << 3;
    pub const WALL: u32 = 1 << 4;
    pub const COLLECTIBLE: u32 = 1 << 5;
    pub const PLAYER_MODULE: u32 = 1 << 6;
}

/// AABB size/offset plus layer-based collision filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub size: Vec2,
    pub offset: Vec2,
    pub layer: u32,
    pub mask: u32,
    pub is_trigger: bool,
}

impl Collider {
    pub fn new(size: Vec2, layer: u32, mask: u32) -> Self {
        Self {
            size,
            offset: Vec2::ZERO,
            layer,
            mask,
            is_trigger: false,
        }
    }
}

/// Two colliders interact iff each one's mask includes the other's layer.
pub fn can_collide(layer_a: u32, mask_a: u32, layer_b: u32, mask_b: u32) -> bool {
    (mask_a & layer_b) != 0 && (mask_b & layer_a) != 0
}

/// Score, remaining lives, and the stable gameplay identifier assigned by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub score: i64,
    pub lives: i32,
    pub player_id: PlayerId,
}

/// A single enemy archetype; the spawn table is a match over this sum type
/// (REDESIGN FLAG: replaces the source's stringly-typed `"basic"`/`"heavy"`/... tags).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyArchetype {
    Basic,
    Heavy,
    Fast,
    Boss,
}

impl EnemyArchetype {
    /// Speed (units/s), max HP, score value on destruction, and AABB size.
    pub fn stats(self) -> (f32, i32, i64, Vec2) {
        match self {
            EnemyArchetype::Basic => (120.0, 20, 10, Vec2::new(32.0, 32.0)),
            EnemyArchetype::Heavy => (60.0, 80, 40, Vec2::new(48.0, 48.0)),
            EnemyArchetype::Fast => (220.0, 10, 15, Vec2::new(24.0, 24.0)),
            EnemyArchetype::Boss => (40.0, 500, 500, Vec2::new(96.0, 96.0)),
        }
    }
}

/// Minimal attack-pattern taxonomy (Open Question resolution, see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPattern {
    /// Constant leftward drift; the floor behavior suggested by spec.md.
    LinearLeft,
    /// Leftward drift with a vertical sine wobble.
    SineDrift,
    /// Does not move on its own; scripted or map-driven instead.
    Stationary,
}

/// Archetype tag and score value awarded on destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enemy {
    pub archetype: EnemyArchetype,
    pub attack_pattern: AttackPattern,
    pub score_value: i64,
}

/// Damage, remaining lifetime, owner entity, and team affiliation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub damage: i32,
    pub lifetime_seconds: f32,
    pub owner: rtype_types::EntityId,
    pub friendly: bool,
}

/// Charge-shot and multishot capable weapon (spec.md §4.2 step 9).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weapon {
    pub fire_rate: f32,
    pub cooldown: f32,
    pub projectile_type: i32,
    pub damage: f32,
    pub base_fire_rate: f32,
    pub base_damage: f32,
    pub should_shoot: bool,
    pub charging: bool,
    pub charge_level: f32,
    pub charge_rate: f32,
}

impl Weapon {
    pub fn new(fire_rate: f32, damage: f32) -> Self {
        Self {
            fire_rate,
            cooldown: 0.0,
            projectile_type: 0,
            damage,
            base_fire_rate: fire_rate,
            base_damage: damage,
            should_shoot: false,
            charging: false,
            charge_level: 0.0,
            charge_rate: 1.0,
        }
    }
}

/// Kinds of timed or permanent stat/behavior modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuffKind {
    SpeedBoost,
    DamageBoost,
    FireRateBoost,
    Shield,
    HealthRegen,
    MultiShot,
    PiercingShot,
    HomingShot,
    MaxHealthIncrease,
    DoubleShot,
    TripleShot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuffInstance {
    pub kind: BuffKind,
    /// Remaining duration in seconds; `<= 0.0` means permanent.
    pub remaining_duration: f32,
    pub value: f32,
}

impl BuffInstance {
    pub fn is_permanent(&self) -> bool {
        self.remaining_duration <= 0.0
    }
}

/// Active buff instances on an entity. Adding a buff of an existing kind refreshes it.
#[derive(Debug, Clone, Default)]
pub struct Buff {
    pub instances: Vec<BuffInstance>,
}

impl Buff {
    pub fn add(&mut self, kind: BuffKind, duration: f32, value: f32) {
        if let Some(existing) = self.instances.iter_mut().find(|b| b.kind == kind) {
            existing.remaining_duration = duration;
            existing.value = value;
            return;
        }
        self.instances.push(BuffInstance {
            kind,
            remaining_duration: duration,
            value,
        });
    }

    pub fn remove(&mut self, kind: BuffKind) {
        self.instances.retain(|b| b.kind != kind);
    }

    pub fn has(&self, kind: BuffKind) -> bool {
        self.instances.iter().any(|b| b.kind == kind)
    }

    pub fn value_of(&self, kind: BuffKind) -> f32 {
        self.instances
            .iter()
            .find(|b| b.kind == kind)
            .map(|b| b.value)
            .unwrap_or(1.0)
    }
}

/// What a collectible grants on pickup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collectible {
    PowerUp { buff: BuffKind, duration: f32, value: f32 },
    Upgrade { buff: BuffKind, value: f32 },
    HealthPack { restore: i32 },
    Score { value: i64 },
}

/// A satellite entity whose position is kinematically derived from a parent plus an angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalModule {
    pub parent: rtype_types::EntityId,
    pub orbit_radius: f32,
    pub angular_velocity_rad_s: f32,
    pub current_angle_rad: f32,
    pub damage: i32,
    pub blocks_projectiles: bool,
}

/// Opaque rendering state, replicated to clients but never interpreted by the server.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Animation {
    pub current_clip: String,
    pub timer: f32,
    pub frame_index: u32,
    pub playing: bool,
    pub looping: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub frame_count: u32,
    pub frame_duration: f32,
    pub looping: bool,
    pub next_clip: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationSet {
    pub texture_key: String,
    pub clips: std::collections::HashMap<String, AnimationClip>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub texture_key: String,
    pub scale: f32,
    pub rotation_degrees: f32,
    pub flip_x: bool,
    pub flip_y: bool,
    pub layer: i32,
}

/// Reason an entity is queued for end-of-tick destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    OutOfBounds,
    Killed,
    Expired,
    Manual,
}

/// Marker component: destruction is deferred to end-of-tick cleanup so that systems
/// iterating entities within the same tick observe a consistent world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDestroy {
    pub reason: DestroyReason,
}

impl PendingDestroy {
    pub fn new(reason: DestroyReason) -> Self {
        Self { reason }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub position: Vec2,
    pub archetype: EnemyArchetype,
    pub script_path: Option<String>,
    pub health: i32,
    pub score_value: i64,
    pub spawn_delay_seconds: f32,
    pub has_spawned: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Wave {
    pub enemies: Vec<SpawnRequest>,
    pub wave_interval_seconds: f32,
}

/// Declarative wave configuration plus runtime spawn-clock state.
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    pub waves: Vec<Wave>,
    pub current_wave_index: usize,
    pub elapsed_in_wave: f32,
    pub active: bool,
}

impl Spawner {
    pub fn with_waves(waves: Vec<Wave>) -> Self {
        Self {
            waves,
            current_wave_index: 0,
            elapsed_in_wave: 0.0,
            active: true,
        }
    }

    /// Inserts a request into the current wave so the spawn system picks it
    /// up on its next pass. Grounded on the original engine's
    /// `Spawner::queueSpawn`, exposed to scripts via the `queueSpawn` global.
    pub fn queue(&mut self, mut request: SpawnRequest) {
        request.spawn_delay_seconds = self.elapsed_in_wave;
        request.has_spawned = false;
        if self.current_wave_index >= self.waves.len() {
            self.waves.push(Wave::default());
            self.current_wave_index = self.waves.len() - 1;
        }
        self.waves[self.current_wave_index].enemies.push(request);
        self.active = true;
    }
}

/// Scrolling background / level metadata. MapData's loader is out of scope; this only
/// carries the fields the MapSystem advances each tick.
#[derive(Debug, Clone)]
pub struct MapData {
    pub map_id: String,
    pub scroll_speed_px_s: f32,
    pub duration_seconds: f32,
    pub next_map_id: Option<String>,
    pub elapsed_seconds: f32,
    pub completed: bool,
}

impl MapData {
    pub fn new(map_id: impl Into<String>, scroll_speed_px_s: f32, duration_seconds: f32) -> Self {
        Self {
            map_id: map_id.into(),
            scroll_speed_px_s,
            duration_seconds,
            next_map_id: None,
            elapsed_seconds: 0.0,
            completed: false,
        }
    }
}

/// Opaque script identifier bound to this entity; interpreted by the scripting bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuaScript {
    pub script_path: String,
}
