pub mod ai;
pub mod boundary;
pub mod buff;
pub mod cleanup;
pub mod collision;
pub mod collision_resolution;
pub mod health;
pub mod map;
pub mod movement;
pub mod orbital;
pub mod projectile;
pub mod scripted;
pub mod spawn;
pub mod weapon;

pub use cleanup::Destroyed;
pub use collision::CollisionEvent;
pub use scripted::ScriptHost;
pub use spawn::spawn_enemy;
pub use weapon::spawn_projectile;
