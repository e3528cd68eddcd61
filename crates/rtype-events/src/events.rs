use std::collections::HashMap;

use rtype_types::{EntityId, PlayerId};

/// Room-lifecycle and gameplay-wide notifications that don't belong to any
/// single entity. Distinct from the ECS's `CollisionEvent`/`Destroyed`, which
/// are per-tick and scoped to one room's systems pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PlayerJoined { player_id: PlayerId },
    PlayerLeft { player_id: PlayerId },
    RoomStarted,
    RoomFinished,
    /// A map-wide rule change (e.g. `player.health`, `player.speed`,
    /// `player.fireRate`) broadcast to every peer in the room.
    GameruleSet(HashMap<String, f32>),
    Chat { from: PlayerId, text: String },
    EntitySpawned { entity: EntityId },
}
