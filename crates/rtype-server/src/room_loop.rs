//! The fixed-timestep per-room game loop (spec.md §4.3), replacing the
//! teacher's world-tick loop with one that drives `rtype_ecs::pipeline::step`
//! instead of chunk ticking.

use std::collections::HashMap;
use std::sync::Arc;

use rtype_ecs::components::DestroyReason as EcsDestroyReason;
use rtype_ecs::registry::Registry;
use rtype_ecs::PipelineConfig;
use rtype_protocol::{DestroyReason as WireDestroyReason, Message};
use rtype_rooms::RoomState;
use rtype_scripting::LuaScriptHost;
use rtype_types::PlayerId;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::ecs::{build_snapshot, spawn_default_waves, spawn_player};
use crate::state::{RoomInput, SharedState};

pub mod input_action {
    pub use rtype_protocol::packets::input_action::*;
}

fn to_wire_reason(reason: EcsDestroyReason) -> WireDestroyReason {
    match reason {
        EcsDestroyReason::OutOfBounds => WireDestroyReason::OutOfBounds,
        EcsDestroyReason::Killed => WireDestroyReason::KilledByPlayer,
        EcsDestroyReason::Expired => WireDestroyReason::Expired,
        EcsDestroyReason::Manual => WireDestroyReason::Collision,
    }
}

/// Runs one room's simulation until it finishes, is stopped, or empties out.
/// Owns the room's `Registry` exclusively for its entire lifetime — no other
/// task ever touches it (spec.md §5 "single-threaded within a room").
pub async fn run(
    state: Arc<SharedState>,
    room_id: String,
    mut input_rx: mpsc::UnboundedReceiver<RoomInput>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let (players, seed) = {
        let lobby = state.lobby.lock().expect("lobby poisoned");
        let Some(room) = lobby.room(&room_id) else {
            warn!(room_id, "room loop started for a room that no longer exists");
            return;
        };
        (room.players().to_vec(), room_id_seed(&room_id))
    };

    let mut registry = Registry::with_seed(seed);
    let pipeline_config = PipelineConfig {
        screen_width: state.config.screen_width,
        screen_height: state.config.screen_height,
    };
    let mut script_host = match LuaScriptHost::new() {
        Ok(host) => host,
        Err(err) => {
            warn!(room_id, %err, "failed to initialize scripting host, room cannot start");
            return;
        }
    };

    let mut entity_of: HashMap<PlayerId, rtype_types::EntityId> = HashMap::new();
    for (index, player_id) in players.iter().enumerate() {
        let entity = spawn_player(&mut registry, *player_id, index, pipeline_config.screen_height);
        entity_of.insert(*player_id, entity);
    }
    spawn_default_waves(&mut registry, pipeline_config.screen_width);

    let mut last_processed_input: HashMap<PlayerId, u32> = HashMap::new();
    let initial_entities = build_snapshot(&registry, &last_processed_input);
    let gamerules = crate::ecs::default_gamerules();
    for player_id in &players {
        state.send_to_player(*player_id, &Message::GamerulePacket { gamerules: gamerules.clone() });
        let your_entity_id = entity_of.get(player_id).map(|e| e.get()).unwrap_or(0);
        state.send_to_player(
            *player_id,
            &Message::GameStart {
                your_entity_id,
                initial_state_tick: 0,
                initial_entities: initial_entities.clone(),
            },
        );
    }

    info!(room_id, players = players.len(), "room loop starting");

    let tick_duration = state.config.tick_duration();
    let game_speed = state
        .lobby
        .lock()
        .expect("lobby poisoned")
        .room(&room_id)
        .map(|r| r.game_speed_multiplier)
        .unwrap_or(1.0);
    let dt = (1.0 / state.config.tick_rate_hz as f32) * game_speed;

    let mut interval = tokio::time::interval(tick_duration);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut server_tick: u32 = 0;
    let mut elapsed_seconds: f32 = 0.0;
    let stop_reason;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    stop_reason = "shutdown".to_string();
                    break;
                }
            }
        }

        while let Ok((player_id, sequence_id, actions)) = input_rx.try_recv() {
            last_processed_input.insert(player_id, sequence_id);
            let Some(&entity) = entity_of.get(&player_id) else { continue };
            apply_input(&mut registry, entity, actions);
        }

        let report = rtype_ecs::step(&mut registry, &pipeline_config, &mut script_host, dt, elapsed_seconds);
        server_tick += 1;
        elapsed_seconds += dt;

        for destroyed in &report.destroyed {
            broadcast_to_room(&state, &room_id, &Message::EntityDestroyed {
                entity_id: destroyed.entity.get(),
                reason: to_wire_reason(destroyed.reason),
            });
        }

        let entities = build_snapshot(&registry, &last_processed_input);
        broadcast_to_room(&state, &room_id, &Message::GameState { server_tick, entities });

        let any_player_alive = entity_of.values().any(|&e| {
            registry
                .get_component::<rtype_ecs::components::Health>(e)
                .map(|h| !h.is_dead())
                .unwrap_or(false)
        });
        if !any_player_alive {
            stop_reason = "game_over".to_string();
            break;
        }
    }

    broadcast_to_room(&state, &room_id, &Message::GameOver { reason: stop_reason.clone() });

    {
        let mut lobby = state.lobby.lock().expect("lobby poisoned");
        if let Some(room) = lobby.room_mut(&room_id) {
            room.finish();
        }
        lobby.remove_room(&room_id);
    }
    state.rooms.lock().expect("room table poisoned").remove(&room_id);
    info!(room_id, stop_reason, "room loop ended");
}

fn apply_input(registry: &mut Registry, entity: rtype_types::EntityId, actions: u8) {
    use rtype_ecs::components::{Velocity, Weapon};
    use rtype_types::Vec2;

    let mut dx = 0.0f32;
    let mut dy = 0.0f32;
    if actions & input_action::MOVE_UP != 0 {
        dy -= 1.0;
    }
    if actions & input_action::MOVE_DOWN != 0 {
        dy += 1.0;
    }
    if actions & input_action::MOVE_LEFT != 0 {
        dx -= 1.0;
    }
    if actions & input_action::MOVE_RIGHT != 0 {
        dx += 1.0;
    }
    let direction = Vec2::new(dx, dy);
    let direction = if direction.length() > f32::EPSILON { direction.normalized() } else { direction };

    if let Ok(velocity) = registry.get_component_mut::<Velocity>(entity) {
        velocity.direction = direction;
    }
    if let Ok(weapon) = registry.get_component_mut::<Weapon>(entity) {
        weapon.should_shoot = actions & input_action::SHOOT != 0;
    }
}

fn broadcast_to_room(state: &Arc<SharedState>, room_id: &str, message: &Message) {
    let (players, spectators) = {
        let lobby = state.lobby.lock().expect("lobby poisoned");
        match lobby.room(room_id) {
            Some(room) => (room.players().to_vec(), room.spectators().to_vec()),
            None => return,
        }
    };
    for player_id in players.into_iter().chain(spectators) {
        state.send_to_player(player_id, message);
    }
}

/// Rooms need a deterministic-but-distinct registry seed; hashing the room id
/// keeps two rooms from ever sharing an entity-id stream while staying a pure
/// function of the id (so a test can reconstruct a room's seed offline).
fn room_id_seed(room_id: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    room_id.hash(&mut hasher);
    hasher.finish()
}

pub fn room_state_allows_join(state: RoomState) -> bool {
    matches!(state, RoomState::Waiting | RoomState::InProgress)
}
