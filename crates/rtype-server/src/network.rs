//! The network thread's per-connection logic (spec.md §4.5): handshake,
//! session binding, and dispatch of every other message kind to the lobby,
//! matchmaking, auth, and per-room input queues. One task per accepted TCP
//! connection; the task itself plays the role of the spec's "network
//! thread" for that one peer, with a paired writer task serializing sends.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rtype_protocol::{decode, message_type_of, packets, Connection, Message};
use rtype_rooms::{JoinOutcome, LeaveEffect, MatchmakingPlacement, START_GRACE_PERIOD};
use rtype_types::PlayerId;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::player::PeerHandle;
use crate::room_loop::room_state_allows_join;
use crate::state::SharedState;

fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Drives one accepted connection end to end: handshake, then message dispatch
/// until the peer disconnects or is kicked. Teardown (session unbind, lobby
/// leave, auth token revocation) always runs on the way out.
pub async fn handle_connection(stream: TcpStream, state: Arc<SharedState>) {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => addr,
        Err(err) => {
            warn!(%err, "accepted connection with no peer address");
            return;
        }
    };
    let conn = Connection::new(stream);
    let (mut reader, mut writer) = conn.into_split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<(u16, Vec<u8>)>();
    let peer_id = state.allocate_peer_id();
    state.register_peer(
        peer_id,
        PeerHandle {
            outbound: outbound_tx,
            addr: peer_addr,
        },
    );

    let writer_task = tokio::spawn(async move {
        while let Some((message_type, payload)) = outbound_rx.recv().await {
            if writer.write_frame(message_type, &payload).await.is_err() {
                break;
            }
        }
    });

    info!(peer = %peer_addr, "peer connected");

    match run_handshake(&mut reader, &state, peer_id).await {
        Ok(player_id) => {
            if let Err(err) = run_session(&mut reader, &state, peer_id, player_id).await {
                debug!(peer = %peer_addr, %err, "connection ended");
            }
            teardown(&state, peer_id, player_id).await;
        }
        Err(err) => {
            debug!(peer = %peer_addr, %err, "handshake failed");
        }
    }

    writer_task.abort();
    state.unregister_peer(peer_id);
    info!(peer = %peer_addr, "peer disconnected");
}

/// Reads exactly one frame, expecting `HandshakeRequest` (spec.md §4.5). Any
/// other message, a protocol decode error, or a version mismatch is a kick.
async fn run_handshake(
    reader: &mut rtype_protocol::ConnectionReader,
    state: &Arc<SharedState>,
    peer_id: rtype_types::PeerId,
) -> anyhow::Result<PlayerId> {
    let (message_type, payload) = tokio::time::timeout(Duration::from_secs(10), reader.read_frame())
        .await
        .map_err(|_| anyhow::anyhow!("handshake timed out"))??;

    let message = decode(message_type, payload).map_err(|err| anyhow::anyhow!("bad handshake frame: {err}"))?;
    let (client_version, player_name) = match message {
        Message::HandshakeRequest {
            client_version,
            player_name,
            ..
        } => (client_version, player_name),
        other => {
            kick(state, peer_id, "expected HandshakeRequest");
            anyhow::bail!("peer sent {other:?} before handshaking");
        }
    };

    if client_version != state.config.protocol_version {
        let reason = format!(
            "protocol version mismatch: server={}, client={}",
            state.config.protocol_version, client_version
        );
        kick(state, peer_id, &reason);
        anyhow::bail!(reason);
    }

    if state.sessions.active_session_count() as u32 >= state.config.max_clients {
        kick(state, peer_id, "server is at capacity");
        anyhow::bail!("server full");
    }

    let player_id = state.allocate_player_id();
    let session_id = state.allocate_session_id();
    state.sessions.bind(rtype_rooms::Session::new(session_id, peer_id, player_id));
    state.lobby.lock().expect("lobby poisoned").connect(player_id);

    state.send_to_peer(
        peer_id,
        &Message::HandshakeResponse {
            accepted: true,
            session_id: session_id.0,
            server_id: state.config.server_id.clone(),
            message: format!("welcome, {player_name}"),
            server_version: state.config.protocol_version,
        },
    );

    info!(peer = peer_id.0, player = player_id.0, player_name, "session established");
    Ok(player_id)
}

fn kick(state: &Arc<SharedState>, peer_id: rtype_types::PeerId, reason: &str) {
    state.send_to_peer(peer_id, &Message::Kick { reason: reason.to_string() });
}

/// Sends a human-readable rejection back to the requester. The wire protocol
/// has no dedicated error-response message, so every `InvalidState`/
/// `CapacityExceeded` rejection (spec.md §7) rides back as a `Chat` notice —
/// a textual reason suitable for display, same as every other rejection.
fn notify(state: &Arc<SharedState>, peer_id: rtype_types::PeerId, text: impl Into<String>) {
    state.send_to_peer(peer_id, &Message::Chat { text: text.into() });
}

/// The main per-connection loop: reads frames until disconnect, applying an
/// inactivity timeout per spec.md §5 ("continues to simulate with zeroed
/// input ... until timeout expires and the session is evicted").
async fn run_session(
    reader: &mut rtype_protocol::ConnectionReader,
    state: &Arc<SharedState>,
    peer_id: rtype_types::PeerId,
    player_id: PlayerId,
) -> anyhow::Result<()> {
    let idle_timeout = Duration::from_secs(state.config.inactivity_timeout_secs);
    loop {
        let (message_type, payload) = match tokio::time::timeout(idle_timeout, reader.read_frame()).await {
            Ok(result) => result?,
            Err(_) => anyhow::bail!("peer {} timed out after {:?} idle", peer_id.0, idle_timeout),
        };

        let message = match decode(message_type, payload) {
            Ok(message) => message,
            Err(err) => {
                kick(state, peer_id, &format!("protocol violation: {err}"));
                anyhow::bail!("protocol violation from peer {}: {err}", peer_id.0);
            }
        };

        match message {
            Message::PlayerInput { sequence_id, actions } => {
                if let Some(room_id) = state.lobby.lock().expect("lobby poisoned").current_room_of(player_id).map(str::to_string) {
                    state.queue_room_input(&room_id, (player_id, sequence_id, actions));
                }
            }
            Message::Ping { timestamp, seq } => {
                state.send_to_peer(
                    peer_id,
                    &Message::Pong {
                        client_ts: timestamp,
                        server_ts: now_unix_millis(),
                        seq,
                    },
                );
            }
            Message::Pong { server_ts, seq, .. } => {
                let rtt_ms = now_unix_millis() - server_ts;
                debug!(peer = peer_id.0, seq, rtt_ms, "pong received");
            }
            Message::RoomListRequest => {
                let rooms = state
                    .lobby
                    .lock()
                    .expect("lobby poisoned")
                    .public_rooms()
                    .into_iter()
                    .map(|r| packets::RoomSummary {
                        room_id: r.room_id.clone(),
                        room_name: r.name.clone(),
                        player_count: r.players().len() as u32,
                        max_players: r.max_players,
                    })
                    .collect();
                state.send_to_peer(peer_id, &Message::RoomListResponse { rooms });
            }
            Message::RoomCreate { room_name, max_players } => {
                let room_id = state.lobby.lock().expect("lobby poisoned").create_custom_room(player_id, room_name, max_players, false);
                info!(room_id, player = player_id.0, "custom room created");
                notify(state, peer_id, format!("room '{room_id}' created"));
            }
            Message::RoomJoin { room_id } => handle_room_join(state, peer_id, player_id, &room_id),
            Message::RoomLeave => handle_room_leave(state, player_id),
            Message::RoomStart => handle_room_start(state, peer_id, player_id),
            Message::Chat { text } => broadcast_chat(state, player_id, text),
            Message::AuthRegister { username, password, email } => {
                let (success, message) = match state.auth.register(&username, &password, email) {
                    Ok(()) => (true, "registered".to_string()),
                    Err(err) => (false, err.to_string()),
                };
                state.send_to_peer(peer_id, &Message::AuthResult { success, token: None, message });
            }
            Message::AuthLogin { username, password } => match state.auth.login(&username, &password) {
                Ok(token) => {
                    state.bind_auth_token(peer_id, token.clone());
                    state.send_to_peer(
                        peer_id,
                        &Message::AuthResult {
                            success: true,
                            token: Some(token),
                            message: "login succeeded".to_string(),
                        },
                    );
                }
                Err(err) => {
                    state.send_to_peer(
                        peer_id,
                        &Message::AuthResult {
                            success: false,
                            token: None,
                            message: err.to_string(),
                        },
                    );
                }
            },
            Message::Disconnect { reason } => {
                debug!(peer = peer_id.0, reason, "peer requested disconnect");
                return Ok(());
            }
            other => {
                kick(state, peer_id, &format!("unexpected message {:#06x}", message_type_of(&other)));
                anyhow::bail!("peer {} sent an out-of-place message", peer_id.0);
            }
        }
    }
}

/// `RoomJoin{room_id}` with an empty `room_id` means "find me a game" rather
/// than a specific room — it drives `Lobby::find_or_queue`'s strategy ladder
/// (spec.md §4.4) instead of a direct `join_room` call.
fn handle_room_join(state: &Arc<SharedState>, peer_id: rtype_types::PeerId, player_id: PlayerId, room_id: &str) {
    if room_id.is_empty() {
        match state.lobby.lock().expect("lobby poisoned").find_or_queue(player_id) {
            MatchmakingPlacement::JoinedRoom { room_id, outcome } => notify_join_outcome(state, peer_id, &room_id, outcome),
            MatchmakingPlacement::Queued => notify(state, peer_id, "queued for matchmaking"),
        }
        return;
    }

    let joinable = state
        .lobby
        .lock()
        .expect("lobby poisoned")
        .room(room_id)
        .map(|r| room_state_allows_join(r.state))
        .unwrap_or(false);
    if !joinable {
        notify(state, peer_id, format!("room '{room_id}' is not accepting joins"));
        return;
    }
    match state.lobby.lock().expect("lobby poisoned").join_room(player_id, room_id) {
        Ok(outcome) => notify_join_outcome(state, peer_id, room_id, outcome),
        Err(err) => notify(state, peer_id, err.to_string()),
    }
}

fn notify_join_outcome(state: &Arc<SharedState>, peer_id: rtype_types::PeerId, room_id: &str, outcome: JoinOutcome) {
    match outcome {
        JoinOutcome::Player => notify(state, peer_id, format!("joined room '{room_id}'")),
        JoinOutcome::Spectator => notify(state, peer_id, format!("joined room '{room_id}' as a spectator")),
    }
}

fn handle_room_leave(state: &Arc<SharedState>, player_id: PlayerId) {
    if let Some((room_id, effect)) = state.lobby.lock().expect("lobby poisoned").leave_current_room(player_id) {
        apply_leave_effect(state, &room_id, effect);
    }
}

fn handle_room_start(state: &Arc<SharedState>, peer_id: rtype_types::PeerId, player_id: PlayerId) {
    let Some(room_id) = state.lobby.lock().expect("lobby poisoned").current_room_of(player_id).map(str::to_string) else {
        notify(state, peer_id, "you are not in a room");
        return;
    };
    match state.lobby.lock().expect("lobby poisoned").start_game(player_id, &room_id) {
        Ok(()) => schedule_room_start(state.clone(), room_id),
        Err(err) => notify(state, peer_id, err.to_string()),
    }
}

fn broadcast_chat(state: &Arc<SharedState>, player_id: PlayerId, text: String) {
    let Some(room_id) = state.lobby.lock().expect("lobby poisoned").current_room_of(player_id).map(str::to_string) else {
        return;
    };
    let recipients = {
        let lobby = state.lobby.lock().expect("lobby poisoned");
        match lobby.room(&room_id) {
            Some(room) => room.players().iter().chain(room.spectators()).copied().collect::<Vec<_>>(),
            None => return,
        }
    };
    for recipient in recipients {
        state.send_to_player(recipient, &Message::Chat { text: text.clone() });
    }
}

/// `STARTING -> IN_PROGRESS` after `START_GRACE_PERIOD` (spec.md §4.4), then
/// spawns the room's game-loop task. Shared between a host's explicit
/// `RoomStart` and a freshly matchmade batch.
pub fn schedule_room_start(state: Arc<SharedState>, room_id: String) {
    tokio::spawn(async move {
        tokio::time::sleep(START_GRACE_PERIOD).await;
        let began = state.lobby.lock().expect("lobby poisoned").begin_play(&room_id).is_ok();
        if began {
            state.spawn_room(room_id);
        } else {
            warn!(room_id, "room vanished before its start grace period elapsed");
        }
    });
}

fn apply_leave_effect(state: &Arc<SharedState>, room_id: &str, effect: LeaveEffect) {
    if let Some(new_host) = effect.new_host {
        info!(room_id, new_host = new_host.0, "host promoted after leave");
    }
    if effect.room_is_empty {
        state.stop_room(room_id);
        state.rooms.lock().expect("room table poisoned").remove(room_id);
    }
}

async fn teardown(state: &Arc<SharedState>, peer_id: rtype_types::PeerId, player_id: PlayerId) {
    state.sessions.unbind_peer(peer_id);
    if let Some(token) = state.take_auth_token(peer_id) {
        state.auth.revoke_token(&token);
    }
    if let Some((room_id, effect)) = state.lobby.lock().expect("lobby poisoned").disconnect(player_id) {
        apply_leave_effect(state, &room_id, effect);
    }
}

/// Drains the matchmaking queue on a fixed cadence, spawning any rooms it
/// bundles (spec.md §4.4, `MatchmakingService.tick()`). Runs for the life of
/// the server; `main` holds its `JoinHandle`.
pub async fn run_matchmaking_loop(state: Arc<SharedState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;
        let created = state.lobby.lock().expect("lobby poisoned").run_matchmaking_tick();
        for room_id in created {
            let host = state.lobby.lock().expect("lobby poisoned").room(&room_id).map(|r| r.host);
            let Some(host) = host else { continue };
            match state.lobby.lock().expect("lobby poisoned").start_game(host, &room_id) {
                Ok(()) => {
                    info!(room_id, host = host.0, "matchmaking formed a room");
                    schedule_room_start(state.clone(), room_id);
                }
                Err(err) => warn!(room_id, %err, "matchmade room failed to start"),
            }
        }
    }
}
