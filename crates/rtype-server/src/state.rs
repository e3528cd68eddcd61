//! Shared, cross-connection server state: configuration, accounts, the
//! lobby, the peer/session tables, and the per-room loop handles. Everything
//! here is reached from many connection tasks concurrently, so every mutable
//! piece is behind its own mutex (spec.md §5 "Shared-resource discipline") —
//! nothing here is ever on the hot per-tick path of a room's game loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rtype_auth::AuthService;
use rtype_rooms::Lobby;
use rtype_types::{PeerId, PlayerId, SessionId};
use tokio::sync::{mpsc, watch};

use crate::config::ServerConfig;
use crate::player::{PeerHandle, SessionTable};

/// One player's queued input for a room's game loop: `(playerId, sequenceId,
/// actions bitmask)` (spec.md §4.3 step 1).
pub type RoomInput = (PlayerId, u32, u8);

/// What the rest of the server needs to reach a running room's game loop:
/// the input queue it drains each tick, and a flag to ask it to stop at the
/// next tick boundary (spec.md §5 "Cancellation and shutdown").
pub struct RoomHandle {
    pub input_tx: mpsc::UnboundedSender<RoomInput>,
    pub stop_tx: watch::Sender<bool>,
}

pub struct SharedState {
    pub config: ServerConfig,
    pub auth: AuthService,
    pub lobby: Mutex<Lobby>,
    pub peers: Mutex<HashMap<PeerId, PeerHandle>>,
    pub sessions: SessionTable,
    pub rooms: Mutex<HashMap<String, RoomHandle>>,
    /// Which login token (if any) is currently associated with a peer, so it
    /// can be revoked on disconnect (spec.md §4.5 "tokens are revoked on
    /// disconnect").
    auth_tokens: Mutex<HashMap<PeerId, String>>,
    next_peer_id: AtomicU64,
    next_player_id: AtomicU32,
    next_session_id: AtomicU64,
}

impl SharedState {
    pub fn new(config: ServerConfig, auth: AuthService) -> Self {
        let lobby = Lobby::new(config.matchmaking_min_players, config.matchmaking_max_players);
        Self {
            config,
            auth,
            lobby: Mutex::new(lobby),
            peers: Mutex::new(HashMap::new()),
            sessions: SessionTable::new(),
            rooms: Mutex::new(HashMap::new()),
            auth_tokens: Mutex::new(HashMap::new()),
            next_peer_id: AtomicU64::new(1),
            next_player_id: AtomicU32::new(1),
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn allocate_peer_id(&self) -> PeerId {
        PeerId(self.next_peer_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn allocate_player_id(&self) -> PlayerId {
        PlayerId(self.next_player_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn allocate_session_id(&self) -> SessionId {
        SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register_peer(&self, peer: PeerId, handle: PeerHandle) {
        self.peers.lock().expect("peer table poisoned").insert(peer, handle);
    }

    pub fn unregister_peer(&self, peer: PeerId) {
        self.peers.lock().expect("peer table poisoned").remove(&peer);
    }

    pub fn bind_auth_token(&self, peer: PeerId, token: String) {
        self.auth_tokens.lock().expect("auth token table poisoned").insert(peer, token);
    }

    /// Removes and returns the token bound to `peer`, if a successful login ever
    /// happened on this connection.
    pub fn take_auth_token(&self, peer: PeerId) -> Option<String> {
        self.auth_tokens.lock().expect("auth token table poisoned").remove(&peer)
    }

    pub fn send_to_peer(&self, peer: PeerId, message: &rtype_protocol::Message) {
        if let Some(handle) = self.peers.lock().expect("peer table poisoned").get(&peer) {
            handle.send(message);
        }
    }

    pub fn send_to_player(&self, player_id: PlayerId, message: &rtype_protocol::Message) {
        if let Some(peer) = self.sessions.peer_for_player(player_id) {
            self.send_to_peer(peer, message);
        }
    }

    pub fn broadcast(&self, message: &rtype_protocol::Message) {
        for handle in self.peers.lock().expect("peer table poisoned").values() {
            handle.send(message);
        }
    }

    /// Registers a `RoomHandle` for `room_id` and spawns the game-thread-equivalent
    /// task driving it (spec.md §5: "one game thread per active room"). Called once
    /// a room leaves `WAITING` for good — either a host's `RoomStart` or a freshly
    /// matchmade batch.
    pub fn spawn_room(self: &Arc<Self>, room_id: String) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        self.rooms
            .lock()
            .expect("room table poisoned")
            .insert(room_id.clone(), RoomHandle { input_tx, stop_tx });
        let state = self.clone();
        tokio::spawn(async move {
            crate::room_loop::run(state, room_id, input_rx, stop_rx).await;
        });
    }

    /// Queues a stop signal for `room_id`'s game loop, if it's running. The loop
    /// observes this at its next tick boundary (spec.md §5 "Cancellation and
    /// shutdown").
    pub fn stop_room(&self, room_id: &str) {
        if let Some(handle) = self.rooms.lock().expect("room table poisoned").get(room_id) {
            let _ = handle.stop_tx.send(true);
        }
    }

    pub fn queue_room_input(&self, room_id: &str, input: RoomInput) {
        if let Some(handle) = self.rooms.lock().expect("room table poisoned").get(room_id) {
            let _ = handle.input_tx.send(input);
        }
    }
}
