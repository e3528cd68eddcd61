//! Per-peer outbound handle and the session <-> peer binding table (spec.md
//! §4.5 "Session-to-peer binding" / §5 "Peer -> session and session -> peer
//! maps are guarded by a mutex; writes occur only on handshake and
//! disconnect").

use std::collections::HashMap;
use std::sync::Mutex;

use rtype_protocol::{encode, message_type_of, Message};
use rtype_rooms::Session;
use rtype_types::{PeerId, PlayerId, SessionId};
use tokio::sync::mpsc;

/// A queued outbound frame: `(message_type, payload)`, ready for
/// `Connection::write_frame`.
pub type OutboundFrame = (u16, Vec<u8>);

/// What a connection task registers so the rest of the server can reach it
/// without holding a reference to the socket itself.
pub struct PeerHandle {
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub addr: std::net::SocketAddr,
}

impl PeerHandle {
    /// Encodes and queues `message`; the write actually happens on the
    /// connection's writer task. Silently drops if the peer has already
    /// disconnected (the channel's receiver was dropped) — the disconnect
    /// handler is responsible for tearing down session state.
    pub fn send(&self, message: &Message) {
        let message_type = message_type_of(message);
        let payload = encode(message).to_vec();
        let _ = self.outbound.send((message_type, payload));
    }
}

/// Bidirectional session <-> peer binding, plus every session's gameplay
/// identity. A session is created on a successful handshake and removed on
/// disconnect; nothing else writes to this table.
#[derive(Default)]
pub struct SessionTable {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    by_session: HashMap<SessionId, Session>,
    peer_to_session: HashMap<PeerId, SessionId>,
    player_to_peer: HashMap<PlayerId, PeerId>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, session: Session) {
        let mut inner = self.inner.lock().expect("session table poisoned");
        inner.peer_to_session.insert(session.peer, session.session_id);
        inner.player_to_peer.insert(session.player_id, session.peer);
        inner.by_session.insert(session.session_id, session);
    }

    /// Removes and returns the session bound to `peer`, if any (disconnect path).
    pub fn unbind_peer(&self, peer: PeerId) -> Option<Session> {
        let mut inner = self.inner.lock().expect("session table poisoned");
        let session_id = inner.peer_to_session.remove(&peer)?;
        let session = inner.by_session.remove(&session_id)?;
        inner.player_to_peer.remove(&session.player_id);
        Some(session)
    }

    pub fn session_for_peer(&self, peer: PeerId) -> Option<Session> {
        let inner = self.inner.lock().expect("session table poisoned");
        let session_id = inner.peer_to_session.get(&peer)?;
        inner.by_session.get(session_id).copied()
    }

    pub fn peer_for_player(&self, player_id: PlayerId) -> Option<PeerId> {
        self.inner.lock().expect("session table poisoned").player_to_peer.get(&player_id).copied()
    }

    pub fn player_id_for_peer(&self, peer: PeerId) -> Option<PlayerId> {
        self.session_for_peer(peer).map(|s| s.player_id)
    }

    pub fn active_session_count(&self) -> usize {
        self.inner.lock().expect("session table poisoned").by_session.len()
    }
}
