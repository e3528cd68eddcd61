use rtype_types::{PeerId, PlayerId, SessionId};

/// Binds a transport peer to a stable gameplay identity (spec.md §3.3).
/// `Session` is created at handshake and torn down on disconnect; the
/// bidirectional peer<->session lookup lives in `rtype-server`'s
/// `SessionTable` since it is purely network-layer bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub session_id: SessionId,
    pub peer: PeerId,
    pub player_id: PlayerId,
    pub is_spectator: bool,
    pub active: bool,
}

impl Session {
    pub fn new(session_id: SessionId, peer: PeerId, player_id: PlayerId) -> Self {
        Self {
            session_id,
            peer,
            player_id,
            is_spectator: false,
            active: true,
        }
    }
}
