/// Lifecycle of one transport peer, independent of the session it may end up
/// bound to. A peer starts `Handshaking` and is expected to send exactly one
/// `HandshakeRequest` before anything else is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Handshaking,
    Established,
}

impl ConnectionState {
    pub fn accepts(&self, message_type: u16) -> bool {
        match self {
            ConnectionState::Handshaking => message_type == crate::packets::HANDSHAKE_REQUEST,
            ConnectionState::Established => message_type != crate::packets::HANDSHAKE_REQUEST,
        }
    }
}
