use bytes::{BufMut, BytesMut};

use crate::codec::{
    read_f32, read_i64, read_string, read_u16, read_u32, read_u8, write_string, CodecError,
    CodecResult,
};

// === Connection control: 0x0001..0x0006 ===
pub const HANDSHAKE_REQUEST: u16 = 0x0001;
pub const HANDSHAKE_RESPONSE: u16 = 0x0002;
pub const DISCONNECT: u16 = 0x0003;
pub const KICK: u16 = 0x0004;
pub const PING: u16 = 0x0005;
pub const PONG: u16 = 0x0006;

// === Entity lifecycle / world snapshots, S->C: 0x0100..0x01FF ===
pub const GAME_STATE: u16 = 0x0100;
pub const ENTITY_DESTROYED: u16 = 0x0101;
pub const GAME_START: u16 = 0x0102;
pub const GAME_OVER: u16 = 0x0103;

// === Player input, C->S: 0x0200..0x02FF ===
pub const PLAYER_INPUT: u16 = 0x0200;

// === Room/lobby: 0x03xx ===
pub const ROOM_LIST_REQUEST: u16 = 0x0300;
pub const ROOM_LIST_RESPONSE: u16 = 0x0301;
pub const ROOM_CREATE: u16 = 0x0302;
pub const ROOM_JOIN: u16 = 0x0303;
pub const ROOM_LEAVE: u16 = 0x0304;
pub const ROOM_START: u16 = 0x0305;

// === Chat: 0x04xx ===
pub const CHAT_MESSAGE: u16 = 0x0400;

// === Auth: 0x05xx ===
pub const AUTH_REGISTER: u16 = 0x0500;
pub const AUTH_LOGIN: u16 = 0x0501;
pub const AUTH_RESULT: u16 = 0x0502;

// === Gamerule bundle, S->C: 0x06xx ===
pub const GAMERULE_PACKET: u16 = 0x0600;

/// `PlayerInput.actions` is a small closed set; packed as a bitmask rather
/// than a `Vec<enum>` since at most 5 bits are ever set per tick.
pub mod input_action {
    pub const MOVE_UP: u8 = 1 << 0;
    pub const MOVE_DOWN: u8 = 1 << 1;
    pub const MOVE_LEFT: u8 = 1 << 2;
    pub const MOVE_RIGHT: u8 = 1 << 3;
    pub const SHOOT: u8 = 1 << 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    KilledByPlayer,
    OutOfBounds,
    Collision,
    Expired,
}

impl DestroyReason {
    fn to_wire(self) -> u8 {
        match self {
            DestroyReason::KilledByPlayer => 0,
            DestroyReason::OutOfBounds => 1,
            DestroyReason::Collision => 2,
            DestroyReason::Expired => 3,
        }
    }

    fn from_wire(value: u8) -> CodecResult<Self> {
        match value {
            0 => Ok(DestroyReason::KilledByPlayer),
            1 => Ok(DestroyReason::OutOfBounds),
            2 => Ok(DestroyReason::Collision),
            3 => Ok(DestroyReason::Expired),
            _ => Err(CodecError::Malformed("unknown DestroyReason")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    pub entity_id: u32,
    pub entity_type: u16,
    pub position: (f32, f32),
    /// -1 means "not applicable" (non-health-bearing entities).
    pub health: i32,
    pub last_processed_input: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameruleEntry {
    pub key: String,
    pub value: f32,
}

/// Version-independent internal message representation. Connection code
/// reads a `(message_type, payload)` frame and hands it to `decode`, which
/// dispatches to the matching variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    HandshakeRequest {
        client_version: u32,
        player_name: String,
        timestamp: i64,
    },
    HandshakeResponse {
        accepted: bool,
        session_id: u64,
        server_id: String,
        message: String,
        server_version: u32,
    },
    Disconnect {
        reason: String,
    },
    Kick {
        reason: String,
    },
    Ping {
        timestamp: i64,
        seq: u32,
    },
    Pong {
        client_ts: i64,
        server_ts: i64,
        seq: u32,
    },

    GameState {
        server_tick: u32,
        entities: Vec<EntityState>,
    },
    EntityDestroyed {
        entity_id: u32,
        reason: DestroyReason,
    },
    GameStart {
        your_entity_id: u32,
        initial_state_tick: u32,
        initial_entities: Vec<EntityState>,
    },
    GameOver {
        reason: String,
    },

    PlayerInput {
        sequence_id: u32,
        actions: u8,
    },

    RoomListRequest,
    RoomListResponse {
        rooms: Vec<RoomSummary>,
    },
    RoomCreate {
        room_name: String,
        max_players: u32,
    },
    RoomJoin {
        room_id: String,
    },
    RoomLeave,
    RoomStart,

    Chat {
        text: String,
    },

    AuthRegister {
        username: String,
        password: String,
        email: Option<String>,
    },
    AuthLogin {
        username: String,
        password: String,
    },
    AuthResult {
        success: bool,
        token: Option<String>,
        message: String,
    },

    GamerulePacket {
        gamerules: Vec<GameruleEntry>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomSummary {
    pub room_id: String,
    pub room_name: String,
    pub player_count: u32,
    pub max_players: u32,
}

fn write_optional_string(buf: &mut BytesMut, value: &Option<String>) {
    match value {
        Some(s) => {
            buf.put_u8(1);
            write_string(buf, s);
        }
        None => buf.put_u8(0),
    }
}

fn read_optional_string(buf: &mut BytesMut) -> CodecResult<Option<String>> {
    match read_u8(buf)? {
        0 => Ok(None),
        _ => Ok(Some(read_string(buf)?)),
    }
}

fn write_entity_state(buf: &mut BytesMut, e: &EntityState) {
    buf.put_u32_le(e.entity_id);
    buf.put_u16_le(e.entity_type);
    buf.put_f32_le(e.position.0);
    buf.put_f32_le(e.position.1);
    buf.put_i32_le(e.health);
    buf.put_u32_le(e.last_processed_input);
}

fn read_entity_state(buf: &mut BytesMut) -> CodecResult<EntityState> {
    Ok(EntityState {
        entity_id: read_u32(buf)?,
        entity_type: read_u16(buf)?,
        position: (read_f32(buf)?, read_f32(buf)?),
        health: read_u32(buf)? as i32,
        last_processed_input: read_u32(buf)?,
    })
}

/// Encode a `Message` into its payload bytes (the frame header is written by
/// the caller, see [`crate::connection`]).
pub fn encode(message: &Message) -> BytesMut {
    let mut buf = BytesMut::new();
    match message {
        Message::HandshakeRequest {
            client_version,
            player_name,
            timestamp,
        } => {
            buf.put_u32_le(*client_version);
            write_string(&mut buf, player_name);
            buf.put_i64_le(*timestamp);
        }
        Message::HandshakeResponse {
            accepted,
            session_id,
            server_id,
            message,
            server_version,
        } => {
            buf.put_u8(*accepted as u8);
            buf.put_u64_le(*session_id);
            write_string(&mut buf, server_id);
            write_string(&mut buf, message);
            buf.put_u32_le(*server_version);
        }
        Message::Disconnect { reason } => write_string(&mut buf, reason),
        Message::Kick { reason } => write_string(&mut buf, reason),
        Message::Ping { timestamp, seq } => {
            buf.put_i64_le(*timestamp);
            buf.put_u32_le(*seq);
        }
        Message::Pong {
            client_ts,
            server_ts,
            seq,
        } => {
            buf.put_i64_le(*client_ts);
            buf.put_i64_le(*server_ts);
            buf.put_u32_le(*seq);
        }
        Message::GameState {
            server_tick,
            entities,
        } => {
            buf.put_u32_le(*server_tick);
            buf.put_u32_le(entities.len() as u32);
            for e in entities {
                write_entity_state(&mut buf, e);
            }
        }
        Message::EntityDestroyed { entity_id, reason } => {
            buf.put_u32_le(*entity_id);
            buf.put_u8(reason.to_wire());
        }
        Message::GameStart {
            your_entity_id,
            initial_state_tick,
            initial_entities,
        } => {
            buf.put_u32_le(*your_entity_id);
            buf.put_u32_le(*initial_state_tick);
            buf.put_u32_le(initial_entities.len() as u32);
            for e in initial_entities {
                write_entity_state(&mut buf, e);
            }
        }
        Message::GameOver { reason } => write_string(&mut buf, reason),
        Message::PlayerInput {
            sequence_id,
            actions,
        } => {
            buf.put_u32_le(*sequence_id);
            buf.put_u8(*actions);
        }
        Message::RoomListRequest => {}
        Message::RoomListResponse { rooms } => {
            buf.put_u32_le(rooms.len() as u32);
            for r in rooms {
                write_string(&mut buf, &r.room_id);
                write_string(&mut buf, &r.room_name);
                buf.put_u32_le(r.player_count);
                buf.put_u32_le(r.max_players);
            }
        }
        Message::RoomCreate {
            room_name,
            max_players,
        } => {
            write_string(&mut buf, room_name);
            buf.put_u32_le(*max_players);
        }
        Message::RoomJoin { room_id } => write_string(&mut buf, room_id),
        Message::RoomLeave => {}
        Message::RoomStart => {}
        Message::Chat { text } => write_string(&mut buf, text),
        Message::AuthRegister {
            username,
            password,
            email,
        } => {
            write_string(&mut buf, username);
            write_string(&mut buf, password);
            write_optional_string(&mut buf, email);
        }
        Message::AuthLogin { username, password } => {
            write_string(&mut buf, username);
            write_string(&mut buf, password);
        }
        Message::AuthResult {
            success,
            token,
            message,
        } => {
            buf.put_u8(*success as u8);
            write_optional_string(&mut buf, token);
            write_string(&mut buf, message);
        }
        Message::GamerulePacket { gamerules } => {
            buf.put_u32_le(gamerules.len() as u32);
            for g in gamerules {
                write_string(&mut buf, &g.key);
                buf.put_f32_le(g.value);
            }
        }
    }
    buf
}

/// Decode a payload given its frame `message_type`, dispatching to the
/// matching variant. Unknown types are a hard decode error — the connection
/// layer kicks the peer with a protocol-violation reason.
pub fn decode(message_type: u16, mut buf: BytesMut) -> CodecResult<Message> {
    let msg = match message_type {
        HANDSHAKE_REQUEST => Message::HandshakeRequest {
            client_version: read_u32(&mut buf)?,
            player_name: read_string(&mut buf)?,
            timestamp: read_i64(&mut buf)?,
        },
        HANDSHAKE_RESPONSE => Message::HandshakeResponse {
            accepted: read_u8(&mut buf)? != 0,
            session_id: {
                if buf.len() < 8 {
                    return Err(CodecError::NotEnoughData);
                }
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&buf.split_to(8));
                u64::from_le_bytes(bytes)
            },
            server_id: read_string(&mut buf)?,
            message: read_string(&mut buf)?,
            server_version: read_u32(&mut buf)?,
        },
        DISCONNECT => Message::Disconnect {
            reason: read_string(&mut buf)?,
        },
        KICK => Message::Kick {
            reason: read_string(&mut buf)?,
        },
        PING => Message::Ping {
            timestamp: read_i64(&mut buf)?,
            seq: read_u32(&mut buf)?,
        },
        PONG => Message::Pong {
            client_ts: read_i64(&mut buf)?,
            server_ts: read_i64(&mut buf)?,
            seq: read_u32(&mut buf)?,
        },
        GAME_STATE => {
            let server_tick = read_u32(&mut buf)?;
            let count = read_u32(&mut buf)?;
            let mut entities = Vec::with_capacity(count as usize);
            for _ in 0..count {
                entities.push(read_entity_state(&mut buf)?);
            }
            Message::GameState {
                server_tick,
                entities,
            }
        }
        ENTITY_DESTROYED => Message::EntityDestroyed {
            entity_id: read_u32(&mut buf)?,
            reason: DestroyReason::from_wire(read_u8(&mut buf)?)?,
        },
        GAME_START => {
            let your_entity_id = read_u32(&mut buf)?;
            let initial_state_tick = read_u32(&mut buf)?;
            let count = read_u32(&mut buf)?;
            let mut initial_entities = Vec::with_capacity(count as usize);
            for _ in 0..count {
                initial_entities.push(read_entity_state(&mut buf)?);
            }
            Message::GameStart {
                your_entity_id,
                initial_state_tick,
                initial_entities,
            }
        }
        GAME_OVER => Message::GameOver {
            reason: read_string(&mut buf)?,
        },
        PLAYER_INPUT => Message::PlayerInput {
            sequence_id: read_u32(&mut buf)?,
            actions: read_u8(&mut buf)?,
        },
        ROOM_LIST_REQUEST => Message::RoomListRequest,
        ROOM_LIST_RESPONSE => {
            let count = read_u32(&mut buf)?;
            let mut rooms = Vec::with_capacity(count as usize);
            for _ in 0..count {
                rooms.push(RoomSummary {
                    room_id: read_string(&mut buf)?,
                    room_name: read_string(&mut buf)?,
                    player_count: read_u32(&mut buf)?,
                    max_players: read_u32(&mut buf)?,
                });
            }
            Message::RoomListResponse { rooms }
        }
        ROOM_CREATE => Message::RoomCreate {
            room_name: read_string(&mut buf)?,
            max_players: read_u32(&mut buf)?,
        },
        ROOM_JOIN => Message::RoomJoin {
            room_id: read_string(&mut buf)?,
        },
        ROOM_LEAVE => Message::RoomLeave,
        ROOM_START => Message::RoomStart,
        CHAT_MESSAGE => Message::Chat {
            text: read_string(&mut buf)?,
        },
        AUTH_REGISTER => Message::AuthRegister {
            username: read_string(&mut buf)?,
            password: read_string(&mut buf)?,
            email: read_optional_string(&mut buf)?,
        },
        AUTH_LOGIN => Message::AuthLogin {
            username: read_string(&mut buf)?,
            password: read_string(&mut buf)?,
        },
        AUTH_RESULT => Message::AuthResult {
            success: read_u8(&mut buf)? != 0,
            token: read_optional_string(&mut buf)?,
            message: read_string(&mut buf)?,
        },
        GAMERULE_PACKET => {
            let count = read_u32(&mut buf)?;
            let mut gamerules = Vec::with_capacity(count as usize);
            for _ in 0..count {
                gamerules.push(GameruleEntry {
                    key: read_string(&mut buf)?,
                    value: read_f32(&mut buf)?,
                });
            }
            Message::GamerulePacket { gamerules }
        }
        other => return Err(CodecError::UnknownMessageType(other)),
    };
    Ok(msg)
}

/// The wire `message_type` a given `Message` encodes to. Used by the
/// connection layer to build the frame header.
pub fn message_type_of(message: &Message) -> u16 {
    match message {
        Message::HandshakeRequest { .. } => HANDSHAKE_REQUEST,
        Message::HandshakeResponse { .. } => HANDSHAKE_RESPONSE,
        Message::Disconnect { .. } => DISCONNECT,
        Message::Kick { .. } => KICK,
        Message::Ping { .. } => PING,
        Message::Pong { .. } => PONG,
        Message::GameState { .. } => GAME_STATE,
        Message::EntityDestroyed { .. } => ENTITY_DESTROYED,
        Message::GameStart { .. } => GAME_START,
        Message::GameOver { .. } => GAME_OVER,
        Message::PlayerInput { .. } => PLAYER_INPUT,
        Message::RoomListRequest => ROOM_LIST_REQUEST,
        Message::RoomListResponse { .. } => ROOM_LIST_RESPONSE,
        Message::RoomCreate { .. } => ROOM_CREATE,
        Message::RoomJoin { .. } => ROOM_JOIN,
        Message::RoomLeave => ROOM_LEAVE,
        Message::RoomStart => ROOM_START,
        Message::Chat { .. } => CHAT_MESSAGE,
        Message::AuthRegister { .. } => AUTH_REGISTER,
        Message::AuthLogin { .. } => AUTH_LOGIN,
        Message::AuthResult { .. } => AUTH_RESULT,
        Message::GamerulePacket { .. } => GAMERULE_PACKET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(message: Message) {
        let message_type = message_type_of(&message);
        let payload = encode(&message);
        let decoded = decode(message_type, payload).expect("decode must succeed");
        assert_eq!(decoded, message);
    }

    #[test]
    fn handshake_request_roundtrips() {
        roundtrip(Message::HandshakeRequest {
            client_version: 3,
            player_name: "nova".into(),
            timestamp: 1_700_000_000,
        });
    }

    #[test]
    fn game_state_with_entities_roundtrips() {
        roundtrip(Message::GameState {
            server_tick: 42,
            entities: vec![
                EntityState {
                    entity_id: 1,
                    entity_type: 10,
                    position: (100.0, 200.0),
                    health: 80,
                    last_processed_input: 7,
                },
                EntityState {
                    entity_id: 2,
                    entity_type: 20,
                    position: (-5.5, 0.0),
                    health: -1,
                    last_processed_input: 0,
                },
            ],
        });
    }

    #[test]
    fn entity_destroyed_roundtrips_every_reason() {
        for reason in [
            DestroyReason::KilledByPlayer,
            DestroyReason::OutOfBounds,
            DestroyReason::Collision,
            DestroyReason::Expired,
        ] {
            roundtrip(Message::EntityDestroyed {
                entity_id: 9,
                reason,
            });
        }
    }

    #[test]
    fn player_input_actions_are_a_bitmask() {
        let actions = input_action::MOVE_LEFT | input_action::SHOOT;
        roundtrip(Message::PlayerInput {
            sequence_id: 5,
            actions,
        });
    }

    #[test]
    fn auth_register_with_no_email_roundtrips() {
        roundtrip(Message::AuthRegister {
            username: "pilot".into(),
            password: "hunter2".into(),
            email: None,
        });
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let buf = BytesMut::new();
        assert!(matches!(
            decode(0xBEEF, buf),
            Err(CodecError::UnknownMessageType(0xBEEF))
        ));
    }
}
