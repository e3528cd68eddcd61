pub mod codec;
pub mod connection;
pub mod packets;
pub mod state;

pub use codec::{CodecError, CodecResult, MAX_FRAME_LEN, MAX_STRING_LEN};
pub use connection::{Connection, ConnectionReader, ConnectionWriter};
pub use packets::{decode, encode, message_type_of, DestroyReason, EntityState, GameruleEntry, Message, RoomSummary};
pub use state::ConnectionState;
