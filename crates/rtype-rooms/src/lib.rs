//! Room state machine, lobby directory, and matchmaking queue (spec.md
//! §3.3/§4.4). Deliberately has no dependency on `rtype-ecs` or `tokio`:
//! a `Room` here is lobby-facing metadata only, while `rtype-server` keeps
//! the matching ECS `Registry` and game-loop task in a side table keyed by
//! `room_id`.

pub mod error;
pub mod lobby;
pub mod matchmaking;
pub mod room;
pub mod session;

pub use error::{RoomError, RoomResult};
pub use lobby::{Lobby, MatchmakingPlacement};
pub use matchmaking::{MatchBatch, MatchmakingService};
pub use room::{JoinOutcome, LeaveEffect, Room, RoomState, START_GRACE_PERIOD};
pub use session::Session;
