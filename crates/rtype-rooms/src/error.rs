use rtype_types::PlayerId;

/// Rejections from room/lobby/matchmaking operations. Every variant carries
/// enough to build the textual `reason` the spec requires on every rejection
/// (spec.md §7, `InvalidState`/`CapacityExceeded`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room is full ({0}/{0})")]
    RoomFull(u32),
    #[error("room is not accepting joins in its current state")]
    NotJoinable,
    #[error("only the host can perform this action")]
    NotHost,
    #[error("player {0} is already in this room")]
    AlreadyInRoom(PlayerId),
    #[error("player {0} is not in this room")]
    NotInRoom(PlayerId),
    #[error("the host cannot be kicked")]
    CannotKickHost,
    #[error("the room is not in the expected state for this transition")]
    InvalidState,
    #[error("room '{0}' was not found")]
    RoomNotFound(String),
    #[error("room '{0}' already exists")]
    RoomAlreadyExists(String),
}

pub type RoomResult<T> = Result<T, RoomError>;
