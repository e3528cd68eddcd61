//! The room state machine: `WAITING -> STARTING -> IN_PROGRESS -> FINISHED`
//! (spec.md §3.3/§4.4). Grounded on the shape of
//! `original_source/server/Rooms/Room.hpp`/`IRoom.hpp` (a room is an id plus
//! a player list with join/leave), generalized to the richer state machine,
//! host/spectator policy, and kick/start operations the spec calls for. The
//! original's join/leave took only a player id with no result; every
//! operation here instead returns a typed outcome or `RoomError` so the
//! caller can build the spec's required textual rejection reason.

use std::time::Duration;

use rtype_types::PlayerId;

use crate::error::{RoomError, RoomResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Waiting,
    Starting,
    InProgress,
    Finished,
}

/// Whether a successful `join` landed the caller as a player or, because the
/// room was already in progress and policy allows it, as a spectator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Player,
    Spectator,
}

/// What changed as a result of a `leave`, so the caller (the session/network
/// layer) knows whether to broadcast a host-promotion notice or tear the
/// room down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveEffect {
    pub new_host: Option<PlayerId>,
    pub room_is_empty: bool,
}

/// Grace period between `STARTING` and `IN_PROGRESS` (spec.md §4.4:
/// "after a short grace period transitions to IN_PROGRESS"). The timer
/// itself is driven by `rtype-server`; this is just the duration it waits.
pub const START_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// A self-contained simulation instance's lobby-facing metadata: its player
/// set, its host, and its state machine. Does not own the ECS registry or
/// the game loop task — `rtype-server` keeps those in a side table keyed by
/// `room_id`, since this crate has no business depending on `rtype-ecs` or
/// `tokio`.
#[derive(Debug, Clone)]
pub struct Room {
    pub room_id: String,
    pub name: String,
    pub state: RoomState,
    pub host: PlayerId,
    pub max_players: u32,
    pub is_private: bool,
    /// Clamped to `[0.25, 1.0]` per spec.md §4.3.
    pub game_speed_multiplier: f32,
    /// Join order; index 0 is the original host unless promotion has occurred.
    players: Vec<PlayerId>,
    spectators: Vec<PlayerId>,
}

impl Room {
    pub fn new(room_id: impl Into<String>, name: impl Into<String>, host: PlayerId, max_players: u32, is_private: bool) -> Self {
        Self {
            room_id: room_id.into(),
            name: name.into(),
            state: RoomState::Waiting,
            host,
            max_players,
            is_private,
            game_speed_multiplier: 1.0,
            players: vec![host],
            spectators: Vec::new(),
        }
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn spectators(&self) -> &[PlayerId] {
        &self.spectators
    }

    pub fn is_full(&self) -> bool {
        self.players.len() as u32 >= self.max_players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.spectators.is_empty()
    }

    pub fn contains_player(&self, player_id: PlayerId) -> bool {
        self.players.contains(&player_id)
    }

    /// `Room.join(playerId)`: fails outside `WAITING`/`IN_PROGRESS`, or if the
    /// player roster is full and the room isn't accepting spectators. A room
    /// already `IN_PROGRESS` places joiners as spectators rather than
    /// rejecting them outright.
    pub fn join(&mut self, player_id: PlayerId) -> RoomResult<JoinOutcome> {
        if self.players.contains(&player_id) || self.spectators.contains(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id));
        }
        match self.state {
            RoomState::Waiting => {
                if self.is_full() {
                    return Err(RoomError::RoomFull(self.max_players));
                }
                self.players.push(player_id);
                Ok(JoinOutcome::Player)
            }
            RoomState::InProgress => {
                self.spectators.push(player_id);
                Ok(JoinOutcome::Spectator)
            }
            RoomState::Starting | RoomState::Finished => Err(RoomError::NotJoinable),
        }
    }

    /// `Room.leave(playerId)`: removes from whichever roster holds them,
    /// promoting the next player in join order if the host left and players
    /// remain.
    pub fn leave(&mut self, player_id: PlayerId) -> LeaveEffect {
        let was_host = self.host == player_id;
        self.players.retain(|&p| p != player_id);
        self.spectators.retain(|&p| p != player_id);

        let new_host = if was_host && !self.players.is_empty() {
            self.host = self.players[0];
            Some(self.host)
        } else {
            None
        };

        LeaveEffect {
            new_host,
            room_is_empty: self.is_empty(),
        }
    }

    /// `Room.kick(hostId, targetId)`: only the host may kick, only a current
    /// player (not a spectator) can be the target, and the host can't kick
    /// itself.
    pub fn kick(&mut self, host_id: PlayerId, target_id: PlayerId) -> RoomResult<()> {
        if host_id != self.host {
            return Err(RoomError::NotHost);
        }
        if target_id == self.host {
            return Err(RoomError::CannotKickHost);
        }
        if !self.players.contains(&target_id) {
            return Err(RoomError::NotInRoom(target_id));
        }
        self.players.retain(|&p| p != target_id);
        Ok(())
    }

    /// `Room.startGame(hostId)`: `WAITING -> STARTING`, gated on caller being
    /// host and at least one player present. Actually entering `IN_PROGRESS`
    /// is a separate call (`begin_play`) fired after `START_GRACE_PERIOD`.
    pub fn start_game(&mut self, host_id: PlayerId) -> RoomResult<()> {
        if host_id != self.host {
            return Err(RoomError::NotHost);
        }
        if self.state != RoomState::Waiting {
            return Err(RoomError::InvalidState);
        }
        if self.players.is_empty() {
            return Err(RoomError::InvalidState);
        }
        self.state = RoomState::Starting;
        Ok(())
    }

    /// `STARTING -> IN_PROGRESS`, called once the grace period elapses.
    pub fn begin_play(&mut self) -> RoomResult<()> {
        if self.state != RoomState::Starting {
            return Err(RoomError::InvalidState);
        }
        self.state = RoomState::InProgress;
        Ok(())
    }

    /// Ends the room regardless of its current state (normal completion,
    /// shutdown, or `InternalError` per spec.md §7's `Fatal` policy).
    pub fn finish(&mut self) {
        self.state = RoomState::Finished;
    }

    pub fn set_game_speed_multiplier(&mut self, multiplier: f32) {
        self.game_speed_multiplier = multiplier.clamp(0.25, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> PlayerId {
        PlayerId(n)
    }

    #[test]
    fn join_fills_player_roster_then_rejects_when_full() {
        let mut room = Room::new("custom_1_1", "Test", pid(1), 2, false);
        assert_eq!(room.join(pid(2)).unwrap(), JoinOutcome::Player);
        assert!(matches!(room.join(pid(3)), Err(RoomError::RoomFull(2))));
    }

    #[test]
    fn joining_an_in_progress_room_becomes_a_spectator() {
        let mut room = Room::new("m1", "Test", pid(1), 4, false);
        room.start_game(pid(1)).unwrap();
        room.begin_play().unwrap();
        assert_eq!(room.join(pid(2)).unwrap(), JoinOutcome::Spectator);
        assert!(room.spectators().contains(&pid(2)));
        assert!(!room.players().contains(&pid(2)));
    }

    #[test]
    fn joining_a_starting_room_is_rejected() {
        let mut room = Room::new("m1", "Test", pid(1), 4, false);
        room.start_game(pid(1)).unwrap();
        assert!(matches!(room.join(pid(2)), Err(RoomError::NotJoinable)));
    }

    #[test]
    fn leave_promotes_next_host_in_join_order() {
        let mut room = Room::new("m1", "Test", pid(1), 4, false);
        room.join(pid(2)).unwrap();
        room.join(pid(3)).unwrap();
        let effect = room.leave(pid(1));
        assert_eq!(effect.new_host, Some(pid(2)));
        assert!(!effect.room_is_empty);
        assert_eq!(room.host, pid(2));
    }

    #[test]
    fn leave_by_last_player_marks_room_empty() {
        let mut room = Room::new("m1", "Test", pid(1), 4, false);
        let effect = room.leave(pid(1));
        assert!(effect.room_is_empty);
        assert_eq!(effect.new_host, None);
    }

    #[test]
    fn only_host_can_kick_and_not_itself() {
        let mut room = Room::new("m1", "Test", pid(1), 4, false);
        room.join(pid(2)).unwrap();
        assert!(matches!(room.kick(pid(2), pid(1)), Err(RoomError::NotHost)));
        assert!(matches!(room.kick(pid(1), pid(1)), Err(RoomError::CannotKickHost)));
        room.kick(pid(1), pid(2)).unwrap();
        assert!(!room.contains_player(pid(2)));
    }

    #[test]
    fn only_host_can_start_and_only_from_waiting() {
        let mut room = Room::new("m1", "Test", pid(1), 4, false);
        room.join(pid(2)).unwrap();
        assert!(matches!(room.start_game(pid(2)), Err(RoomError::NotHost)));
        room.start_game(pid(1)).unwrap();
        assert_eq!(room.state, RoomState::Starting);
        assert!(matches!(room.start_game(pid(1)), Err(RoomError::InvalidState)));
    }

    #[test]
    fn game_speed_multiplier_is_clamped() {
        let mut room = Room::new("m1", "Test", pid(1), 4, false);
        room.set_game_speed_multiplier(5.0);
        assert_eq!(room.game_speed_multiplier, 1.0);
        room.set_game_speed_multiplier(0.0);
        assert_eq!(room.game_speed_multiplier, 0.25);
    }
}
