//! The lobby: connected-but-unbound players, the room directory, and the
//! matchmaking queue, wired together the way
//! `original_source/server/Rooms/Lobby/Lobby.hpp` wires a `Lobby` to a
//! `RoomManager` and a `MatchmakingService` — generalized from the
//! original's bare `addPlayer`/`joinRoom` pairs into the richer join/leave/
//! kick/start surface `Room` now exposes, and from its unconditional
//! `createCustomRoom` into one that returns a typed error on collision.

use std::collections::{HashMap, HashSet};

use rtype_types::PlayerId;

use crate::error::{RoomError, RoomResult};
use crate::matchmaking::MatchmakingService;
use crate::room::{JoinOutcome, LeaveEffect, Room, RoomState};

/// Outcome of `Lobby::find_or_queue`: either the player landed in a room
/// immediately, or no room was available and they were placed in the
/// matchmaking queue (spec.md §4.4, `MatchmakingService::findOrCreateMatch`
/// strategy ladder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchmakingPlacement {
    JoinedRoom { room_id: String, outcome: JoinOutcome },
    Queued,
}

pub struct Lobby {
    rooms: HashMap<String, Room>,
    /// Players connected to the server but not bound to any room.
    connected: HashSet<PlayerId>,
    player_room: HashMap<PlayerId, String>,
    matchmaking: MatchmakingService,
    next_custom_room_seq: u64,
    next_match_room_seq: u64,
    /// Open Question resolved in DESIGN.md: defaults to spectate-off. When
    /// `true`, a player who can't find a `WAITING` room may be placed as a
    /// spectator into an `IN_PROGRESS` one instead of queueing.
    pub spectator_fallback: bool,
}

impl Lobby {
    pub fn new(matchmaking_min_players: usize, matchmaking_max_players: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            connected: HashSet::new(),
            player_room: HashMap::new(),
            matchmaking: MatchmakingService::new(matchmaking_min_players, matchmaking_max_players),
            next_custom_room_seq: 1,
            next_match_room_seq: 0,
            spectator_fallback: false,
        }
    }

    pub fn connect(&mut self, player_id: PlayerId) {
        self.connected.insert(player_id);
    }

    /// Removes the player from the lobby entirely: their room (if any) and
    /// the matchmaking queue (if enqueued).
    pub fn disconnect(&mut self, player_id: PlayerId) -> Option<(String, LeaveEffect)> {
        self.connected.remove(&player_id);
        self.matchmaking.remove_player(player_id);
        self.leave_current_room(player_id)
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn remove_room(&mut self, room_id: &str) -> Option<Room> {
        self.rooms.remove(room_id)
    }

    /// Every non-private room; used to answer a `RoomListRequest`.
    pub fn public_rooms(&self) -> Vec<&Room> {
        let mut rooms: Vec<&Room> = self.rooms.values().filter(|r| !r.is_private).collect();
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        rooms
    }

    /// `Lobby.createCustomRoom`: `custom_<hostPlayerId>_<monotonic>`, which
    /// is unique by construction (spec.md §4.4) so collision is not a
    /// reachable error path here.
    pub fn create_custom_room(
        &mut self,
        host: PlayerId,
        name: impl Into<String>,
        max_players: u32,
        is_private: bool,
    ) -> String {
        let seq = self.next_custom_room_seq;
        self.next_custom_room_seq += 1;
        let room_id = format!("custom_{host}_{seq}");
        let room = Room::new(room_id.clone(), name, host, max_players, is_private);
        self.connected.remove(&host);
        self.player_room.insert(host, room_id.clone());
        self.rooms.insert(room_id.clone(), room);
        room_id
    }

    pub fn join_room(&mut self, player_id: PlayerId, room_id: &str) -> RoomResult<JoinOutcome> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;
        let outcome = room.join(player_id)?;
        self.connected.remove(&player_id);
        self.player_room.insert(player_id, room_id.to_string());
        Ok(outcome)
    }

    /// Leaves whatever room the player is currently bound to, returning that
    /// room's id and the leave effect. Empty rooms are evicted immediately
    /// (spec.md §3.3: "destroyed ... if it becomes empty").
    pub fn leave_current_room(&mut self, player_id: PlayerId) -> Option<(String, LeaveEffect)> {
        let room_id = self.player_room.remove(&player_id)?;
        let room = self.rooms.get_mut(&room_id)?;
        let effect = room.leave(player_id);
        self.connected.insert(player_id);
        if effect.room_is_empty {
            self.rooms.remove(&room_id);
        }
        Some((room_id, effect))
    }

    pub fn current_room_of(&self, player_id: PlayerId) -> Option<&str> {
        self.player_room.get(&player_id).map(String::as_str)
    }

    pub fn kick(&mut self, host_id: PlayerId, target_id: PlayerId, room_id: &str) -> RoomResult<()> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;
        room.kick(host_id, target_id)?;
        self.player_room.remove(&target_id);
        self.connected.insert(target_id);
        Ok(())
    }

    pub fn start_game(&mut self, host_id: PlayerId, room_id: &str) -> RoomResult<()> {
        self.rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?
            .start_game(host_id)
    }

    pub fn begin_play(&mut self, room_id: &str) -> RoomResult<()> {
        self.rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?
            .begin_play()
    }

    pub fn enqueue_matchmaking(&mut self, player_id: PlayerId) {
        self.matchmaking.add_player(player_id);
    }

    pub fn dequeue_matchmaking(&mut self, player_id: PlayerId) -> bool {
        self.matchmaking.remove_player(player_id)
    }

    pub fn matchmaking_queue_len(&self) -> usize {
        self.matchmaking.queue_len()
    }

    /// `MatchmakingService::findOrCreateMatch`'s strategy ladder: join a
    /// `WAITING` non-full room if one exists; else, if spectator fallback is
    /// enabled, spectate an `IN_PROGRESS` one; else fall through to the
    /// matchmaking queue.
    pub fn find_or_queue(&mut self, player_id: PlayerId) -> MatchmakingPlacement {
        let waiting_room_id = self
            .rooms
            .values()
            .find(|r| r.state == RoomState::Waiting && !r.is_full() && !r.is_private)
            .map(|r| r.room_id.clone());
        if let Some(room_id) = waiting_room_id {
            let outcome = self.join_room(player_id, &room_id).expect("room just matched the filter");
            return MatchmakingPlacement::JoinedRoom { room_id, outcome };
        }

        if self.spectator_fallback {
            let in_progress_room_id = self
                .rooms
                .values()
                .find(|r| r.state == RoomState::InProgress && !r.is_private)
                .map(|r| r.room_id.clone());
            if let Some(room_id) = in_progress_room_id {
                let outcome = self.join_room(player_id, &room_id).expect("room just matched the filter");
                return MatchmakingPlacement::JoinedRoom { room_id, outcome };
            }
        }

        self.enqueue_matchmaking(player_id);
        MatchmakingPlacement::Queued
    }

    /// `MatchmakingService.tick()`: bundles any formed batches into fresh
    /// `match_<n>` rooms, returning their ids for the caller to broadcast
    /// `GameStart` against.
    pub fn run_matchmaking_tick(&mut self) -> Vec<String> {
        let batches = self.matchmaking.tick();
        let mut created = Vec::with_capacity(batches.len());
        for batch in batches {
            let room_id = format!("match_{}", self.next_match_room_seq);
            self.next_match_room_seq += 1;
            let batch_size = batch.players.len() as u32;
            let mut players = batch.players.into_iter();
            let host = players.next().expect("tick() never emits an empty batch");
            let mut room = Room::new(room_id.clone(), format!("Match #{}", self.next_match_room_seq), host, batch_size, false);
            for player in players {
                room.join(player).expect("room was just created with capacity for the whole batch");
            }
            self.player_room.insert(host, room_id.clone());
            for &p in room.players() {
                self.player_room.insert(p, room_id.clone());
                self.connected.remove(&p);
            }
            self.rooms.insert(room_id.clone(), room);
            created.push(room_id);
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> PlayerId {
        PlayerId(n)
    }

    #[test]
    fn create_custom_room_ids_are_deterministic_per_host() {
        let mut lobby = Lobby::new(2, 4);
        let r1 = lobby.create_custom_room(pid(10), "Alpha", 4, false);
        assert_eq!(r1, "custom_10_1");
        lobby.leave_current_room(pid(10));
        let r2 = lobby.create_custom_room(pid(10), "Beta", 4, false);
        assert_eq!(r2, "custom_10_2");
    }

    #[test]
    fn private_rooms_are_excluded_from_the_public_list() {
        let mut lobby = Lobby::new(2, 4);
        lobby.create_custom_room(pid(1), "Public", 4, false);
        lobby.create_custom_room(pid(2), "Private", 4, true);
        let ids: Vec<&str> = lobby.public_rooms().iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(ids, vec!["custom_1_1"]);
    }

    #[test]
    fn join_room_binds_the_player_and_unbinds_from_lobby() {
        let mut lobby = Lobby::new(2, 4);
        lobby.connect(pid(2));
        let room_id = lobby.create_custom_room(pid(1), "Alpha", 4, false);
        lobby.join_room(pid(2), &room_id).unwrap();
        assert_eq!(lobby.current_room_of(pid(2)), Some(room_id.as_str()));
    }

    #[test]
    fn leaving_the_only_room_member_evicts_the_room() {
        let mut lobby = Lobby::new(2, 4);
        let room_id = lobby.create_custom_room(pid(1), "Alpha", 4, false);
        let (left_room, effect) = lobby.leave_current_room(pid(1)).unwrap();
        assert_eq!(left_room, room_id);
        assert!(effect.room_is_empty);
        assert!(lobby.room(&room_id).is_none());
    }

    #[test]
    fn matchmaking_tick_creates_a_deterministic_match_room() {
        let mut lobby = Lobby::new(2, 4);
        for i in 1..=4 {
            lobby.enqueue_matchmaking(pid(i));
        }
        let created = lobby.run_matchmaking_tick();
        assert_eq!(created, vec!["match_0"]);
        let room = lobby.room("match_0").unwrap();
        assert_eq!(room.players().len(), 4);
        assert_eq!(room.max_players, 4);
    }

    #[test]
    fn find_or_queue_prefers_an_existing_waiting_room() {
        let mut lobby = Lobby::new(2, 4);
        let room_id = lobby.create_custom_room(pid(1), "Alpha", 4, false);
        match lobby.find_or_queue(pid(2)) {
            MatchmakingPlacement::JoinedRoom { room_id: joined, outcome } => {
                assert_eq!(joined, room_id);
                assert_eq!(outcome, JoinOutcome::Player);
            }
            other => panic!("expected JoinedRoom, got {other:?}"),
        }
    }

    #[test]
    fn find_or_queue_falls_back_to_the_matchmaking_queue() {
        let mut lobby = Lobby::new(2, 4);
        assert_eq!(lobby.find_or_queue(pid(1)), MatchmakingPlacement::Queued);
        assert_eq!(lobby.matchmaking_queue_len(), 1);
    }

    #[test]
    fn spectator_fallback_is_off_by_default() {
        let mut lobby = Lobby::new(2, 4);
        let room_id = lobby.create_custom_room(pid(1), "Alpha", 4, false);
        lobby.start_game(pid(1), &room_id).unwrap();
        lobby.begin_play(&room_id).unwrap();
        assert_eq!(lobby.find_or_queue(pid(2)), MatchmakingPlacement::Queued);
    }
}
