//! The matchmaking queue: bundles waiting players into new rooms once a
//! threshold is reached. Grounded on
//! `original_source/server/Rooms/Matchmaking/MatchmakingService.cpp`'s
//! `_waitingPlayers`/`tryCreateMatch` loop, generalized from its fixed
//! `PLAYERS_PER_MATCH = 4` to the spec's configurable min/max.

use std::time::Instant;

use rtype_types::PlayerId;

#[derive(Debug, Clone, Copy)]
struct QueuedPlayer {
    player_id: PlayerId,
    enqueued_at: Instant,
}

/// A batch of players pulled off the queue, ready to become a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchBatch {
    pub players: Vec<PlayerId>,
}

/// FIFO queue of players waiting for an automatic match.
pub struct MatchmakingService {
    min_players: usize,
    max_players: usize,
    queue: Vec<QueuedPlayer>,
    total_matches_created: u64,
}

impl MatchmakingService {
    pub fn new(min_players: usize, max_players: usize) -> Self {
        let min_players = min_players.max(1);
        let max_players = max_players.max(min_players);
        Self {
            min_players,
            max_players,
            queue: Vec::new(),
            total_matches_created: 0,
        }
    }

    /// `MatchmakingService.addPlayer`: a no-op (not an error) if already queued.
    pub fn add_player(&mut self, player_id: PlayerId) {
        if self.queue.iter().any(|q| q.player_id == player_id) {
            tracing::warn!(?player_id, "player already in matchmaking queue");
            return;
        }
        self.queue.push(QueuedPlayer {
            player_id,
            enqueued_at: Instant::now(),
        });
    }

    /// `MatchmakingService.removePlayer`: returns whether the player was queued.
    pub fn remove_player(&mut self, player_id: PlayerId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|q| q.player_id != player_id);
        self.queue.len() != before
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn waiting_players(&self) -> Vec<PlayerId> {
        self.queue.iter().map(|q| q.player_id).collect()
    }

    /// `MatchmakingService.tick()`: while the queue holds at least
    /// `min_players`, peel off `min(queue.len(), max_players)` of the oldest
    /// waiters (FIFO, matching the original's front-of-vector extraction)
    /// into a new batch. Returns every batch formed this tick; the caller
    /// (`Lobby`) turns each into an actual `Room` with a generated id.
    pub fn tick(&mut self) -> Vec<MatchBatch> {
        let mut batches = Vec::new();
        while self.queue.len() >= self.min_players {
            let batch_size = self.queue.len().min(self.max_players);
            let batch: Vec<PlayerId> = self
                .queue
                .drain(0..batch_size)
                .map(|q| q.player_id)
                .collect();
            self.total_matches_created += 1;
            batches.push(MatchBatch { players: batch });
        }
        batches
    }

    pub fn total_matches_created(&self) -> u64 {
        self.total_matches_created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> PlayerId {
        PlayerId(n)
    }

    #[test]
    fn tick_bundles_the_oldest_min_players_into_a_room() {
        let mut mm = MatchmakingService::new(2, 4);
        for i in 1..=5 {
            mm.add_player(pid(i));
        }
        let batches = mm.tick();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].players, vec![pid(1), pid(2), pid(3), pid(4)]);
        assert_eq!(mm.queue_len(), 1);
        assert_eq!(mm.waiting_players(), vec![pid(5)]);
    }

    #[test]
    fn tick_does_nothing_below_the_minimum() {
        let mut mm = MatchmakingService::new(2, 4);
        mm.add_player(pid(1));
        assert!(mm.tick().is_empty());
        assert_eq!(mm.queue_len(), 1);
    }

    #[test]
    fn remove_player_reports_whether_it_was_queued() {
        let mut mm = MatchmakingService::new(1, 4);
        mm.add_player(pid(1));
        assert!(mm.remove_player(pid(1)));
        assert!(!mm.remove_player(pid(1)));
    }

    #[test]
    fn adding_an_already_queued_player_is_a_no_op() {
        let mut mm = MatchmakingService::new(1, 4);
        mm.add_player(pid(1));
        mm.add_player(pid(1));
        assert_eq!(mm.queue_len(), 1);
    }
}
