//! Time-ordered queue of scheduled respawns, drained once per tick

use std::collections::VecDeque;

use super::entity::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledRespawn {
    pub player_id: ConnectionId,
    /// Game time (seconds) at which the respawn becomes due
    pub due_at: f64,
}

/// Pending respawns sorted by due time. Entries scheduled for the same
/// instant keep their insertion order.
#[derive(Debug, Default)]
pub struct RespawnQueue {
    entries: VecDeque<ScheduledRespawn>,
}

impl RespawnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a respawn, replacing any pending one for the same player
    pub fn schedule(&mut self, player_id: ConnectionId, due_at: f64) {
        self.cancel(player_id);
        let idx = self.entries.partition_point(|e| e.due_at <= due_at);
        self.entries.insert(idx, ScheduledRespawn { player_id, due_at });
    }

    /// Drop a pending respawn. Returns true if one was queued.
    pub fn cancel(&mut self, player_id: ConnectionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.player_id != player_id);
        self.entries.len() != before
    }

    /// Remove and return every respawn due at or before `now`
    pub fn drain_due(&mut self, now: f64) -> Vec<ConnectionId> {
        let mut due = Vec::new();
        while let Some(front) = self.entries.front() {
            if front.due_at > now {
                break;
            }
            if let Some(entry) = self.entries.pop_front() {
                due.push(entry.player_id);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn drains_in_due_order() {
        let mut queue = RespawnQueue::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        queue.schedule(a, 5.0);
        queue.schedule(b, 2.0);
        queue.schedule(c, 3.0);

        assert!(queue.drain_due(1.9).is_empty());
        assert_eq!(queue.drain_due(3.0), vec![b, c]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_due(10.0), vec![a]);
        assert!(queue.is_empty());
    }

    #[test]
    fn rescheduling_replaces_the_old_entry() {
        let mut queue = RespawnQueue::new();
        let id = Uuid::new_v4();
        queue.schedule(id, 1.0);
        queue.schedule(id, 4.0);

        assert_eq!(queue.len(), 1);
        assert!(queue.drain_due(2.0).is_empty());
        assert_eq!(queue.drain_due(4.0), vec![id]);
    }

    #[test]
    fn cancelled_entries_never_fire() {
        let mut queue = RespawnQueue::new();
        let id = Uuid::new_v4();
        queue.schedule(id, 1.0);

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(queue.is_empty());
        assert!(queue.drain_due(100.0).is_empty());
    }
}
