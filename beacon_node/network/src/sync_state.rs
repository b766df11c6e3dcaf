use crate::metrics;
use parking_lot::RwLock;
use std::time::{Duration, Instant};

/// Tracks whether the node is caught up with its peers, gating whether attestation/block duties
/// and gossip publishing are safe to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No peers, or no information yet about how far ahead they are.
    Pending,
    /// The sync service reports active catch-up, or there aren't yet enough peers to be sure.
    Syncing,
    /// Local head is caught up: enough peers and the sync service reports idle, or the startup
    /// timeout elapsed with at least one peer.
    InSync,
}

impl SyncState {
    fn as_gauge(self) -> i64 {
        match self {
            SyncState::Pending => 0,
            SyncState::Syncing => 1,
            SyncState::InSync => 2,
        }
    }
}

/// Gates the startup-timeout escape hatch: `Pending → InSync` even short of `target_peer_count`,
/// once this much wall time has passed with at least one peer.
pub struct SyncStateTracker {
    state: RwLock<SyncState>,
    target_peer_count: usize,
    startup_timeout: Duration,
    started_at: Instant,
}

impl Default for SyncStateTracker {
    fn default() -> Self {
        Self::new(1, 60)
    }
}

impl SyncStateTracker {
    pub fn new(target_peer_count: usize, timeout_seconds: u64) -> Self {
        Self {
            state: RwLock::new(SyncState::Pending),
            target_peer_count,
            startup_timeout: Duration::from_secs(timeout_seconds),
            started_at: Instant::now(),
        }
    }

    pub fn current_state(&self) -> SyncState {
        *self.state.read()
    }

    pub fn is_in_sync(&self) -> bool {
        self.current_state() == SyncState::InSync
    }

    /// Recomputes sync state from the connected-peer count and the sync service's own
    /// active/idle report. `Pending` only while there are no peers at all; once any peer
    /// connects, the tracker only reports `Syncing`/`InSync` from then on.
    pub fn update(&self, peer_count: usize, sync_service_active: bool) -> SyncState {
        let new_state = if peer_count == 0 {
            SyncState::Pending
        } else if sync_service_active {
            SyncState::Syncing
        } else if peer_count >= self.target_peer_count || self.started_at.elapsed() >= self.startup_timeout
        {
            SyncState::InSync
        } else {
            SyncState::Syncing
        };

        *self.state.write() = new_state;
        metrics::set_gauge(&metrics::SYNC_STATE, new_state.as_gauge());
        new_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_with_no_peers() {
        let tracker = SyncStateTracker::new(3, 60);
        assert_eq!(tracker.update(0, false), SyncState::Pending);
        assert!(!tracker.is_in_sync());
    }

    #[test]
    fn syncing_while_sync_service_active() {
        let tracker = SyncStateTracker::new(3, 60);
        assert_eq!(tracker.update(5, true), SyncState::Syncing);
        assert!(!tracker.is_in_sync());
    }

    #[test]
    fn in_sync_once_target_peer_count_reached() {
        let tracker = SyncStateTracker::new(3, 60);
        assert_eq!(tracker.update(3, false), SyncState::InSync);
        assert!(tracker.is_in_sync());
    }

    #[test]
    fn syncing_below_target_before_timeout() {
        let tracker = SyncStateTracker::new(3, 3600);
        assert_eq!(tracker.update(1, false), SyncState::Syncing);
        assert!(!tracker.is_in_sync());
    }

    #[test]
    fn in_sync_after_startup_timeout_with_any_peers() {
        let tracker = SyncStateTracker::new(3, 0);
        assert_eq!(tracker.update(1, false), SyncState::InSync);
        assert!(tracker.is_in_sync());
    }
}
