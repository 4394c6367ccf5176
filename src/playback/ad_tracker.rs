//! Per-channel "last on-tune ad played" bookkeeping.
//!
//! Shared across sessions and process restarts (the host persists a
//! snapshot). Writes are last-write-wins with no cross-session lock: a race
//! only affects ad-frequency heuristics, never correctness.

use std::sync::Arc;

use dashmap::DashMap;

/// Cross-session table of when each channel last played its on-tune ad.
#[derive(Clone, Default)]
pub struct ChannelAdTracker {
    last_played: Arc<DashMap<i64, i64>>,
}

impl ChannelAdTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted snapshot.
    pub fn hydrate(entries: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let tracker = Self::new();
        for (channel_id, at_ms) in entries {
            tracker.last_played.insert(channel_id, at_ms);
        }
        tracker
    }

    /// Dump the table for persistence.
    pub fn snapshot(&self) -> Vec<(i64, i64)> {
        self.last_played
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    pub fn last_played_ms(&self, channel_id: i64) -> Option<i64> {
        self.last_played.get(&channel_id).map(|v| *v)
    }

    pub fn record_played(&self, channel_id: i64, at_ms: i64) {
        self.last_played.insert(channel_id, at_ms);
    }

    /// Whether the channel's on-tune ad is due again at `now_ms`.
    pub fn due(&self, channel_id: i64, now_ms: i64, min_interval_ms: i64) -> bool {
        match self.last_played_ms(channel_id) {
            Some(last) => now_ms - last >= min_interval_ms,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_channel_is_due() {
        let tracker = ChannelAdTracker::new();
        assert!(tracker.due(1, 0, 300_000));
    }

    #[test]
    fn recently_played_channel_is_not_due() {
        let tracker = ChannelAdTracker::new();
        tracker.record_played(1, 1_000_000);
        assert!(!tracker.due(1, 1_200_000, 300_000));
        assert!(tracker.due(1, 1_300_000, 300_000));
    }

    #[test]
    fn snapshot_round_trips() {
        let tracker = ChannelAdTracker::new();
        tracker.record_played(1, 50);
        tracker.record_played(2, 75);

        let restored = ChannelAdTracker::hydrate(tracker.snapshot());
        assert_eq!(restored.last_played_ms(1), Some(50));
        assert_eq!(restored.last_played_ms(2), Some(75));
    }
}
