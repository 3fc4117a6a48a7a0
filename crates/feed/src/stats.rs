//! Running counters for a feed session.

use chrono::{DateTime, Utc};

/// Statistics for a running streaming client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedStats {
    /// Text or binary frames received
    pub frames_received: u64,
    /// Snapshots that passed validation and were handed to the dispatcher
    pub snapshots_dispatched: u64,
    /// Frames dropped because they failed validation
    pub validation_failures: u64,
    /// Subscriber deliveries dropped because a queue was full
    pub deliveries_dropped: u64,
    /// Successful reconnections after a transport failure
    pub reconnections: u32,
    /// Time the last snapshot was dispatched
    pub last_snapshot_time: Option<DateTime<Utc>>,
}

impl FeedStats {
    /// Increments the frame count.
    pub fn frame_received(&mut self) {
        self.frames_received += 1;
    }

    /// Records a dispatched snapshot and any deliveries it dropped.
    pub fn snapshot_dispatched(&mut self, dropped: usize) {
        self.snapshots_dispatched += 1;
        self.deliveries_dropped += dropped as u64;
        self.last_snapshot_time = Some(Utc::now());
    }

    /// Increments the validation failure count.
    pub fn validation_failed(&mut self) {
        self.validation_failures += 1;
    }

    /// Increments the reconnection count.
    pub fn reconnected(&mut self) {
        self.reconnections += 1;
    }
}
