//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration applied to every room an instance spawns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Debounce window for occupancy broadcasts. Rapid membership
    /// churn (a reconnect is a leave immediately followed by a join)
    /// coalesces into a single `room-occupancy` event at most this
    /// long after the first change. Zero broadcasts immediately.
    pub occupancy_debounce: Duration,

    /// Maximum number of *distinct* pending admission requests per
    /// room. Resubmissions of an already-pending guest always succeed;
    /// requests for new guest ids beyond the cap are dropped. Bounds
    /// memory against a flood of fabricated guest ids.
    pub max_pending: usize,

    /// Command channel size for room actors. If the channel fills up,
    /// senders wait (bounded channel).
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            occupancy_debounce: Duration::from_millis(200),
            max_pending: 64,
            channel_size: 64,
        }
    }
}
