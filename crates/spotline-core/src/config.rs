//! Session configuration.

use std::time::Duration;

use spotline_proto::RoomMode;

use crate::{dedup::DEFAULT_DEDUP_CAPACITY, reconnect::RetryConfig};

/// Delay before the post-send history reconciliation fetch.
pub const DEFAULT_RECONCILE_DELAY: Duration = Duration::from_millis(100);

/// Grace between the leave publish and teardown, direct rooms.
pub const DEFAULT_LEAVE_GRACE_DIRECT: Duration = Duration::from_secs(1);

/// Grace between the leave publish and teardown, group rooms.
pub const DEFAULT_LEAVE_GRACE_GROUP: Duration = Duration::from_millis(500);

/// Per-session tunables.
///
/// The two leave-grace knobs stay separate: the direct and group flavors
/// shipped with different waits, and both remain configurable instead of
/// being unified.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the backing service, supplied once at session start and
    /// never re-resolved per call.
    pub base_url: String,

    /// Reconnect policy parameters.
    pub retry: RetryConfig,

    /// Grace between leave publish and teardown for direct rooms.
    pub leave_grace_direct: Duration,

    /// Grace between leave publish and teardown for group rooms.
    pub leave_grace_group: Duration,

    /// Delay before the post-send reconciliation fetch.
    pub reconcile_delay: Duration,

    /// Dedup cache bound.
    pub dedup_capacity: usize,
}

impl SessionConfig {
    /// Defaults against one service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            retry: RetryConfig::default(),
            leave_grace_direct: DEFAULT_LEAVE_GRACE_DIRECT,
            leave_grace_group: DEFAULT_LEAVE_GRACE_GROUP,
            reconcile_delay: DEFAULT_RECONCILE_DELAY,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }

    /// Leave grace for a room flavor.
    pub fn leave_grace(&self, mode: RoomMode) -> Duration {
        match mode {
            RoomMode::Direct => self.leave_grace_direct,
            RoomMode::Group => self.leave_grace_group,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn leave_grace_is_per_mode() {
        let config = SessionConfig::default();
        assert_eq!(config.leave_grace(RoomMode::Direct), DEFAULT_LEAVE_GRACE_DIRECT);
        assert_eq!(config.leave_grace(RoomMode::Group), DEFAULT_LEAVE_GRACE_GROUP);
    }

    #[test]
    fn defaults_match_shipped_timings() {
        let config = SessionConfig::default();
        assert_eq!(config.reconcile_delay, Duration::from_millis(100));
        assert_eq!(config.leave_grace_direct, Duration::from_secs(1));
        assert_eq!(config.leave_grace_group, Duration::from_millis(500));
        assert_eq!(config.retry.max_retries, 3);
    }
}
