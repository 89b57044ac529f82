use apiengine_core::Timestamp;
use apiengine_ports::Clock;
use chrono::{Duration, Utc};
use parking_lot::RwLock;

/// Clock that only moves when told to
///
/// Used wherever behaviour depends on time windows (rate-limit resets,
/// request signing) and a test needs to control exactly when they elapse.
pub struct ManualClock {
    current: RwLock<Timestamp>,
}

impl ManualClock {
    /// Frozen at the current wall time
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Frozen at the given instant
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    /// Move time forward (or backward, with a negative duration)
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.write();
        *current += by;
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: Timestamp) {
        *self.current.write() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read()
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}
