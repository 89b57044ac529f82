use apiengine_core::Timestamp;
use apiengine_ports::Clock;
use chrono::Duration;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Clock corrected by the measured offset to the exchange's clock
///
/// Signed requests are checked against the server's time, so the local
/// clock is shifted by the offset measured at the last time sync.
pub struct OffsetClock {
    /// Underlying local clock
    local: Arc<dyn Clock>,
    /// Server time minus local time, in milliseconds
    offset_ms: AtomicI64,
    name: String,
}

impl OffsetClock {
    pub fn new(local: Arc<dyn Clock>, name: impl Into<String>) -> Self {
        Self {
            local,
            offset_ms: AtomicI64::new(0),
            name: name.into(),
        }
    }

    /// Current offset (positive = server ahead of local)
    pub fn offset(&self) -> Duration {
        Duration::milliseconds(self.offset_ms.load(Ordering::Relaxed))
    }

    pub fn set_offset(&self, offset: Duration) {
        self.offset_ms
            .store(offset.num_milliseconds(), Ordering::Relaxed);
    }

    /// Record a server-time observation.
    ///
    /// `sent_at`/`received_at` are local times around the request; the
    /// server is assumed to have stamped its reply at the midpoint.
    pub fn observe(&self, server_time: Timestamp, sent_at: Timestamp, received_at: Timestamp) {
        let rtt = received_at - sent_at;
        let local_midpoint = sent_at + rtt / 2;
        let offset = server_time - local_midpoint;
        debug!(
            "{}: server offset {} ms (rtt {} ms)",
            self.name,
            offset.num_milliseconds(),
            rtt.num_milliseconds()
        );
        self.set_offset(offset);
    }

    /// Underlying (uncorrected) clock
    pub fn local(&self) -> &Arc<dyn Clock> {
        &self.local
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> Timestamp {
        self.local.now() + self.offset()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
