//! Fixed-window multi-tier rate limiter

use apiengine_core::Timestamp;
use apiengine_ports::Clock;
use log::{debug, warn};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{ThrottleError, ThrottleResult};
use crate::table::TierTable;

static NEXT_LIMITER_ID: AtomicU64 = AtomicU64::new(1);

/// Counter for one tier's current window
#[derive(Debug, Default)]
struct WindowCounter {
    /// Start of the current window, `None` until first use
    window_start: Option<Timestamp>,
    used: u32,
    /// Bumped on every reset so stale credits can be recognised
    epoch: u64,
}

impl WindowCounter {
    /// Start a new window if the current one has elapsed
    fn roll(&mut self, now: Timestamp, window: chrono::Duration) {
        let expired = match self.window_start {
            None => true,
            Some(start) => now - start >= window,
        };
        if expired {
            self.window_start = Some(now);
            self.used = 0;
            self.epoch += 1;
        }
    }

    fn resets_at(&self, now: Timestamp, window: chrono::Duration) -> Timestamp {
        self.window_start.unwrap_or(now) + window
    }
}

/// One tier debit held by a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeldDebit {
    tier: usize,
    units: u32,
    epoch: u64,
}

/// Admission token for one outbound call
///
/// Hand it back with [`RateLimiter::record_usage`] once the call went out, or
/// [`RateLimiter::release`] if it was abandoned before being sent. A
/// reservation that is simply dropped stays charged.
#[must_use = "a reservation must be recorded or released"]
#[derive(Debug)]
pub struct Reservation {
    limiter_id: u64,
    tier_id: String,
    debits: Vec<HeldDebit>,
    issued_at: Timestamp,
}

impl Reservation {
    /// Tier the reservation was made against
    pub fn tier_id(&self) -> &str {
        &self.tier_id
    }

    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    /// Number of tiers debited (the direct tier plus its linked tiers)
    pub fn tier_count(&self) -> usize {
        self.debits.len()
    }
}

/// Point-in-time view of one tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierUsage {
    pub tier_id: String,
    pub used: u32,
    pub capacity: u32,
    pub remaining: u32,
    /// Time until the current window resets
    pub resets_in: Duration,
}

/// Lifetime counters for a limiter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimiterStats {
    pub admitted: u64,
    pub rejected: u64,
    pub released: u64,
    pub recorded: u64,
}

/// Multi-tier rate limiter
///
/// Owned per exchange session: two limiters never share counters. Every tier
/// has its own lock; a reservation takes the locks of all tiers it implicates
/// in table order, so check-and-debit is indivisible for overlapping tier
/// sets without a global lock.
pub struct RateLimiter {
    id: u64,
    table: TierTable,
    counters: Vec<Mutex<WindowCounter>>,
    clock: Arc<dyn Clock>,
    admitted: AtomicU64,
    rejected: AtomicU64,
    released: AtomicU64,
    recorded: AtomicU64,
}

impl RateLimiter {
    pub fn new(table: TierTable, clock: Arc<dyn Clock>) -> Self {
        let counters = (0..table.len())
            .map(|_| Mutex::new(WindowCounter::default()))
            .collect();
        Self {
            id: NEXT_LIMITER_ID.fetch_add(1, Ordering::Relaxed),
            table,
            counters,
            clock,
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            released: AtomicU64::new(0),
            recorded: AtomicU64::new(0),
        }
    }

    pub fn table(&self) -> &TierTable {
        &self.table
    }

    /// Reserve capacity for one call against `tier_id` and its linked tiers.
    ///
    /// Either every implicated tier is debited or none is.
    pub fn reserve(&self, tier_id: &str) -> ThrottleResult<Reservation> {
        let index = self
            .table
            .index_of(tier_id)
            .ok_or_else(|| ThrottleError::UnknownTier(tier_id.to_string()))?;
        let tier = self.table.get(index);
        let now = self.clock.now();

        // Debits are sorted by tier index: locking in that order cannot deadlock
        let mut guards: Vec<MutexGuard<'_, WindowCounter>> = tier
            .debits
            .iter()
            .map(|debit| self.counters[debit.tier].lock())
            .collect();

        let mut blocking: Option<ThrottleError> = None;
        for (debit, counter) in tier.debits.iter().zip(guards.iter_mut()) {
            let debited = self.table.get(debit.tier);
            counter.roll(now, debited.window);

            let remaining = debited.capacity.saturating_sub(counter.used);
            if remaining < debit.units {
                let retry_at = counter.resets_at(now, debited.window);
                // Report the tier that frees up last
                let later = match &blocking {
                    Some(ThrottleError::Exceeded { retry_at: current, .. }) => retry_at > *current,
                    _ => true,
                };
                if later {
                    blocking = Some(ThrottleError::Exceeded {
                        tier_id: debited.id.clone(),
                        requested: debit.units,
                        remaining,
                        capacity: debited.capacity,
                        retry_after: (retry_at - now).to_std().unwrap_or(Duration::ZERO),
                        retry_at,
                    });
                }
            }
        }

        if let Some(err) = blocking {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            debug!("Rejected reservation on {}: {}", tier_id, err);
            return Err(err);
        }

        let debits = tier
            .debits
            .iter()
            .zip(guards.iter_mut())
            .map(|(debit, counter)| {
                counter.used += debit.units;
                HeldDebit {
                    tier: debit.tier,
                    units: debit.units,
                    epoch: counter.epoch,
                }
            })
            .collect();
        drop(guards);

        self.admitted.fetch_add(1, Ordering::Relaxed);
        debug!("Reserved {} ({} tiers)", tier_id, tier.debits.len());

        Ok(Reservation {
            limiter_id: self.id,
            tier_id: tier.id.clone(),
            debits,
            issued_at: now,
        })
    }

    /// Credit back a reservation whose call was never sent.
    ///
    /// Units are only returned to the window they were taken from; once a
    /// window has rolled over, its debits are already gone.
    pub fn release(&self, reservation: Reservation) {
        if !self.owns(&reservation) {
            return;
        }

        let mut guards: Vec<MutexGuard<'_, WindowCounter>> = reservation
            .debits
            .iter()
            .map(|debit| self.counters[debit.tier].lock())
            .collect();

        for (debit, counter) in reservation.debits.iter().zip(guards.iter_mut()) {
            if counter.epoch == debit.epoch {
                counter.used = counter.used.saturating_sub(debit.units);
            }
        }
        drop(guards);

        self.released.fetch_add(1, Ordering::Relaxed);
        debug!("Released reservation on {}", reservation.tier_id);
    }

    /// Finalize a reservation whose call reached the wire
    pub fn record_usage(&self, reservation: Reservation) {
        if !self.owns(&reservation) {
            return;
        }
        self.recorded.fetch_add(1, Ordering::Relaxed);
        debug!("Recorded usage on {}", reservation.tier_id);
    }

    /// Current usage of one tier
    pub fn usage(&self, tier_id: &str) -> ThrottleResult<TierUsage> {
        let index = self
            .table
            .index_of(tier_id)
            .ok_or_else(|| ThrottleError::UnknownTier(tier_id.to_string()))?;
        Ok(self.usage_at(index, self.clock.now()))
    }

    /// Current usage of every tier, in table order
    pub fn usages(&self) -> Vec<TierUsage> {
        let now = self.clock.now();
        (0..self.table.len())
            .map(|index| self.usage_at(index, now))
            .collect()
    }

    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            recorded: self.recorded.load(Ordering::Relaxed),
        }
    }

    fn usage_at(&self, index: usize, now: Timestamp) -> TierUsage {
        let tier = self.table.get(index);
        let mut counter = self.counters[index].lock();
        counter.roll(now, tier.window);
        let resets_in = (counter.resets_at(now, tier.window) - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        TierUsage {
            tier_id: tier.id.clone(),
            used: counter.used,
            capacity: tier.capacity,
            remaining: tier.capacity.saturating_sub(counter.used),
            resets_in,
        }
    }

    fn owns(&self, reservation: &Reservation) -> bool {
        if reservation.limiter_id != self.id {
            warn!(
                "Ignoring reservation on {} issued by another limiter",
                reservation.tier_id
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::RateLimitTier;
    use apiengine_clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::starting_at(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ))
    }

    fn order_path_table() -> TierTable {
        TierTable::new(vec![
            RateLimitTier::per_minute("REQUEST_WEIGHT", 1200),
            RateLimitTier::per_minute("RAW_REQUESTS", 1200),
            RateLimitTier::per_second("ORDER_PATH", 10)
                .linked_to("REQUEST_WEIGHT", 1)
                .linked_to("RAW_REQUESTS", 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_eleventh_order_in_one_second_is_rejected() {
        let clock = clock();
        let limiter = RateLimiter::new(order_path_table(), clock.clone());

        for _ in 0..10 {
            let reservation = limiter.reserve("ORDER_PATH").unwrap();
            limiter.record_usage(reservation);
        }

        let err = limiter.reserve("ORDER_PATH").unwrap_err();
        match err {
            ThrottleError::Exceeded {
                tier_id,
                retry_after,
                ..
            } => {
                assert_eq!(tier_id, "ORDER_PATH");
                assert_eq!(retry_after, Duration::from_secs(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(limiter.usage("REQUEST_WEIGHT").unwrap().used, 10);
        assert_eq!(limiter.usage("RAW_REQUESTS").unwrap().used, 10);
    }

    #[test]
    fn test_window_resets_after_elapsing() {
        let clock = clock();
        let limiter = RateLimiter::new(order_path_table(), clock.clone());

        for _ in 0..10 {
            limiter.record_usage(limiter.reserve("ORDER_PATH").unwrap());
        }
        assert!(limiter.reserve("ORDER_PATH").is_err());

        clock.advance(chrono::Duration::milliseconds(999));
        assert!(limiter.reserve("ORDER_PATH").is_err());

        clock.advance(chrono::Duration::milliseconds(1));
        assert!(limiter.reserve("ORDER_PATH").is_ok());

        // The minute windows keep counting
        assert_eq!(limiter.usage("REQUEST_WEIGHT").unwrap().used, 11);
        assert_eq!(limiter.usage("ORDER_PATH").unwrap().used, 1);
    }

    #[test]
    fn test_saturated_linked_tier_debits_nothing() {
        let clock = clock();
        let table = TierTable::new(vec![
            RateLimitTier::per_minute("REQUEST_WEIGHT", 3),
            RateLimitTier::per_minute("RAW_REQUESTS", 1200),
            RateLimitTier::per_second("ping", 100)
                .linked_to("REQUEST_WEIGHT", 1)
                .linked_to("RAW_REQUESTS", 1),
            RateLimitTier::per_second("order", 100)
                .linked_to("REQUEST_WEIGHT", 1)
                .linked_to("RAW_REQUESTS", 1),
        ])
        .unwrap();
        let limiter = RateLimiter::new(table, clock);

        for _ in 0..3 {
            limiter.record_usage(limiter.reserve("ping").unwrap());
        }

        let before = limiter.usages();
        let err = limiter.reserve("order").unwrap_err();
        assert!(matches!(err, ThrottleError::Exceeded { ref tier_id, .. } if tier_id == "REQUEST_WEIGHT"));
        assert_eq!(limiter.usages(), before);
        assert_eq!(limiter.usage("order").unwrap().used, 0);
    }

    #[test]
    fn test_blocking_tier_reported_is_latest_to_reset() {
        let clock = clock();
        let table = TierTable::new(vec![
            RateLimitTier::per_minute("MINUTE", 2),
            RateLimitTier::per_second("SECOND", 2).linked_to("MINUTE", 1),
        ])
        .unwrap();
        let limiter = RateLimiter::new(table, clock);

        limiter.record_usage(limiter.reserve("SECOND").unwrap());
        limiter.record_usage(limiter.reserve("SECOND").unwrap());

        // Both tiers are full; the minute tier resets last
        match limiter.reserve("SECOND").unwrap_err() {
            ThrottleError::Exceeded {
                tier_id,
                retry_after,
                ..
            } => {
                assert_eq!(tier_id, "MINUTE");
                assert_eq!(retry_after, Duration::from_secs(60));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_release_returns_credit() {
        let clock = clock();
        let limiter = RateLimiter::new(order_path_table(), clock);

        let reservation = limiter.reserve("ORDER_PATH").unwrap();
        assert_eq!(reservation.tier_count(), 3);
        assert_eq!(limiter.usage("REQUEST_WEIGHT").unwrap().used, 1);

        limiter.release(reservation);
        for usage in limiter.usages() {
            assert_eq!(usage.used, 0, "{} still charged", usage.tier_id);
        }
        assert_eq!(limiter.stats().released, 1);
    }

    #[test]
    fn test_release_after_window_rollover_credits_nothing() {
        let clock = clock();
        let limiter = RateLimiter::new(order_path_table(), clock.clone());

        let stale = limiter.reserve("ORDER_PATH").unwrap();
        clock.advance(chrono::Duration::seconds(1));
        let fresh = limiter.reserve("ORDER_PATH").unwrap();
        limiter.record_usage(fresh);

        limiter.release(stale);

        // The per-second window only holds the fresh call
        assert_eq!(limiter.usage("ORDER_PATH").unwrap().used, 1);
        // The minute window still holds the fresh call after crediting the stale one
        assert_eq!(limiter.usage("REQUEST_WEIGHT").unwrap().used, 1);
    }

    #[test]
    fn test_foreign_reservation_is_ignored() {
        let clock = clock();
        let ours = RateLimiter::new(order_path_table(), clock.clone());
        let theirs = RateLimiter::new(order_path_table(), clock);

        let reservation = theirs.reserve("ORDER_PATH").unwrap();
        ours.release(reservation);

        assert_eq!(theirs.usage("ORDER_PATH").unwrap().used, 1);
        assert_eq!(ours.stats().released, 0);
    }

    #[test]
    fn test_unknown_tier() {
        let limiter = RateLimiter::new(order_path_table(), clock());
        assert_eq!(
            limiter.reserve("nope").unwrap_err(),
            ThrottleError::UnknownTier("nope".to_string())
        );
        assert!(limiter.usage("nope").is_err());
    }

    #[test]
    fn test_usage_reports_reset_time() {
        let clock = clock();
        let limiter = RateLimiter::new(order_path_table(), clock.clone());
        limiter.record_usage(limiter.reserve("ORDER_PATH").unwrap());

        clock.advance(chrono::Duration::milliseconds(400));
        let usage = limiter.usage("ORDER_PATH").unwrap();
        assert_eq!(usage.remaining, 9);
        assert_eq!(usage.resets_in, Duration::from_millis(600));
    }
}
