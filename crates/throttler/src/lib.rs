//! ApiEngine Throttler
//!
//! Client-side request budgeting against the exchange's documented quotas.
//!
//! ## Model
//!
//! ```text
//!            reserve("order")
//!                  │
//!     ┌────────────▼────────────┐
//!     │ order        10 / 1s    │  debit 1
//!     └──────┬───────────┬──────┘
//!            │ weight 1  │ weight 1
//!   ┌────────▼──────┐ ┌──▼────────────┐
//!   │REQUEST_WEIGHT │ │ RAW_REQUESTS  │
//!   │  1200 / 60s   │ │  1200 / 60s   │
//!   └───────────────┘ └───────────────┘
//! ```
//!
//! Every tier is a fixed-window counter. Reserving a tier debits it and every
//! tier linked from it (one level, no transitive closure) in a single
//! critical section: either all implicated tiers admit the request or none is
//! touched. The limiter never sleeps; callers get the blocking tier and the
//! time at which to retry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let table = TierTable::new(vec![
//!     RateLimitTier::new("REQUEST_WEIGHT", 1200, Duration::from_secs(60)),
//!     RateLimitTier::new("order", 10, Duration::from_secs(1))
//!         .linked_to("REQUEST_WEIGHT", 1),
//! ])?;
//! let limiter = RateLimiter::new(table, clock);
//!
//! let reservation = limiter.reserve("order")?;
//! match transport.execute(request).await {
//!     Ok(_) => limiter.record_usage(reservation),
//!     Err(_) => limiter.release(reservation),
//! }
//! ```

pub mod error;
pub mod limiter;
pub mod table;
pub mod tier;

pub use error::{TableError, ThrottleError, ThrottleResult};
pub use limiter::{LimiterStats, RateLimiter, Reservation, TierUsage};
pub use table::TierTable;
pub use tier::{LinkedWeight, RateLimitTier};
