//! ApiEngine Clock Infrastructure
//!
//! Provides the [`Clock`] implementations the connector runs on:
//!
//! ```text
//! SystemClock  (wall clock, production)
//!     │
//!     └── OffsetClock  (wall clock corrected by the measured server offset)
//!
//! ManualClock  (frozen, only advances when told to; tests)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use apiengine_clock::{ManualClock, OffsetClock, SystemClock};
//! use chrono::Duration;
//!
//! let clock = ManualClock::starting_at(start);
//! clock.advance(Duration::seconds(1));
//!
//! let synced = OffsetClock::new(Arc::new(SystemClock::new()), "apiengine");
//! synced.set_offset(Duration::milliseconds(-42));
//! ```

mod manual;
mod offset;
mod system;

pub use manual::ManualClock;
pub use offset::OffsetClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use apiengine_ports::Clock;
