//! Error types for the throttler crate

use apiengine_core::Timestamp;
use std::time::Duration;
use thiserror::Error;

/// Admission failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThrottleError {
    #[error(
        "Rate limit exceeded on {tier_id}: requested {requested}, remaining {remaining}/{capacity}, retry after {retry_after:?}"
    )]
    Exceeded {
        /// Tier that blocked the request
        tier_id: String,
        requested: u32,
        remaining: u32,
        capacity: u32,
        /// Time left until the blocking tier's window resets
        retry_after: Duration,
        /// Earliest instant at which a retry can be admitted
        retry_at: Timestamp,
    },

    #[error("Unknown rate limit tier: {0}")]
    UnknownTier(String),
}

pub type ThrottleResult<T> = std::result::Result<T, ThrottleError>;

/// Tier table validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Duplicate tier: {0}")]
    DuplicateTier(String),

    #[error("Tier {0} has zero capacity")]
    ZeroCapacity(String),

    #[error("Tier {0} has an empty window")]
    ZeroWindow(String),

    #[error("Tier {0} window is out of range")]
    WindowOutOfRange(String),

    #[error("Tier {tier_id} links to unknown tier {linked}")]
    UnknownLinkedTier { tier_id: String, linked: String },

    #[error("Tier {tier_id} links to {linked} with zero weight")]
    ZeroWeight { tier_id: String, linked: String },

    #[error("Tier {tier_id} links to {linked} with weight {weight} above its capacity {capacity}")]
    WeightExceedsCapacity {
        tier_id: String,
        linked: String,
        weight: u32,
        capacity: u32,
    },

    #[error("Cyclic tier linkage: {}", .0.join(" -> "))]
    CyclicLinkage(Vec<String>),
}
