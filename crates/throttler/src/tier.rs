//! Tier definitions

use std::time::Duration;

/// A secondary tier additionally debited when the owning tier is consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedWeight {
    pub tier_id: String,
    /// Units debited from `tier_id`, at least 1
    pub weight: u32,
}

/// A named capacity budget over a fixed window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitTier {
    pub id: String,
    /// Units admitted per window
    pub capacity: u32,
    pub window: Duration,
    /// Tiers also debited when this one is reserved, in declaration order
    pub linked: Vec<LinkedWeight>,
}

impl RateLimitTier {
    pub fn new(id: impl Into<String>, capacity: u32, window: Duration) -> Self {
        Self {
            id: id.into(),
            capacity,
            window,
            linked: Vec::new(),
        }
    }

    /// Add a linked tier
    pub fn linked_to(mut self, tier_id: impl Into<String>, weight: u32) -> Self {
        self.linked.push(LinkedWeight {
            tier_id: tier_id.into(),
            weight,
        });
        self
    }

    /// Tier debited at `per_second` requests per second
    pub fn per_second(id: impl Into<String>, per_second: u32) -> Self {
        Self::new(id, per_second, Duration::from_secs(1))
    }

    /// Tier debited at `per_minute` requests per minute
    pub fn per_minute(id: impl Into<String>, per_minute: u32) -> Self {
        Self::new(id, per_minute, Duration::from_secs(60))
    }
}
