use serde::{Deserialize, Serialize};

/// Canonical order lifecycle state
///
/// Every exchange-specific status is mapped onto one of these before it
/// reaches the trading engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Submitted (or about to be) but not yet resting on the book
    PendingCreate,
    /// Resting on the book with nothing filled
    Open,
    /// Resting on the book with some quantity filled
    PartiallyFilled,
    /// Completely executed
    Filled,
    /// Canceled before being completely executed
    Canceled,
    /// Rejected or expired without a resting or filled position
    Failed,
}

impl OrderState {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Canceled | OrderState::Failed
        )
    }

    /// Returns true if the order is still working on the exchange
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::PendingCreate => "PENDING_CREATE",
            OrderState::Open => "OPEN",
            OrderState::PartiallyFilled => "PARTIALLY_FILLED",
            OrderState::Filled => "FILLED",
            OrderState::Canceled => "CANCELED",
            OrderState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
