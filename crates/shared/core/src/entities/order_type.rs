use serde::{Deserialize, Serialize};

/// Order types supported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Execute at current market price
    Market,
    /// Execute at specified price or better
    Limit,
}

impl OrderType {
    /// Whether an order of this type must carry a price
    pub fn requires_price(&self) -> bool {
        matches!(self, OrderType::Limit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}
