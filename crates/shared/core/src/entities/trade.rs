use serde::{Deserialize, Serialize};

use super::Side;
use crate::values::{Price, Quantity, Timestamp, TradingPair};

/// One execution of one of our orders, as reported by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFill {
    pub trade_id: String,
    pub exchange_order_id: String,
    pub trading_pair: TradingPair,
    pub side: Side,
    pub price: Price,
    pub amount: Quantity,
    /// Fee charged for this fill (positive = cost)
    pub fee: Quantity,
    pub fee_asset: Option<String>,
    pub timestamp: Timestamp,
}

impl TradeFill {
    /// Quote-asset value of the fill
    pub fn notional(&self) -> Quantity {
        self.price * self.amount
    }
}
