use serde::{Deserialize, Serialize};

use crate::values::{Price, Quantity, TradingPair};

/// Last traded price for a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub trading_pair: TradingPair,
    pub price: Price,
}

/// Best bid/ask for a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookTicker {
    pub trading_pair: TradingPair,
    pub bid_price: Price,
    pub bid_size: Quantity,
    pub ask_price: Price,
    pub ask_size: Quantity,
}

impl BookTicker {
    pub fn mid_price(&self) -> Price {
        (self.bid_price + self.ask_price) / Price::TWO
    }

    pub fn spread(&self) -> Price {
        self.ask_price - self.bid_price
    }
}
