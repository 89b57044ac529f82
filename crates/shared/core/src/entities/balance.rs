use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::Quantity;

/// Account balance for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    /// Free to use for new orders
    pub available: Quantity,
    /// Available plus locked in open orders
    pub total: Quantity,
}

impl Balance {
    pub fn new(asset: impl Into<String>, available: Quantity, total: Quantity) -> Self {
        Self {
            asset: asset.into(),
            available,
            total,
        }
    }

    /// Amount held by open orders
    pub fn locked(&self) -> Quantity {
        (self.total - self.available).max(Decimal::ZERO)
    }
}
