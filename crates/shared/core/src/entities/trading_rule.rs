use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::{Price, Quantity, TradingPair};

/// Order constraints the exchange enforces for one pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingRule {
    pub trading_pair: TradingPair,
    pub min_order_size: Quantity,
    /// Tick size
    pub min_price_increment: Price,
    /// Step size
    pub min_base_amount_increment: Quantity,
    pub min_notional_size: Quantity,
}

/// Why an order does not satisfy a [`TradingRule`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    BelowMinSize { amount: Quantity, min: Quantity },
    BelowMinNotional { notional: Quantity, min: Quantity },
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleViolation::BelowMinSize { amount, min } => {
                write!(f, "amount {} below minimum order size {}", amount, min)
            }
            RuleViolation::BelowMinNotional { notional, min } => {
                write!(f, "notional {} below minimum notional {}", notional, min)
            }
        }
    }
}

impl TradingRule {
    /// Round a price down to the tick size
    pub fn quantize_price(&self, price: Price) -> Price {
        quantize(price, self.min_price_increment)
    }

    /// Round an amount down to the step size
    pub fn quantize_amount(&self, amount: Quantity) -> Quantity {
        quantize(amount, self.min_base_amount_increment)
    }

    /// Check size and notional minimums. Market orders (no price) only get
    /// the size check.
    pub fn check(&self, amount: Quantity, price: Option<Price>) -> Result<(), RuleViolation> {
        if amount < self.min_order_size {
            return Err(RuleViolation::BelowMinSize {
                amount,
                min: self.min_order_size,
            });
        }
        if let Some(price) = price {
            let notional = amount * price;
            if notional < self.min_notional_size {
                return Err(RuleViolation::BelowMinNotional {
                    notional,
                    min: self.min_notional_size,
                });
            }
        }
        Ok(())
    }
}

fn quantize(value: Decimal, increment: Decimal) -> Decimal {
    if increment.is_zero() {
        return value;
    }
    (value / increment).floor() * increment
}
