//! ApiEngine Core Domain
//!
//! Pure domain types shared by the connector crates: the canonical order
//! lifecycle, in-flight order records and the market/account records the
//! connector hands back to the trading engine.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Account & market records
    Balance,
    BookTicker,
    // Order lifecycle
    InFlightOrder,
    OrderPhase,
    OrderState,
    OrderType,
    OrderUpdate,
    RuleViolation,
    Side,
    Ticker,
    TradeFill,
    TradingRule,
    UpdateOutcome,
};
pub use values::{Price, Quantity, Timestamp, TradingPair, combine_pair, split_pair};
