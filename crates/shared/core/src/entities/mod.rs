mod balance;
mod in_flight_order;
mod market;
mod order_state;
mod order_type;
mod side;
mod trade;
mod trading_rule;

pub use balance::Balance;
pub use in_flight_order::{InFlightOrder, OrderPhase, OrderUpdate, UpdateOutcome};
pub use market::{BookTicker, Ticker};
pub use order_state::OrderState;
pub use order_type::OrderType;
pub use side::Side;
pub use trade::TradeFill;
pub use trading_rule::{RuleViolation, TradingRule};
