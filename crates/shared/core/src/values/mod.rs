use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Quantity value - uses Decimal for precision
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Canonical trading pair in `BASE-QUOTE` notation (e.g. `BTC-USDT`)
pub type TradingPair = String;

const PAIR_SEPARATOR: char = '-';

/// Build a canonical pair from its base and quote assets
pub fn combine_pair(base: &str, quote: &str) -> TradingPair {
    format!("{}{}{}", base, PAIR_SEPARATOR, quote)
}

/// Split a canonical pair into `(base, quote)`.
///
/// Returns `None` when the pair is not in `BASE-QUOTE` form.
pub fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (base, quote) = pair.split_once(PAIR_SEPARATOR)?;
    if base.is_empty() || quote.is_empty() || quote.contains(PAIR_SEPARATOR) {
        return None;
    }
    Some((base, quote))
}
