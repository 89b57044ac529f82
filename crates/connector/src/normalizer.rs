//! Raw exchange order status -> canonical [`OrderState`]

use apiengine_core::OrderState;

use crate::error::{ConnectorError, Result};

/// Every status the exchange is known to report
const ORDER_STATE: [(&str, OrderState); 8] = [
    ("PENDING", OrderState::PendingCreate),
    ("OPEN", OrderState::Open),
    ("FILLED", OrderState::Filled),
    ("PARTIAL", OrderState::PartiallyFilled),
    ("CANCELLED", OrderState::Canceled),
    ("REJECTED", OrderState::Failed),
    ("EXPIRED", OrderState::Failed),
    ("COMPLETED", OrderState::Filled),
];

/// Map a raw status onto the canonical lifecycle.
///
/// Case-insensitive, surrounding whitespace ignored. Anything outside the
/// table fails: an unknown status must never be guessed into a state.
pub fn normalize(raw: &str) -> Result<OrderState> {
    let status = raw.trim();
    ORDER_STATE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(status))
        .map(|(_, state)| *state)
        .ok_or_else(|| ConnectorError::UnrecognizedStatus(raw.to_string()))
}

/// Statuses accepted by [`normalize`], upper case
pub fn known_statuses() -> impl Iterator<Item = &'static str> {
    ORDER_STATE.iter().map(|(status, _)| *status)
}
