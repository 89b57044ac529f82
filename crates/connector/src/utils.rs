//! Client order id helpers

use apiengine_core::Side;
use uuid::Uuid;

use crate::constants::MAX_ORDER_ID_LEN;
use crate::error::{ConnectorError, Result};

/// `prefix + side tag + random hex`, cut to the exchange's maximum length
pub fn new_client_order_id(prefix: &str, side: Side) -> String {
    format!("{}{}{}", prefix, side.tag(), Uuid::new_v4().simple())
        .chars()
        .take(MAX_ORDER_ID_LEN)
        .collect()
}

/// Ids must be 1..=32 characters of ASCII letters, digits or hyphens
pub fn validate_client_order_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_ORDER_ID_LEN {
        return Err(ConnectorError::InvalidOrder(format!(
            "client order id {:?} must be 1 to {} characters",
            id, MAX_ORDER_ID_LEN
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ConnectorError::InvalidOrder(format!(
            "client order id {:?} contains invalid characters",
            id
        )));
    }
    Ok(())
}
