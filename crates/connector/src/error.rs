//! Error types for the connector crate

use apiengine_core::Timestamp;
use apiengine_ports::TransportError;
use apiengine_throttler::ThrottleError;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{ORDER_NOT_EXIST_ERROR_CODE, UNKNOWN_ORDER_ERROR_CODE};

/// Connector-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectorError {
    /// Denied locally by the rate limiter, or rejected by the exchange with 429
    #[error("Rate limit exceeded on {tier_id}, retry after {retry_after:?} (at {retry_at})")]
    RateLimitExceeded {
        tier_id: String,
        retry_after: Duration,
        /// Earliest time a retry can be admitted, on the local clock
        retry_at: Timestamp,
    },

    #[error("Unknown trading pair: {0}")]
    UnknownPair(String),

    #[error("Unknown exchange symbol: {0}")]
    UnknownSymbol(String),

    #[error("Unrecognized order status: {0:?}")]
    UnrecognizedStatus(String),

    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// `sent` tells whether the request may have reached the exchange
    #[error("Deadline exceeded (request sent: {sent})")]
    DeadlineExceeded { sent: bool },

    #[error("Authentication rejected ({status}): {message}")]
    AuthenticationRejected { status: u16, message: String },

    #[error("Exchange error {status} (code {code:?}): {message}")]
    Exchange {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// The client order id is not tracked locally
    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Conflicting symbol mapping: {0}")]
    SymbolConflict(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ConnectorError {
    /// Classify a non-2xx response.
    ///
    /// The exchange reports failures as `{"code": -2013, "msg": "..."}`; bodies
    /// that do not follow that shape are kept verbatim as the message. A 429
    /// carries no retry hint, so it may be retried from `received_at`.
    pub fn from_response(status: u16, body: &str, received_at: Timestamp) -> Self {
        #[derive(serde::Deserialize)]
        struct ApiError {
            code: Option<i64>,
            #[serde(alias = "message")]
            msg: Option<String>,
        }

        let (code, message) = match serde_json::from_str::<ApiError>(body) {
            Ok(err) => (err.code, err.msg.unwrap_or_else(|| body.to_string())),
            Err(_) => (None, body.to_string()),
        };

        match (status, code) {
            (401 | 403, _) => Self::AuthenticationRejected { status, message },
            (429, _) => Self::RateLimitExceeded {
                tier_id: "server".to_string(),
                retry_after: Duration::ZERO,
                retry_at: received_at,
            },
            (_, Some(ORDER_NOT_EXIST_ERROR_CODE | UNKNOWN_ORDER_ERROR_CODE)) => {
                Self::OrderNotFound(message)
            }
            _ => Self::Exchange {
                status,
                code,
                message,
            },
        }
    }

    /// Failures worth retrying after a pause. The connector itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded { .. } => true,
            Self::DeadlineExceeded { .. } => true,
            Self::TransportFailure(_) => true,
            Self::Exchange { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<ThrottleError> for ConnectorError {
    fn from(e: ThrottleError) -> Self {
        match e {
            ThrottleError::Exceeded {
                tier_id,
                retry_after,
                retry_at,
                ..
            } => ConnectorError::RateLimitExceeded {
                tier_id,
                retry_after,
                retry_at,
            },
            ThrottleError::UnknownTier(tier_id) => {
                ConnectorError::Configuration(format!("no rate limit tier {tier_id}"))
            }
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(e: serde_json::Error) -> Self {
        ConnectorError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
