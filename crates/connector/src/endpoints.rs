//! REST endpoint catalogue

use apiengine_ports::{RestMethod, RestRequest};

use crate::constants::*;

/// One REST operation of the exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Ping,
    ServerTime,
    ExchangeInfo,
    TickerPrice,
    BookTicker,
    Depth,
    Account,
    MyTrades,
    PlaceOrder,
    /// GET `order/{id}`
    OrderStatus(String),
    /// DELETE `order/{id}`
    CancelOrder(String),
    AllOrders,
    ActiveOrders,
    RateLimits,
    RateLimitEndpoints,
    RateLimitDocumentation,
}

impl Endpoint {
    pub fn method(&self) -> RestMethod {
        match self {
            Self::PlaceOrder => RestMethod::Post,
            Self::CancelOrder(_) => RestMethod::Delete,
            _ => RestMethod::Get,
        }
    }

    /// Path relative to the REST base URL
    pub fn path(&self) -> String {
        match self {
            Self::Ping => PING_PATH_URL.to_string(),
            Self::ServerTime => SERVER_TIME_PATH_URL.to_string(),
            Self::ExchangeInfo => EXCHANGE_INFO_PATH_URL.to_string(),
            Self::TickerPrice => TICKER_PRICE_PATH_URL.to_string(),
            Self::BookTicker => TICKER_BOOK_PATH_URL.to_string(),
            Self::Depth => SNAPSHOT_PATH_URL.to_string(),
            Self::Account => ACCOUNTS_PATH_URL.to_string(),
            Self::MyTrades => MY_TRADES_PATH_URL.to_string(),
            Self::PlaceOrder => ORDER_PATH_URL.to_string(),
            Self::OrderStatus(id) | Self::CancelOrder(id) => format!("{}/{}", ORDER_PATH_URL, id),
            Self::AllOrders => ALL_ORDERS_PATH_URL.to_string(),
            Self::ActiveOrders => ACTIVE_ORDERS_PATH_URL.to_string(),
            Self::RateLimits => RATE_LIMITS_PATH_URL.to_string(),
            Self::RateLimitEndpoints => RATE_LIMITS_ENDPOINTS_PATH_URL.to_string(),
            Self::RateLimitDocumentation => RATE_LIMITS_DOCUMENTATION_PATH_URL.to_string(),
        }
    }

    /// Rate limit tier charged for this call
    pub fn limit_id(&self) -> &'static str {
        match self {
            Self::Ping => PING_PATH_URL,
            Self::ServerTime => SERVER_TIME_PATH_URL,
            Self::ExchangeInfo => EXCHANGE_INFO_PATH_URL,
            Self::TickerPrice => TICKER_PRICE_PATH_URL,
            Self::BookTicker => TICKER_BOOK_PATH_URL,
            Self::Depth => SNAPSHOT_PATH_URL,
            Self::Account => ACCOUNTS_PATH_URL,
            Self::MyTrades => MY_TRADES_PATH_URL,
            Self::PlaceOrder => ORDER_PATH_URL,
            Self::OrderStatus(_) | Self::CancelOrder(_) => ORDER_BY_ID_LIMIT_ID,
            Self::AllOrders => ALL_ORDERS_PATH_URL,
            Self::ActiveOrders => ACTIVE_ORDERS_PATH_URL,
            Self::RateLimits => RATE_LIMITS_PATH_URL,
            Self::RateLimitEndpoints => RATE_LIMITS_ENDPOINTS_PATH_URL,
            Self::RateLimitDocumentation => RATE_LIMITS_DOCUMENTATION_PATH_URL,
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(
            self,
            Self::Account
                | Self::MyTrades
                | Self::PlaceOrder
                | Self::OrderStatus(_)
                | Self::CancelOrder(_)
                | Self::AllOrders
                | Self::ActiveOrders
        )
    }

    /// Bare request for this endpoint, without auth headers
    pub fn request(&self) -> RestRequest {
        RestRequest::new(self.method(), self.path())
    }
}
