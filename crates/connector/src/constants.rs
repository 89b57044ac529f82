//! Exchange constants: URLs, paths, limits and the rate-limit tier table

use apiengine_throttler::RateLimitTier;
use std::time::Duration;

pub const EXCHANGE_NAME: &str = "apiengine";

pub const REST_URL: &str = "https://apiengine.demoapps.space/";
pub const WSS_URL: &str = "wss://apiengine.demoapps.space/ws";

pub const CLIENT_ORDER_ID_PREFIX: &str = "x-MG43PCSN";
pub const MAX_ORDER_ID_LEN: usize = 32;

// Public endpoints
pub const PING_PATH_URL: &str = "ping";
pub const SERVER_TIME_PATH_URL: &str = "time";
pub const EXCHANGE_INFO_PATH_URL: &str = "exchangeInfo";
pub const TICKER_PRICE_PATH_URL: &str = "ticker/price";
pub const TICKER_BOOK_PATH_URL: &str = "ticker/bookTicker";
pub const SNAPSHOT_PATH_URL: &str = "depth";

// Private endpoints
pub const ACCOUNTS_PATH_URL: &str = "account";
pub const MY_TRADES_PATH_URL: &str = "myTrades";
pub const ORDER_PATH_URL: &str = "order";
pub const ORDER_BY_ID_LIMIT_ID: &str = "order/:orderId";
pub const ALL_ORDERS_PATH_URL: &str = "order/all-orders";
pub const ACTIVE_ORDERS_PATH_URL: &str = "order/active-orders";

// Self-describing rate limit endpoints
pub const RATE_LIMITS_PATH_URL: &str = "ratelimits";
pub const RATE_LIMITS_ENDPOINTS_PATH_URL: &str = "ratelimits/endpoints";
pub const RATE_LIMITS_DOCUMENTATION_PATH_URL: &str = "ratelimits/documentation";

pub const WS_HEARTBEAT_TIME_INTERVAL: Duration = Duration::from_secs(30);

// Stream event types
pub const DIFF_EVENT_TYPE: &str = "depthUpdate";
pub const TRADE_EVENT_TYPE: &str = "trade";

/// Status marking a symbol as open for trading
pub const TRADING_STATUS: &str = "TRADING";

pub const ORDER_NOT_EXIST_ERROR_CODE: i64 = -2013;
pub const ORDER_NOT_EXIST_MESSAGE: &str = "Order does not exist";
pub const UNKNOWN_ORDER_ERROR_CODE: i64 = -2011;
pub const UNKNOWN_ORDER_MESSAGE: &str = "Unknown order sent";

// Global tiers
pub const REQUEST_WEIGHT: &str = "REQUEST_WEIGHT";
pub const RAW_REQUESTS: &str = "RAW_REQUESTS";
pub const BURST: &str = "BURST";

/// Requests per minute per IP
pub const GLOBAL_IP_LIMIT: u32 = 1200;
/// Requests per minute per authenticated user
pub const GLOBAL_USER_LIMIT: u32 = 1200;
/// Requests per second
pub const BURST_LIMIT: u32 = 10;

/// Endpoint tier linked to both global tiers at weight 1
fn endpoint_tier(id: &str, capacity: u32, window: Duration) -> RateLimitTier {
    RateLimitTier::new(id, capacity, window)
        .linked_to(REQUEST_WEIGHT, 1)
        .linked_to(RAW_REQUESTS, 1)
}

/// The exchange's documented quota structure.
///
/// `BURST` is published by the exchange but no endpoint links to it, so it
/// is never debited by ordinary calls. Linking it would cap all endpoints
/// together at `BURST_LIMIT` requests per second, below the budgets the
/// exchange publishes per endpoint.
/// It stays in the table so it can be reserved directly.
pub fn rate_limit_tiers() -> Vec<RateLimitTier> {
    let minute = Duration::from_secs(60);
    let second = Duration::from_secs(1);

    vec![
        RateLimitTier::new(REQUEST_WEIGHT, GLOBAL_IP_LIMIT, minute),
        RateLimitTier::new(RAW_REQUESTS, GLOBAL_USER_LIMIT, minute),
        RateLimitTier::new(BURST, BURST_LIMIT, second),
        endpoint_tier(PING_PATH_URL, 1200, minute),
        endpoint_tier(SERVER_TIME_PATH_URL, 1200, minute),
        endpoint_tier(EXCHANGE_INFO_PATH_URL, 1200, minute),
        endpoint_tier(TICKER_PRICE_PATH_URL, 1200, minute),
        endpoint_tier(TICKER_BOOK_PATH_URL, 1200, minute),
        endpoint_tier(SNAPSHOT_PATH_URL, 1200, minute),
        endpoint_tier(MY_TRADES_PATH_URL, 1200, minute),
        endpoint_tier(ORDER_PATH_URL, 10, second),
        endpoint_tier(ACTIVE_ORDERS_PATH_URL, 10, second),
        endpoint_tier(ALL_ORDERS_PATH_URL, 10, second),
        endpoint_tier(ORDER_BY_ID_LIMIT_ID, 5, second),
        endpoint_tier(ACCOUNTS_PATH_URL, 10, second),
        endpoint_tier(RATE_LIMITS_PATH_URL, 1200, minute),
        endpoint_tier(RATE_LIMITS_ENDPOINTS_PATH_URL, 1200, minute),
        endpoint_tier(RATE_LIMITS_DOCUMENTATION_PATH_URL, 1200, minute),
    ]
}
