//! REST payloads

use apiengine_core::{Balance, Side, TradingPair, TradingRule};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::messages::decimal;
use crate::symbols::SymbolEntry;

// Market data

/// `GET exchangeInfo`
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    #[serde(default)]
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    /// Absent on some deployments
    #[serde(default)]
    pub status: Option<String>,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub min_order_size: Option<Decimal>,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub tick_size: Option<Decimal>,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub step_size: Option<Decimal>,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub min_notional: Option<Decimal>,
}

impl SymbolInfo {
    pub fn to_entry(&self) -> SymbolEntry {
        SymbolEntry {
            exchange_symbol: self.symbol.clone(),
            base_asset: self.base_asset.clone(),
            quote_asset: self.quote_asset.clone(),
            status: self.status.clone(),
        }
    }

    /// Missing filters read as zero (no constraint)
    pub fn to_trading_rule(&self, trading_pair: TradingPair) -> TradingRule {
        TradingRule {
            trading_pair,
            min_order_size: self.min_order_size.unwrap_or_default(),
            min_price_increment: self.tick_size.unwrap_or_default(),
            min_base_amount_increment: self.step_size.unwrap_or_default(),
            min_notional_size: self.min_notional.unwrap_or_default(),
        }
    }
}

/// `GET time`
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTimeResponse {
    /// Milliseconds since the epoch
    #[serde(rename = "serverTime", alias = "time", alias = "timestamp")]
    pub server_time: i64,
}

/// `GET ticker/price`
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPriceResponse {
    pub symbol: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub price: Decimal,
}

/// `ticker/price` answers with one object for a symbol query and a list
/// without one
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TickerPricePayload {
    One(TickerPriceResponse),
    Many(Vec<TickerPriceResponse>),
}

impl TickerPricePayload {
    pub fn into_vec(self) -> Vec<TickerPriceResponse> {
        match self {
            Self::One(ticker) => vec![ticker],
            Self::Many(tickers) => tickers,
        }
    }
}

/// `GET ticker/bookTicker`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTickerResponse {
    pub symbol: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub bid_price: Decimal,
    #[serde(alias = "bidSize", deserialize_with = "decimal::deserialize")]
    pub bid_qty: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub ask_price: Decimal,
    #[serde(alias = "askSize", deserialize_with = "decimal::deserialize")]
    pub ask_qty: Decimal,
}

// Orders

/// Body of `POST order`
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderRequest {
    pub market: String,
    /// `true` for buy orders
    pub bid: bool,
    #[serde(serialize_with = "decimal::serialize_as_number")]
    pub size: Decimal,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "decimal::serialize_option_as_number"
    )]
    pub price: Option<Decimal>,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
}

impl PlaceOrderRequest {
    pub fn side(&self) -> Side {
        if self.bid { Side::Buy } else { Side::Sell }
    }
}

/// Single order as returned by `POST order` and `GET order/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default, rename = "type")]
    pub order_type: Option<String>,
    #[serde(default)]
    pub bid: Option<bool>,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub size: Option<Decimal>,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub price: Option<Decimal>,
    /// Cumulative executed amount, when reported
    #[serde(
        default,
        alias = "filledSize",
        alias = "tradeSize",
        deserialize_with = "decimal::deserialize_option"
    )]
    pub executed_size: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `DELETE order/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

/// Entry of `GET order/all-orders` and `GET order/active-orders`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListEntry {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub market: String,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub price: Option<Decimal>,
    /// Nanoseconds since the epoch, as a string
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub original_size: Option<Decimal>,
    pub status: String,
    pub bids: bool,
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub size: Decimal,
    #[serde(default)]
    pub display_status: Option<String>,
    #[serde(default)]
    pub matched_orders: Vec<serde_json::Value>,
    #[serde(default)]
    pub order_placed_type: Option<String>,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub traded_price: Option<Decimal>,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub trade_size: Option<Decimal>,
    #[serde(default, deserialize_with = "decimal::deserialize_option")]
    pub mean_match_price: Option<Decimal>,
}

impl OrderListEntry {
    pub fn side(&self) -> Side {
        if self.bids { Side::Buy } else { Side::Sell }
    }

    /// Placement time in nanoseconds, when the exchange reported a parseable one
    pub fn timestamp_ns(&self) -> Option<u64> {
        self.timestamp.as_deref()?.trim().parse().ok()
    }

    /// Amount executed so far: reported trade size, else original minus
    /// remaining size
    pub fn executed_amount(&self) -> Option<Decimal> {
        if let Some(traded) = self.trade_size {
            return Some(traded);
        }
        let original = self.original_size?;
        Some((original - self.size).max(Decimal::ZERO))
    }
}

// Account

/// `GET account`
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    #[serde(default)]
    pub balances: Vec<BalanceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceEntry {
    #[serde(alias = "asset")]
    pub currency: String,
    #[serde(alias = "free", deserialize_with = "decimal::deserialize")]
    pub available: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub total: Decimal,
}

impl From<&BalanceEntry> for Balance {
    fn from(entry: &BalanceEntry) -> Self {
        Balance::new(entry.currency.clone(), entry.available, entry.total)
    }
}

/// Entry of `GET myTrades`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEntry {
    #[serde(alias = "tradeId")]
    pub id: serde_json::Value,
    #[serde(alias = "order")]
    pub order_id: serde_json::Value,
    #[serde(alias = "market")]
    pub symbol: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub price: Decimal,
    #[serde(alias = "size", alias = "quantity", deserialize_with = "decimal::deserialize")]
    pub qty: Decimal,
    #[serde(
        default,
        alias = "fee",
        deserialize_with = "decimal::deserialize_option"
    )]
    pub commission: Option<Decimal>,
    #[serde(default, alias = "feeAsset")]
    pub commission_asset: Option<String>,
    /// Milliseconds since the epoch
    #[serde(alias = "timestamp")]
    pub time: i64,
    #[serde(default, alias = "bid")]
    pub is_buyer: Option<bool>,
}

impl TradeEntry {
    /// Ids arrive as numbers or strings
    pub fn trade_id(&self) -> String {
        value_to_id(&self.id)
    }

    pub fn exchange_order_id(&self) -> String {
        value_to_id(&self.order_id)
    }
}

fn value_to_id(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Rate limits

/// `GET ratelimits`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitsResponse {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub global_limits: GlobalLimits,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalLimits {
    pub ip_based: LimitInfo,
    pub user_based: LimitInfo,
    pub burst: LimitInfo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LimitInfo {
    pub limit: u32,
    /// Window length in seconds
    pub ttl: u64,
    #[serde(default)]
    pub description: Option<String>,
}

impl LimitInfo {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

/// `GET ratelimits/endpoints`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndpointLimitsResponse {
    #[serde(default)]
    pub endpoints: Vec<EndpointLimit>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndpointLimit {
    /// `METHOD /path`, e.g. `GET /ping`
    pub endpoint: String,
    pub method: String,
    pub limit: u32,
    /// Window length in seconds
    pub ttl: u64,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_weight() -> u32 {
    1
}

impl EndpointLimit {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    /// Path without method and leading slash
    pub fn path(&self) -> &str {
        let path = self
            .endpoint
            .split_once(' ')
            .map(|(_, path)| path)
            .unwrap_or(&self.endpoint);
        path.trim_start_matches('/')
    }
}
