//! WebSocket stream events
//!
//! Public market data arrives as Binance-style events, optionally wrapped in
//! a combined-stream envelope:
//!
//! ```json
//! {"stream": "btcusdt@depth", "data": {"e": "depthUpdate", "s": "BTCUSDT", ...}}
//! ```
//!
//! Parsers work on exchange symbols; [`parse_event`] translates them to
//! canonical pairs through a [`SymbolMap`] snapshot.

use apiengine_core::{Price, Quantity, Side, TradingPair};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;

use crate::constants::{DIFF_EVENT_TYPE, TRADE_EVENT_TYPE};
use crate::error::{ConnectorError, Result};
use crate::symbols::SymbolMap;

/// One price level of a depth update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookLevel {
    pub price: Price,
    /// Zero removes the level
    pub amount: Quantity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthUpdate {
    pub trading_pair: TradingPair,
    pub event_time: i64,
    pub first_update_id: u64,
    pub final_update_id: u64,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub trading_pair: TradingPair,
    pub trade_id: u64,
    pub price: Price,
    pub amount: Quantity,
    pub trade_time: i64,
    pub is_buyer_maker: bool,
}

impl TradeEvent {
    /// Side of the aggressor
    pub fn taker_side(&self) -> Side {
        if self.is_buyer_maker { Side::Sell } else { Side::Buy }
    }
}

/// Market data event with canonical pairs
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    DepthUpdate(DepthUpdate),
    Trade(TradeEvent),
}

impl StreamEvent {
    pub fn trading_pair(&self) -> &str {
        match self {
            StreamEvent::DepthUpdate(update) => &update.trading_pair,
            StreamEvent::Trade(trade) => &trade.trading_pair,
        }
    }
}

/// Parses one event type. Returns the exchange symbol with the event, whose
/// pair is filled in after translation.
pub trait EventParser: Send + Sync {
    fn can_parse(&self, event_type: &str) -> bool;

    fn parse(&self, data: &Value) -> Option<(String, StreamEvent)>;
}

pub struct DepthParser;

impl EventParser for DepthParser {
    fn can_parse(&self, event_type: &str) -> bool {
        event_type == DIFF_EVENT_TYPE
    }

    fn parse(&self, data: &Value) -> Option<(String, StreamEvent)> {
        let symbol = data.get("s")?.as_str()?.to_string();
        let update = DepthUpdate {
            trading_pair: String::new(),
            event_time: data.get("E")?.as_i64()?,
            first_update_id: data.get("U")?.as_u64()?,
            final_update_id: data.get("u")?.as_u64()?,
            bids: parse_price_levels(data.get("b")?)?,
            asks: parse_price_levels(data.get("a")?)?,
        };
        Some((symbol, StreamEvent::DepthUpdate(update)))
    }
}

pub struct TradeParser;

impl EventParser for TradeParser {
    fn can_parse(&self, event_type: &str) -> bool {
        event_type == TRADE_EVENT_TYPE
    }

    fn parse(&self, data: &Value) -> Option<(String, StreamEvent)> {
        let symbol = data.get("s")?.as_str()?.to_string();
        let trade = TradeEvent {
            trading_pair: String::new(),
            trade_id: data.get("t")?.as_u64()?,
            price: parse_decimal(data.get("p")?)?,
            amount: parse_decimal(data.get("q")?)?,
            trade_time: data.get("T")?.as_i64()?,
            is_buyer_maker: data.get("m")?.as_bool()?,
        };
        Some((symbol, StreamEvent::Trade(trade)))
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn parse_price_levels(value: &Value) -> Option<Vec<BookLevel>> {
    let arr = value.as_array()?;
    let mut levels = Vec::with_capacity(arr.len());

    for item in arr {
        let inner = item.as_array()?;
        if inner.len() >= 2 {
            levels.push(BookLevel {
                price: parse_decimal(&inner[0])?,
                amount: parse_decimal(&inner[1])?,
            });
        }
    }

    Some(levels)
}

fn parsers() -> [&'static dyn EventParser; 2] {
    [&DepthParser, &TradeParser]
}

/// Parse one text frame.
///
/// `Ok(None)` for frames that are not market data events (subscription acks,
/// pongs, unknown event types). Malformed events and symbols missing from the
/// table are errors.
pub fn parse_event(text: &str, symbols: &SymbolMap) -> Result<Option<StreamEvent>> {
    let message: Value = serde_json::from_str(text)?;
    let data = message.get("data").unwrap_or(&message);

    let Some(event_type) = data.get("e").and_then(Value::as_str) else {
        return Ok(None);
    };
    let Some(parser) = parsers().into_iter().find(|p| p.can_parse(event_type)) else {
        return Ok(None);
    };

    let (symbol, mut event) = parser
        .parse(data)
        .ok_or_else(|| ConnectorError::Parse(format!("malformed {} event: {}", event_type, text)))?;

    let pair = symbols.to_canonical_pair(&symbol)?;
    match &mut event {
        StreamEvent::DepthUpdate(update) => update.trading_pair = pair,
        StreamEvent::Trade(trade) => trade.trading_pair = pair,
    }
    Ok(Some(event))
}

/// Channel names for one exchange symbol
pub fn channels_for(exchange_symbol: &str) -> [String; 2] {
    let stream = exchange_symbol.to_lowercase();
    [format!("{}@depth", stream), format!("{}@trade", stream)]
}

/// Subscription frame for the given channels
pub fn subscribe_payload(channels: &[String], id: u64) -> Value {
    json!({
        "method": "SUBSCRIBE",
        "params": channels,
        "id": id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolEntry;
    use rust_decimal_macros::dec;

    fn symbols() -> SymbolMap {
        SymbolMap::build(&[SymbolEntry {
            exchange_symbol: "BTCUSDT".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "USDT".to_string(),
            status: Some("TRADING".to_string()),
        }])
        .unwrap()
    }

    #[test]
    fn test_depth_update() {
        let text = serde_json::json!({
            "e": "depthUpdate",
            "E": 1234567890,
            "s": "BTCUSDT",
            "U": 100,
            "u": 105,
            "b": [["50000.00", "1.5"], ["49999.00", "0"]],
            "a": [["50001.00", "1.0"]]
        })
        .to_string();

        let Some(StreamEvent::DepthUpdate(update)) = parse_event(&text, &symbols()).unwrap() else {
            panic!("Expected DepthUpdate");
        };
        assert_eq!(update.trading_pair, "BTC-USDT");
        assert_eq!(update.first_update_id, 100);
        assert_eq!(update.final_update_id, 105);
        assert_eq!(update.bids.len(), 2);
        assert_eq!(update.bids[1].amount, Decimal::ZERO);
        assert_eq!(update.asks[0].price, dec!(50001));
    }

    #[test]
    fn test_wrapped_trade() {
        let text = serde_json::json!({
            "stream": "btcusdt@trade",
            "data": {
                "e": "trade",
                "E": 1234567890,
                "s": "BTCUSDT",
                "t": 12345,
                "p": "50000.00",
                "q": 1.5,
                "T": 1234567890,
                "m": true
            }
        })
        .to_string();

        let event = parse_event(&text, &symbols()).unwrap().unwrap();
        assert_eq!(event.trading_pair(), "BTC-USDT");
        let StreamEvent::Trade(trade) = event else {
            panic!("Expected Trade");
        };
        assert_eq!(trade.trade_id, 12345);
        assert_eq!(trade.price, dec!(50000));
        assert_eq!(trade.amount, dec!(1.5));
        assert_eq!(trade.taker_side(), Side::Sell);
    }

    #[test]
    fn test_non_events_are_skipped() {
        assert_eq!(parse_event(r#"{"result":null,"id":1}"#, &symbols()).unwrap(), None);
        assert_eq!(
            parse_event(r#"{"e":"kline","s":"BTCUSDT"}"#, &symbols()).unwrap(),
            None
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_event("not json", &symbols()),
            Err(ConnectorError::Parse(_))
        ));
        assert!(matches!(
            parse_event(r#"{"e":"trade","s":"BTCUSDT"}"#, &symbols()),
            Err(ConnectorError::Parse(_))
        ));

        let unknown = serde_json::json!({
            "e": "trade", "E": 1, "s": "DOGEUSDT", "t": 1,
            "p": "0.1", "q": "10", "T": 1, "m": false
        })
        .to_string();
        assert_eq!(
            parse_event(&unknown, &symbols()).unwrap_err(),
            ConnectorError::UnknownSymbol("DOGEUSDT".to_string())
        );
    }

    #[test]
    fn test_subscription_payload() {
        let channels = channels_for("BTCUSDT");
        assert_eq!(channels, ["btcusdt@depth".to_string(), "btcusdt@trade".to_string()]);

        let payload = subscribe_payload(&channels, 7);
        assert_eq!(payload["method"], "SUBSCRIBE");
        assert_eq!(payload["params"][1], "btcusdt@trade");
        assert_eq!(payload["id"], 7);
    }
}
