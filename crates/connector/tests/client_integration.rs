//! Integration test: ExchangeClient <-> scripted transport
//!
//! Drives the full request pipeline (symbol lookup, rate limiting, auth,
//! deadlines, status classification, order tracking) against a transport
//! that replays canned exchange replies.

use apiengine_clock::ManualClock;
use apiengine_connector::{
    ApiCredentials, ConnectorConfig, ConnectorError, Deadline, ExchangeClient, OrderRequest,
    StreamEvent,
};
use apiengine_core::{OrderState, Side};
use apiengine_ports::{
    Clock, RestMethod, RestRequest, RestResponse, RestTransport, TransportError, TransportResult,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

enum Scripted {
    Reply(u16, String),
    Fail(TransportError),
    /// Reply only after the given delay
    Stall(Duration, u16, String),
}

#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<RestRequest>>,
}

impl ScriptedTransport {
    fn reply(&self, status: u16, body: Value) -> &Self {
        self.script
            .lock()
            .push_back(Scripted::Reply(status, body.to_string()));
        self
    }

    fn fail(&self, error: TransportError) -> &Self {
        self.script.lock().push_back(Scripted::Fail(error));
        self
    }

    fn stall(&self, delay: Duration, status: u16, body: Value) -> &Self {
        self.script
            .lock()
            .push_back(Scripted::Stall(delay, status, body.to_string()));
        self
    }

    fn requests(&self) -> Vec<RestRequest> {
        self.seen.lock().clone()
    }

    fn last_request(&self) -> RestRequest {
        self.seen.lock().last().cloned().expect("no request sent")
    }
}

#[async_trait]
impl RestTransport for ScriptedTransport {
    async fn execute(&self, request: RestRequest) -> TransportResult<RestResponse> {
        self.seen.lock().push(request);
        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Reply(status, body)) => Ok(RestResponse::new(status, body)),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Stall(delay, status, body)) => {
                tokio::time::sleep(delay).await;
                Ok(RestResponse::new(status, body))
            }
            None => Err(TransportError::Request("nothing scripted".to_string())),
        }
    }
}

struct Harness {
    client: ExchangeClient,
    transport: Arc<ScriptedTransport>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let _ = env_logger::try_init();

    let clock = Arc::new(ManualClock::starting_at(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 10).unwrap(),
    ));
    let transport = Arc::new(ScriptedTransport::default());
    let client = ExchangeClient::new(
        ConnectorConfig::default(),
        ApiCredentials::new("testApiKey", "testSecret"),
        transport.clone(),
        clock.clone(),
    )
    .expect("Failed to create client");

    Harness {
        client,
        transport,
        clock,
    }
}

fn exchange_info() -> Value {
    json!({
        "symbols": [{
            "symbol": "COINALPHA-HBOT",
            "status": "TRADING",
            "baseAsset": "COINALPHA",
            "quoteAsset": "HBOT",
            "minOrderSize": "0.001",
            "tickSize": "0.01",
            "stepSize": "0.001",
            "minNotional": "1"
        }, {
            "symbol": "ETH/XLM",
            "baseAsset": "ETH",
            "quoteAsset": "XLM"
        }, {
            "symbol": "BTCUSDT",
            "status": "HALT",
            "baseAsset": "BTC",
            "quoteAsset": "USDT"
        }]
    })
}

fn order_reply(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "userId": "testUserId",
        "market": "ETH/XLM",
        "type": "LIMIT",
        "bid": true,
        "size": 1.0,
        "price": 10000.0,
        "currency": "XLM",
        "status": status,
        "createdAt": "2025-01-01T00:00:00.000Z"
    })
}

fn deadline() -> Deadline {
    Deadline::within(Duration::from_secs(5))
}

async fn loaded() -> Harness {
    let h = harness();
    h.transport.reply(200, exchange_info());
    h.client
        .fetch_exchange_info(deadline())
        .await
        .expect("exchange info");
    h
}

fn limit_buy() -> OrderRequest {
    OrderRequest::limit("ETH-XLM", Side::Buy, dec!(1), dec!(10000))
}

#[tokio::test]
async fn test_exchange_info_refreshes_symbols_and_rules() {
    let h = harness();
    h.transport.reply(200, exchange_info());

    let rules = h.client.fetch_exchange_info(deadline()).await.unwrap();

    // The halted pair is mapped but has no tradable rule
    let pairs: Vec<_> = rules.iter().map(|r| r.trading_pair.as_str()).collect();
    assert_eq!(pairs, vec!["COINALPHA-HBOT", "ETH-XLM"]);
    assert_eq!(h.client.symbols().len(), 3);
    assert_eq!(h.client.symbols().to_exchange_symbol("ETH-XLM").unwrap(), "ETH/XLM");
    assert_eq!(h.client.symbols().to_canonical_pair("BTCUSDT").unwrap(), "BTC-USDT");
    assert!(!h.client.symbols().is_tradable("BTC-USDT"));

    let rule = h.client.trading_rule("COINALPHA-HBOT").unwrap();
    assert_eq!(rule.min_notional_size, dec!(1));

    let request = h.transport.last_request();
    assert_eq!(request.path, "exchangeInfo");
    assert!(request.header("Authorization").is_none());
}

#[tokio::test]
async fn test_place_order_translates_signs_and_tracks() {
    let h = loaded().await;
    h.transport.reply(200, order_reply("ex-1", "pending"));

    let order = h.client.place_order(limit_buy(), deadline()).await.unwrap();

    assert_eq!(order.state, OrderState::PendingCreate);
    assert_eq!(order.exchange_order_id.as_deref(), Some("ex-1"));
    assert!(order.client_order_id.starts_with("x-MG43PCSNB"));
    assert_eq!(order.client_order_id.len(), 32);

    let request = h.transport.last_request();
    assert_eq!(request.method, RestMethod::Post);
    assert_eq!(request.path, "order");
    assert_eq!(request.header("Authorization"), Some("Bearer testApiKey"));
    assert_eq!(request.header("x-api-key"), Some("testApiKey"));

    let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["market"], "ETH/XLM");
    assert_eq!(body["bid"], true);
    assert_eq!(body["type"], "LIMIT");
    assert_eq!(body["clientOrderId"], order.client_order_id.as_str());

    assert_eq!(h.client.active_orders().len(), 1);
}

#[tokio::test]
async fn test_status_poll_fills_and_acknowledge_evicts() {
    let h = loaded().await;
    h.transport.reply(200, order_reply("ex-1", "pending"));
    let order = h.client.place_order(limit_buy(), deadline()).await.unwrap();

    let mut filled = order_reply("ex-1", "filled");
    filled["executedSize"] = json!(1.0);
    h.transport.reply(200, filled);

    let report = h.client.fetch_order_status("ex-1", deadline()).await.unwrap();
    assert_eq!(report.state, OrderState::Filled);
    assert_eq!(report.trading_pair.as_deref(), Some("ETH-XLM"));

    let tracked = h.client.order(&order.client_order_id).unwrap();
    assert_eq!(tracked.state, OrderState::Filled);
    assert_eq!(tracked.executed_amount, dec!(1));
    assert!(h.client.active_orders().is_empty());

    // Terminal orders stay until acknowledged
    let evicted = h.client.acknowledge(&order.client_order_id).unwrap();
    assert_eq!(evicted.state, OrderState::Filled);
    assert!(h.client.order(&order.client_order_id).is_none());

    let request = h.transport.last_request();
    assert_eq!(request.method, RestMethod::Get);
    assert_eq!(request.path, "order/ex-1");
}

#[tokio::test]
async fn test_cancel_order() {
    let h = loaded().await;
    h.transport.reply(200, order_reply("ex-1", "open"));
    let order = h.client.place_order(limit_buy(), deadline()).await.unwrap();
    assert_eq!(order.state, OrderState::Open);

    h.transport
        .reply(200, json!({"status": "cancelled", "success": true}));
    let state = h.client.cancel_order("ex-1", deadline()).await.unwrap();

    assert_eq!(state, OrderState::Canceled);
    assert_eq!(
        h.client.order(&order.client_order_id).unwrap().state,
        OrderState::Canceled
    );
    assert_eq!(h.transport.last_request().method, RestMethod::Delete);
}

#[tokio::test]
async fn test_eleventh_order_in_a_second_is_throttled_locally() {
    let h = loaded().await;
    for i in 0..10 {
        h.transport.reply(200, order_reply(&format!("ex-{i}"), "pending"));
    }
    for _ in 0..10 {
        h.client.place_order(limit_buy(), deadline()).await.unwrap();
    }
    let sent = h.transport.requests().len();

    let err = h.client.place_order(limit_buy(), deadline()).await.unwrap_err();
    assert_eq!(
        err,
        ConnectorError::RateLimitExceeded {
            tier_id: "order".to_string(),
            retry_after: Duration::from_secs(1),
            retry_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 11).unwrap(),
        }
    );
    assert!(err.is_retryable());
    assert_eq!(h.transport.requests().len(), sent, "nothing may be sent");

    // Throttled submissions never reach the tracker
    assert_eq!(h.client.tracker().len(), 10);
    for _ in 0..100 {
        assert!(h.client.place_order(limit_buy(), deadline()).await.is_err());
    }
    assert_eq!(h.client.tracker().len(), 10);
    assert!(h.client.tracker().terminal_orders().is_empty());

    let weight = h.client.limiter().usage("REQUEST_WEIGHT").unwrap();
    assert_eq!(weight.used, 11);

    // Next window
    h.clock.advance(chrono::Duration::seconds(1));
    h.transport.reply(200, order_reply("ex-10", "pending"));
    assert!(h.client.place_order(limit_buy(), deadline()).await.is_ok());
}

#[tokio::test]
async fn test_deadline_passed_before_sending_releases_budget() {
    let h = loaded().await;
    let sent = h.transport.requests().len();

    let err = h
        .client
        .fetch_balances(Deadline::within(Duration::ZERO))
        .await
        .unwrap_err();

    assert_eq!(err, ConnectorError::DeadlineExceeded { sent: false });
    assert_eq!(h.transport.requests().len(), sent);
    assert_eq!(h.client.limiter().usage("account").unwrap().used, 0);
    assert_eq!(h.client.limiter().usage("REQUEST_WEIGHT").unwrap().used, 1);

    // An order that never left the process is not tracked
    let err = h
        .client
        .place_order(limit_buy(), Deadline::within(Duration::ZERO))
        .await
        .unwrap_err();
    assert_eq!(err, ConnectorError::DeadlineExceeded { sent: false });
    assert!(h.client.tracker().is_empty());
    assert_eq!(h.client.limiter().usage("order").unwrap().used, 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_after_sending_keeps_budget_charged() {
    let h = loaded().await;
    h.transport
        .stall(Duration::from_secs(30), 200, order_reply("ex-1", "pending"));

    let err = h
        .client
        .place_order(limit_buy(), Deadline::within(Duration::from_secs(1)))
        .await
        .unwrap_err();

    assert_eq!(err, ConnectorError::DeadlineExceeded { sent: true });
    assert_eq!(h.client.limiter().usage("order").unwrap().used, 1);

    // Outcome unknown: the order stays pending for reconciliation
    let pending = h.client.active_orders();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].state, OrderState::PendingCreate);
}

fn list_entry(id: &str, status: &str) -> Value {
    json!([{
        "id": id,
        "market": "ETH/XLM",
        "price": 10000.0,
        "timestamp": "1735689600000000000",
        "originalSize": 1.0,
        "status": status,
        "bids": true,
        "size": 1.0,
        "matchedOrders": []
    }])
}

#[tokio::test]
async fn test_status_poll_after_list_poll_is_applied() {
    let h = loaded().await;
    h.transport.reply(200, order_reply("ex-9", "pending"));
    let order = h.client.place_order(limit_buy(), deadline()).await.unwrap();

    h.clock.advance(chrono::Duration::seconds(1));
    h.transport.reply(200, list_entry("ex-9", "OPEN"));
    h.client.fetch_open_orders(deadline()).await.unwrap();
    assert_eq!(h.client.order(&order.client_order_id).unwrap().state, OrderState::Open);

    // The exchange's update time predates the list poll's local receipt time;
    // the single poll was still issued later and must win
    let mut filled = order_reply("ex-9", "FILLED");
    filled["executedSize"] = json!(1.0);
    filled["updatedAt"] = json!("2025-01-01T00:00:10.900Z");
    for _ in 0..3 {
        h.transport.reply(200, filled.clone());
        let report = h.client.fetch_order_status("ex-9", deadline()).await.unwrap();
        assert_eq!(report.state, OrderState::Filled);
    }

    let tracked = h.client.order(&order.client_order_id).unwrap();
    assert_eq!(tracked.state, OrderState::Filled);
    assert_eq!(tracked.executed_amount, dec!(1));
}

#[tokio::test(start_paused = true)]
async fn test_reply_overtaken_by_another_endpoint_is_discarded() {
    let h = loaded().await;
    h.transport.reply(200, order_reply("ex-1", "open"));
    let order = h.client.place_order(limit_buy(), deadline()).await.unwrap();

    // List poll goes out first and answers late
    h.transport
        .stall(Duration::from_secs(2), 200, list_entry("ex-1", "OPEN"));
    let list = h.client.fetch_open_orders(deadline());
    tokio::pin!(list);
    tokio::select! {
        biased;
        _ = &mut list => panic!("list poll answered early"),
        _ = tokio::task::yield_now() => {}
    }
    assert_eq!(h.transport.last_request().path, "order/active-orders");

    let mut partial = order_reply("ex-1", "PARTIAL");
    partial["executedSize"] = json!(0.4);
    h.transport.reply(200, partial);
    h.client.fetch_order_status("ex-1", deadline()).await.unwrap();

    let stale = list.await.unwrap();
    assert_eq!(stale[0].state, OrderState::Open);
    let tracked = h.client.order(&order.client_order_id).unwrap();
    assert_eq!(tracked.state, OrderState::PartiallyFilled);
    assert_eq!(tracked.executed_amount, dec!(0.4));

    // Terminal after a cancel; later polls do not reopen it
    h.transport
        .reply(200, json!({"status": "cancelled", "success": true}));
    h.client.cancel_order("ex-1", deadline()).await.unwrap();
    h.transport.reply(200, list_entry("ex-1", "OPEN"));
    h.client.fetch_all_orders(deadline()).await.unwrap();
    h.transport.reply(200, order_reply("ex-1", "PARTIAL"));
    h.client.fetch_order_status("ex-1", deadline()).await.unwrap();

    assert_eq!(
        h.client.order(&order.client_order_id).unwrap().state,
        OrderState::Canceled
    );
}

#[tokio::test]
async fn test_connect_failure_releases_and_fails_order() {
    let h = loaded().await;
    h.transport
        .fail(TransportError::Connect("connection refused".to_string()));

    let err = h.client.place_order(limit_buy(), deadline()).await.unwrap_err();

    assert!(matches!(err, ConnectorError::TransportFailure(TransportError::Connect(_))));
    assert_eq!(h.client.limiter().usage("order").unwrap().used, 0);
    assert!(h.client.active_orders().is_empty());
    assert_eq!(h.client.tracker().terminal_orders()[0].state, OrderState::Failed);
}

#[tokio::test]
async fn test_error_responses_are_classified() {
    let h = loaded().await;

    h.transport
        .reply(404, json!({"code": -2013, "msg": "Order does not exist."}));
    assert_eq!(
        h.client.fetch_order_status("missing", deadline()).await.unwrap_err(),
        ConnectorError::OrderNotFound("Order does not exist.".to_string())
    );

    h.transport.reply(401, json!({"message": "Invalid API key"}));
    assert!(matches!(
        h.client.fetch_balances(deadline()).await.unwrap_err(),
        ConnectorError::AuthenticationRejected { status: 401, .. }
    ));

    h.transport.reply(503, json!({"msg": "maintenance"}));
    let err = h.client.ping(deadline()).await.unwrap_err();
    assert!(err.is_retryable(), "{err:?}");

    // Every one of them reached the exchange
    assert_eq!(h.client.limiter().stats().recorded, 4);
}

#[tokio::test]
async fn test_unrecognized_status_is_propagated() {
    let h = loaded().await;
    h.transport.reply(200, order_reply("ex-1", "partially_filled"));

    assert_eq!(
        h.client.fetch_order_status("ex-1", deadline()).await.unwrap_err(),
        ConnectorError::UnrecognizedStatus("partially_filled".to_string())
    );
}

#[tokio::test]
async fn test_unknown_pair_consumes_no_budget() {
    let h = loaded().await;
    let before = h.client.limiter().usage("REQUEST_WEIGHT").unwrap().used;

    assert_eq!(
        h.client.fetch_ticker("DOGE-USDT", deadline()).await.unwrap_err(),
        ConnectorError::UnknownPair("DOGE-USDT".to_string())
    );
    assert_eq!(h.client.limiter().usage("REQUEST_WEIGHT").unwrap().used, before);

    // Halted pairs resolve but cannot be traded
    let err = h
        .client
        .place_order(
            OrderRequest::market("BTC-USDT", Side::Sell, dec!(1)),
            deadline(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidOrder(_)));
}

#[tokio::test]
async fn test_trading_rule_rejects_small_orders() {
    let h = loaded().await;
    let sent = h.transport.requests().len();

    let err = h
        .client
        .place_order(
            OrderRequest::limit("COINALPHA-HBOT", Side::Buy, dec!(0.01), dec!(10)),
            deadline(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::InvalidOrder(_)));
    assert_eq!(h.transport.requests().len(), sent);
    assert!(h.client.tracker().is_empty());
}

#[tokio::test]
async fn test_market_data() {
    let h = loaded().await;

    h.transport
        .reply(200, json!({"symbol": "ETH/XLM", "price": "0.0412"}));
    let ticker = h.client.fetch_ticker("ETH-XLM", deadline()).await.unwrap();
    assert_eq!(ticker.price, dec!(0.0412));
    assert_eq!(h.transport.last_request().query_string(), "symbol=ETH/XLM");

    h.transport.reply(
        200,
        json!([
            {"symbol": "ETH/XLM", "price": "0.0412"},
            {"symbol": "DOGEUSDT", "price": "0.1"}
        ]),
    );
    let prices = h.client.fetch_all_prices(deadline()).await.unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].trading_pair, "ETH-XLM");

    h.transport.reply(
        200,
        json!({
            "symbol": "COINALPHA-HBOT",
            "bidPrice": "9.5", "bidQty": "2",
            "askPrice": "10.5", "askQty": "3"
        }),
    );
    let book = h
        .client
        .fetch_book_ticker("COINALPHA-HBOT", deadline())
        .await
        .unwrap();
    assert_eq!(book.mid_price(), dec!(10));
    assert_eq!(book.spread(), dec!(1));
}

#[tokio::test]
async fn test_account_and_order_lists() {
    let h = loaded().await;

    h.transport.reply(
        200,
        json!({"balances": [{"currency": "XLM", "available": "10", "total": "15"}]}),
    );
    let balances = h.client.fetch_balances(deadline()).await.unwrap();
    assert_eq!(balances[0].asset, "XLM");
    assert_eq!(balances[0].locked(), dec!(5));

    h.transport.reply(
        200,
        json!([{
            "id": "88f45fe7",
            "market": "ETH/XLM",
            "price": 0.02,
            "timestamp": "1735689600000000000",
            "originalSize": 0.01,
            "status": "PENDING",
            "bids": true,
            "size": 0.01,
            "matchedOrders": []
        }]),
    );
    let open = h.client.fetch_open_orders(deadline()).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].trading_pair.as_deref(), Some("ETH-XLM"));
    assert_eq!(open[0].state, OrderState::PendingCreate);
    assert_eq!(h.transport.last_request().path, "order/active-orders");

    h.transport.reply(
        200,
        json!([{
            "id": 28457,
            "orderId": "88f45fe7",
            "symbol": "ETH/XLM",
            "price": "0.02",
            "qty": "0.01",
            "commission": "0.0001",
            "commissionAsset": "XLM",
            "time": 1735689600000i64,
            "isBuyer": false
        }]),
    );
    let fills = h.client.fetch_my_trades("ETH-XLM", deadline()).await.unwrap();
    assert_eq!(fills[0].trade_id, "28457");
    assert_eq!(fills[0].side, Side::Sell);
    assert_eq!(fills[0].fee, dec!(0.0001));
}

#[tokio::test]
async fn test_sync_time_applies_offset() {
    let h = harness();
    let server_ms = h.clock.now().timestamp_millis() + 2_500;
    h.transport.reply(200, json!({"serverTime": server_ms}));

    let offset = h.client.sync_time(deadline()).await.unwrap();
    assert_eq!(offset.num_milliseconds(), 2_500);
}

#[tokio::test]
async fn test_stream_messages_use_canonical_pairs() {
    let h = loaded().await;

    let subscribe = h
        .client
        .subscription_request(&["COINALPHA-HBOT"], 1)
        .unwrap();
    assert_eq!(subscribe.payload["method"], "SUBSCRIBE");
    assert_eq!(subscribe.payload["params"][0], "coinalpha-hbot@depth");

    let frame = json!({
        "e": "trade", "E": 1, "s": "COINALPHA-HBOT",
        "t": 7, "p": "10", "q": "2", "T": 1, "m": false
    })
    .to_string();
    let Some(StreamEvent::Trade(trade)) = h.client.parse_stream_message(&frame).unwrap() else {
        panic!("Expected Trade");
    };
    assert_eq!(trade.trading_pair, "COINALPHA-HBOT");
    assert_eq!(trade.taker_side(), Side::Buy);

    assert!(h.client.parse_stream_message(r#"{"result":null,"id":1}"#).unwrap().is_none());
}
