//! Exchange client
//!
//! Every REST operation runs the same pipeline:
//!
//! ```text
//! resolve symbol ─► reserve budget ─► decorate ─► deadline check ─► transport
//!                                                                     │
//!           parse ◄─ classify status ◄─ record usage / release ◄──────┘
//! ```
//!
//! Budget that was reserved for a call that never left the process is
//! released; anything that may have reached the exchange stays charged.
//!
//! Each issued request takes an order-tracking sequence just before it goes to
//! the transport. Replies from different endpoints are therefore ordered by
//! when they were requested, not by when they arrived.

use apiengine_clock::{OffsetClock, SystemClock};
use apiengine_core::{
    Balance, BookTicker, InFlightOrder, OrderState, OrderType, OrderUpdate, Price, Quantity, Side,
    Ticker, Timestamp, TradeFill, TradingPair, TradingRule, UpdateOutcome,
};
use apiengine_ports::{Clock, RestRequest, RestTransport, WsRequest};
use apiengine_throttler::{RateLimiter, TierTable};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{ApiCredentials, ApiEngineAuth, AuthInjector};
use crate::config::ConnectorConfig;
use crate::constants::{EXCHANGE_NAME, rate_limit_tiers};
use crate::endpoints::Endpoint;
use crate::error::{ConnectorError, Result};
use crate::messages::rest::{
    AccountResponse, BookTickerResponse, CancelOrderResponse, EndpointLimitsResponse,
    ExchangeInfoResponse, OrderListEntry, OrderResponse, PlaceOrderRequest, RateLimitsResponse,
    ServerTimeResponse, TickerPricePayload, TradeEntry,
};
use crate::messages::stream::{self, StreamEvent};
use crate::normalizer::normalize;
use crate::symbols::SymbolTable;
use crate::tracker::{OrderStatusReport, OrderTracker};
use crate::transport::HttpTransport;
use crate::utils::{new_client_order_id, validate_client_order_id};

/// Point in time by which a call must complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(tokio::time::Instant);

impl Deadline {
    pub fn within(timeout: Duration) -> Self {
        Deadline(tokio::time::Instant::now() + timeout)
    }

    pub fn at(instant: tokio::time::Instant) -> Self {
        Deadline(instant)
    }

    pub fn instant(&self) -> tokio::time::Instant {
        self.0
    }

    pub fn has_passed(&self) -> bool {
        tokio::time::Instant::now() >= self.0
    }
}

/// Order to submit
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub trading_pair: TradingPair,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Quantity,
    /// Required for limit orders
    pub price: Option<Price>,
}

impl OrderRequest {
    pub fn limit(
        trading_pair: impl Into<TradingPair>,
        side: Side,
        amount: Quantity,
        price: Price,
    ) -> Self {
        Self {
            trading_pair: trading_pair.into(),
            side,
            order_type: OrderType::Limit,
            amount,
            price: Some(price),
        }
    }

    pub fn market(trading_pair: impl Into<TradingPair>, side: Side, amount: Quantity) -> Self {
        Self {
            trading_pair: trading_pair.into(),
            side,
            order_type: OrderType::Market,
            amount,
            price: None,
        }
    }
}

/// Reply body and the sequence taken when its request was issued
struct Reply<T> {
    sequence: u64,
    body: T,
}

/// Whether an order submission that failed with `e` may still exist on the
/// exchange
fn may_have_been_accepted(e: &ConnectorError) -> bool {
    match e {
        ConnectorError::DeadlineExceeded { sent } => *sent,
        ConnectorError::TransportFailure(t) => t.reached_exchange(),
        // 2xx with a body we could not read
        ConnectorError::Parse(_) => true,
        ConnectorError::Exchange { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Rate-safe, authenticated client for one exchange session
pub struct ExchangeClient {
    config: ConnectorConfig,
    transport: Arc<dyn RestTransport>,
    auth: Arc<dyn AuthInjector>,
    limiter: RateLimiter,
    symbols: SymbolTable,
    trading_rules: RwLock<HashMap<TradingPair, TradingRule>>,
    tracker: OrderTracker,
    /// Local clock shifted to the exchange's time
    clock: Arc<OffsetClock>,
}

impl ExchangeClient {
    /// Build a client over an arbitrary transport and clock.
    ///
    /// Rate-limit windows run on `clock`; signatures and order timestamps use
    /// the same clock corrected by the offset from the last [`sync_time`](Self::sync_time).
    pub fn new(
        config: ConnectorConfig,
        credentials: ApiCredentials,
        transport: Arc<dyn RestTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let table = TierTable::new(rate_limit_tiers())
            .map_err(|e| ConnectorError::Configuration(e.to_string()))?;
        let limiter = RateLimiter::new(table, clock.clone());
        let offset_clock = Arc::new(OffsetClock::new(clock, EXCHANGE_NAME));
        let auth = Arc::new(ApiEngineAuth::new(
            credentials,
            config.signing,
            offset_clock.clone(),
        ));

        info!(
            "{} client ready ({}, {:?} signing)",
            EXCHANGE_NAME, config.rest_url, config.signing
        );

        Ok(Self {
            symbols: SymbolTable::new(config.missing_status_policy),
            config,
            transport,
            auth,
            limiter,
            trading_rules: RwLock::new(HashMap::new()),
            tracker: OrderTracker::new(),
            clock: offset_clock,
        })
    }

    /// Client on the production HTTP transport and the system clock
    pub fn connect(config: ConnectorConfig, credentials: ApiCredentials) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.rest_url, config.request_timeout())?);
        Self::new(config, credentials, transport, Arc::new(SystemClock::new()))
    }

    /// Replace the authentication layer
    pub fn with_auth(mut self, auth: Arc<dyn AuthInjector>) -> Self {
        self.auth = auth;
        self
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn tracker(&self) -> &OrderTracker {
        &self.tracker
    }

    /// Exchange-corrected clock
    pub fn clock(&self) -> &Arc<OffsetClock> {
        &self.clock
    }

    /// Deadline derived from the configured request timeout
    pub fn default_deadline(&self) -> Deadline {
        Deadline::within(self.config.request_timeout())
    }

    // ------------------------------------------------------------------
    // Request pipeline
    // ------------------------------------------------------------------

    /// Issue one request against `endpoint` and return the body of a 2xx reply
    async fn execute(
        &self,
        endpoint: &Endpoint,
        request: RestRequest,
        deadline: Deadline,
    ) -> Result<Reply<String>> {
        self.execute_with(endpoint, request, deadline, || Ok(())).await
    }

    /// [`execute`](Self::execute), running `on_issue` once budget is reserved
    /// and the deadline checked. If it fails the request is not sent and the
    /// reservation is released.
    async fn execute_with<F>(
        &self,
        endpoint: &Endpoint,
        request: RestRequest,
        deadline: Deadline,
        on_issue: F,
    ) -> Result<Reply<String>>
    where
        F: FnOnce() -> Result<()>,
    {
        let reservation = self.limiter.reserve(endpoint.limit_id()).inspect_err(|e| {
            debug!("{} {} throttled: {}", request.method.as_str(), request.path, e);
        })?;

        let request = if endpoint.is_auth_required() {
            self.auth.decorate_rest(request)
        } else {
            request
        };

        if deadline.has_passed() {
            self.limiter.release(reservation);
            return Err(ConnectorError::DeadlineExceeded { sent: false });
        }
        if let Err(e) = on_issue() {
            self.limiter.release(reservation);
            return Err(e);
        }
        let sequence = self.tracker.next_sequence(self.clock.local().now());

        let method = request.method;
        let path = request.path.clone();
        let outcome = tokio::time::timeout_at(deadline.instant(), self.transport.execute(request)).await;

        let response = match outcome {
            Err(_) => {
                self.limiter.record_usage(reservation);
                warn!("{} {} abandoned at deadline", method.as_str(), path);
                return Err(ConnectorError::DeadlineExceeded { sent: true });
            }
            Ok(Err(e)) => {
                if e.reached_exchange() {
                    self.limiter.record_usage(reservation);
                } else {
                    self.limiter.release(reservation);
                }
                warn!("{} {} failed: {}", method.as_str(), path, e);
                return Err(e.into());
            }
            Ok(Ok(response)) => {
                self.limiter.record_usage(reservation);
                response
            }
        };

        if !response.is_success() {
            let err = ConnectorError::from_response(
                response.status,
                &response.body,
                self.clock.local().now(),
            );
            warn!("{} {} rejected: {}", method.as_str(), path, err);
            return Err(err);
        }
        Ok(Reply {
            sequence,
            body: response.body,
        })
    }

    fn parse<T: DeserializeOwned>(endpoint: &Endpoint, reply: Reply<String>) -> Result<Reply<T>> {
        let body = serde_json::from_str(&reply.body).map_err(|e| {
            ConnectorError::Parse(format!("{}: {} in {}", endpoint.path(), e, reply.body))
        })?;
        Ok(Reply {
            sequence: reply.sequence,
            body,
        })
    }

    async fn sequenced_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: RestRequest,
        deadline: Deadline,
    ) -> Result<Reply<T>> {
        let reply = self.execute(&endpoint, request, deadline).await?;
        Self::parse(&endpoint, reply)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: RestRequest,
        deadline: Deadline,
    ) -> Result<T> {
        self.sequenced_json(endpoint, request, deadline)
            .await
            .map(|reply| reply.body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        deadline: Deadline,
    ) -> Result<T> {
        let request = endpoint.request();
        self.request_json(endpoint, request, deadline).await
    }

    // ------------------------------------------------------------------
    // Connectivity & time
    // ------------------------------------------------------------------

    pub async fn ping(&self, deadline: Deadline) -> Result<()> {
        self.execute(&Endpoint::Ping, Endpoint::Ping.request(), deadline)
            .await
            .map(|_| ())
    }

    pub async fn server_time(&self, deadline: Deadline) -> Result<Timestamp> {
        let response: ServerTimeResponse = self.get_json(Endpoint::ServerTime, deadline).await?;
        DateTime::<Utc>::from_timestamp_millis(response.server_time).ok_or_else(|| {
            ConnectorError::Parse(format!("server time out of range: {}", response.server_time))
        })
    }

    /// Measure the offset to the exchange's clock and apply it to
    /// [`clock`](Self::clock). Returns the new offset.
    pub async fn sync_time(&self, deadline: Deadline) -> Result<chrono::Duration> {
        let sent_at = self.clock.local().now();
        let server_time = self.server_time(deadline).await?;
        let received_at = self.clock.local().now();

        self.clock.observe(server_time, sent_at, received_at);
        info!(
            "Time synchronized with {}: offset {} ms",
            EXCHANGE_NAME,
            self.clock.offset().num_milliseconds()
        );
        Ok(self.clock.offset())
    }

    // ------------------------------------------------------------------
    // Market data
    // ------------------------------------------------------------------

    /// Refresh the symbol table and trading rules from `exchangeInfo`.
    ///
    /// Returns the rules of pairs currently open for trading.
    pub async fn fetch_exchange_info(&self, deadline: Deadline) -> Result<Vec<TradingRule>> {
        let info: ExchangeInfoResponse = self.get_json(Endpoint::ExchangeInfo, deadline).await?;

        let entries: Vec<_> = info.symbols.iter().map(|s| s.to_entry()).collect();
        self.symbols.refresh(&entries)?;

        let mut rules: HashMap<TradingPair, TradingRule> = HashMap::new();
        for (symbol, entry) in info.symbols.iter().zip(&entries) {
            let pair = entry.canonical_pair();
            rules.insert(pair.clone(), symbol.to_trading_rule(pair));
        }

        let mut tradable: Vec<TradingRule> = rules
            .values()
            .filter(|rule| self.symbols.is_tradable(&rule.trading_pair))
            .cloned()
            .collect();
        tradable.sort_by(|a, b| a.trading_pair.cmp(&b.trading_pair));

        info!(
            "Loaded {} trading rules ({} tradable)",
            rules.len(),
            tradable.len()
        );
        *self.trading_rules.write() = rules;
        Ok(tradable)
    }

    pub fn trading_rule(&self, trading_pair: &str) -> Option<TradingRule> {
        self.trading_rules.read().get(trading_pair).cloned()
    }

    pub async fn fetch_ticker(&self, trading_pair: &str, deadline: Deadline) -> Result<Ticker> {
        let symbol = self.symbols.to_exchange_symbol(trading_pair)?;
        let request = Endpoint::TickerPrice.request().with_query("symbol", &symbol);
        let payload: TickerPricePayload = self
            .request_json(Endpoint::TickerPrice, request, deadline)
            .await?;

        let ticker = payload
            .into_vec()
            .into_iter()
            .find(|t| t.symbol == symbol)
            .ok_or_else(|| ConnectorError::Parse(format!("no price for {}", symbol)))?;

        Ok(Ticker {
            trading_pair: trading_pair.to_string(),
            price: ticker.price,
        })
    }

    /// Last price of every known pair. Symbols missing from the table are skipped.
    pub async fn fetch_all_prices(&self, deadline: Deadline) -> Result<Vec<Ticker>> {
        let payload: TickerPricePayload = self.get_json(Endpoint::TickerPrice, deadline).await?;
        let symbols = self.symbols.snapshot();

        Ok(payload
            .into_vec()
            .into_iter()
            .filter_map(|t| match symbols.to_canonical_pair(&t.symbol) {
                Ok(trading_pair) => Some(Ticker {
                    trading_pair,
                    price: t.price,
                }),
                Err(_) => {
                    debug!("Skipping price for unmapped symbol {}", t.symbol);
                    None
                }
            })
            .collect())
    }

    pub async fn fetch_book_ticker(
        &self,
        trading_pair: &str,
        deadline: Deadline,
    ) -> Result<BookTicker> {
        let symbol = self.symbols.to_exchange_symbol(trading_pair)?;
        let request = Endpoint::BookTicker.request().with_query("symbol", &symbol);
        let ticker: BookTickerResponse = self
            .request_json(Endpoint::BookTicker, request, deadline)
            .await?;

        Ok(BookTicker {
            trading_pair: trading_pair.to_string(),
            bid_price: ticker.bid_price,
            bid_size: ticker.bid_qty,
            ask_price: ticker.ask_price,
            ask_size: ticker.ask_qty,
        })
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Round amount and price down to the pair's step and tick sizes
    fn quantize(&self, mut order: OrderRequest) -> OrderRequest {
        if let Some(rule) = self.trading_rule(&order.trading_pair) {
            order.amount = rule.quantize_amount(order.amount);
            order.price = order.price.map(|price| rule.quantize_price(price));
        }
        order
    }

    fn check_order(&self, order: &OrderRequest) -> Result<()> {
        if order.amount <= Decimal::ZERO {
            return Err(ConnectorError::InvalidOrder(format!(
                "amount must be positive, got {}",
                order.amount
            )));
        }
        match (order.order_type.requires_price(), order.price) {
            (true, None) => {
                return Err(ConnectorError::InvalidOrder(
                    "limit order without price".to_string(),
                ));
            }
            (_, Some(price)) if price <= Decimal::ZERO => {
                return Err(ConnectorError::InvalidOrder(format!(
                    "price must be positive, got {}",
                    price
                )));
            }
            _ => {}
        }
        if let Some(rule) = self.trading_rule(&order.trading_pair) {
            rule.check(order.amount, order.price)
                .map_err(|v| ConnectorError::InvalidOrder(v.to_string()))?;
        }
        Ok(())
    }

    /// Submit an order and start tracking it.
    ///
    /// The order is tracked once budget is reserved and just before the
    /// request is sent; calls throttled or out of time before that leave the
    /// tracker untouched. If the exchange certainly did not accept a sent
    /// order, it is marked `Failed`. If the outcome is unknown (deadline hit
    /// after sending) it stays `PendingCreate` for the caller to reconcile.
    pub async fn place_order(&self, order: OrderRequest, deadline: Deadline) -> Result<InFlightOrder> {
        let order = self.quantize(order);
        self.check_order(&order)?;
        let symbol = self.symbols.to_exchange_symbol(&order.trading_pair)?;
        if !self.symbols.is_tradable(&order.trading_pair) {
            return Err(ConnectorError::InvalidOrder(format!(
                "{} is not open for trading",
                order.trading_pair
            )));
        }

        let client_order_id = new_client_order_id(&self.config.client_order_id_prefix, order.side);
        validate_client_order_id(&client_order_id)?;

        let body = PlaceOrderRequest {
            market: symbol,
            bid: order.side == Side::Buy,
            size: order.amount,
            price: order.price,
            order_type: order.order_type.as_str().to_string(),
            client_order_id: client_order_id.clone(),
        };
        let request = Endpoint::PlaceOrder
            .request()
            .with_body(serde_json::to_string(&body)?);

        let tracked = InFlightOrder::new(
            client_order_id.clone(),
            order.trading_pair.clone(),
            order.side,
            order.order_type,
            order.amount,
            order.price,
            self.clock.now(),
        );
        info!(
            "Placing {} {} {} {} @ {:?} as {}",
            order.order_type.as_str(),
            order.side.as_str(),
            order.amount,
            order.trading_pair,
            order.price,
            client_order_id
        );

        let endpoint = Endpoint::PlaceOrder;
        let mut issued = false;
        let sent = self
            .execute_with(&endpoint, request, deadline, || {
                self.tracker.track(tracked)?;
                issued = true;
                Ok(())
            })
            .await
            .and_then(|reply| Self::parse::<OrderResponse>(&endpoint, reply));
        let reply = match sent {
            Ok(reply) => reply,
            Err(e) => {
                if issued && !may_have_been_accepted(&e) {
                    self.mark_failed(&client_order_id);
                }
                return Err(e);
            }
        };
        let response = reply.body;

        let state = normalize(&response.status)?;
        let update = OrderUpdate {
            client_order_id: client_order_id.clone(),
            exchange_order_id: Some(response.id.clone()),
            state,
            executed_amount: response.executed_size,
            sequence: reply.sequence,
            update_time: response
                .updated_at
                .or(response.created_at)
                .unwrap_or_else(|| self.clock.now()),
        };
        self.tracker.apply(&update)?;

        self.tracker
            .get(&client_order_id)
            .ok_or_else(|| ConnectorError::UnknownOrder(client_order_id))
    }

    fn mark_failed(&self, client_order_id: &str) {
        let now = self.clock.now();
        let update = OrderUpdate {
            client_order_id: client_order_id.to_string(),
            exchange_order_id: None,
            state: OrderState::Failed,
            executed_amount: None,
            sequence: self.tracker.next_sequence(self.clock.local().now()),
            update_time: now,
        };
        if let Err(e) = self.tracker.apply(&update) {
            warn!("Could not mark {} failed: {}", client_order_id, e);
        }
    }

    /// Cancel by exchange order id. Returns the state the exchange reports.
    pub async fn cancel_order(
        &self,
        exchange_order_id: &str,
        deadline: Deadline,
    ) -> Result<OrderState> {
        let endpoint = Endpoint::CancelOrder(exchange_order_id.to_string());
        let request = endpoint.request();
        let Reply {
            sequence,
            body: response,
        } = self.sequenced_json::<CancelOrderResponse>(endpoint, request, deadline).await?;

        if response.success == Some(false) {
            return Err(ConnectorError::Exchange {
                status: 200,
                code: None,
                message: format!("cancel of {} not accepted", exchange_order_id),
            });
        }
        let state = match response.status.as_deref() {
            Some(status) => normalize(status)?,
            None => OrderState::Canceled,
        };

        let now = self.clock.now();
        self.observe(&OrderStatusReport {
            exchange_order_id: exchange_order_id.to_string(),
            trading_pair: None,
            state,
            amount: None,
            price: None,
            executed_amount: None,
            update_time: now,
            sequence,
        });
        Ok(state)
    }

    /// Poll one order. Tracked orders are updated from the report.
    pub async fn fetch_order_status(
        &self,
        exchange_order_id: &str,
        deadline: Deadline,
    ) -> Result<OrderStatusReport> {
        let endpoint = Endpoint::OrderStatus(exchange_order_id.to_string());
        let request = endpoint.request();
        let Reply {
            sequence,
            body: response,
        } = self.sequenced_json::<OrderResponse>(endpoint, request, deadline).await?;

        let received_at = self.clock.now();
        let report = OrderStatusReport {
            exchange_order_id: response.id.clone(),
            trading_pair: response
                .market
                .as_deref()
                .and_then(|market| self.canonical_or_warn(market)),
            state: normalize(&response.status)?,
            amount: response.size,
            price: response.price,
            executed_amount: response.executed_size,
            update_time: response.updated_at.unwrap_or(received_at),
            sequence,
        };
        self.observe(&report);
        Ok(report)
    }

    pub async fn fetch_open_orders(&self, deadline: Deadline) -> Result<Vec<OrderStatusReport>> {
        self.list_reports(Endpoint::ActiveOrders, deadline).await
    }

    pub async fn fetch_all_orders(&self, deadline: Deadline) -> Result<Vec<OrderStatusReport>> {
        self.list_reports(Endpoint::AllOrders, deadline).await
    }

    /// Every entry of one list shares the sequence of the request
    async fn list_reports(
        &self,
        endpoint: Endpoint,
        deadline: Deadline,
    ) -> Result<Vec<OrderStatusReport>> {
        let request = endpoint.request();
        let Reply {
            sequence,
            body: entries,
        } = self
            .sequenced_json::<Vec<OrderListEntry>>(endpoint, request, deadline)
            .await?;
        let received_at = self.clock.now();

        let mut reports = Vec::with_capacity(entries.len());
        for entry in entries {
            let report = OrderStatusReport {
                trading_pair: self.canonical_or_warn(&entry.market),
                state: normalize(&entry.status)?,
                amount: entry.original_size.or(Some(entry.size)),
                price: entry.price,
                executed_amount: entry.executed_amount(),
                update_time: received_at,
                sequence,
                exchange_order_id: entry.id,
            };
            self.observe(&report);
            reports.push(report);
        }
        Ok(reports)
    }

    fn canonical_or_warn(&self, symbol: &str) -> Option<TradingPair> {
        match self.symbols.to_canonical_pair(symbol) {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Apply a report to the tracked order with that exchange id, if any
    fn observe(&self, report: &OrderStatusReport) {
        let Some(client_order_id) = self.tracker.client_order_id(&report.exchange_order_id) else {
            return;
        };
        if let Err(e) = self.tracker.apply(&report.to_update(client_order_id)) {
            debug!("Report for {} not applied: {}", report.exchange_order_id, e);
        }
    }

    // ------------------------------------------------------------------
    // Account
    // ------------------------------------------------------------------

    pub async fn fetch_balances(&self, deadline: Deadline) -> Result<Vec<Balance>> {
        let account: AccountResponse = self.get_json(Endpoint::Account, deadline).await?;
        Ok(account.balances.iter().map(Balance::from).collect())
    }

    /// Fills for one pair. Fills without a side are matched to tracked orders;
    /// those that cannot be attributed are skipped.
    pub async fn fetch_my_trades(
        &self,
        trading_pair: &str,
        deadline: Deadline,
    ) -> Result<Vec<TradeFill>> {
        let symbol = self.symbols.to_exchange_symbol(trading_pair)?;
        let request = Endpoint::MyTrades.request().with_query("symbol", &symbol);
        let entries: Vec<TradeEntry> = self
            .request_json(Endpoint::MyTrades, request, deadline)
            .await?;

        let mut fills = Vec::with_capacity(entries.len());
        for entry in entries {
            let exchange_order_id = entry.exchange_order_id();
            let side = match entry.is_buyer {
                Some(true) => Side::Buy,
                Some(false) => Side::Sell,
                None => match self.tracker.get_by_exchange_id(&exchange_order_id) {
                    Some(order) => order.side,
                    None => {
                        warn!("Skipping fill {} with unknown side", entry.trade_id());
                        continue;
                    }
                },
            };
            let timestamp = DateTime::<Utc>::from_timestamp_millis(entry.time).ok_or_else(|| {
                ConnectorError::Parse(format!("trade time out of range: {}", entry.time))
            })?;

            fills.push(TradeFill {
                trade_id: entry.trade_id(),
                exchange_order_id,
                trading_pair: trading_pair.to_string(),
                side,
                price: entry.price,
                amount: entry.qty,
                fee: entry.commission.unwrap_or_default(),
                fee_asset: entry.commission_asset,
                timestamp,
            });
        }
        Ok(fills)
    }

    // ------------------------------------------------------------------
    // Rate limit documents
    // ------------------------------------------------------------------

    pub async fn fetch_rate_limits(&self, deadline: Deadline) -> Result<RateLimitsResponse> {
        self.get_json(Endpoint::RateLimits, deadline).await
    }

    pub async fn fetch_endpoint_limits(&self, deadline: Deadline) -> Result<EndpointLimitsResponse> {
        self.get_json(Endpoint::RateLimitEndpoints, deadline).await
    }

    pub async fn fetch_rate_limit_documentation(
        &self,
        deadline: Deadline,
    ) -> Result<serde_json::Value> {
        self.get_json(Endpoint::RateLimitDocumentation, deadline)
            .await
    }

    // ------------------------------------------------------------------
    // Tracked orders
    // ------------------------------------------------------------------

    pub fn order(&self, client_order_id: &str) -> Option<InFlightOrder> {
        self.tracker.get(client_order_id)
    }

    pub fn active_orders(&self) -> Vec<InFlightOrder> {
        self.tracker.active_orders()
    }

    /// Sequence for an update observed now, ordered against REST replies
    pub fn next_sequence(&self) -> u64 {
        self.tracker.next_sequence(self.clock.local().now())
    }

    /// Apply an externally observed update (e.g. from a private stream).
    /// Take its sequence from [`next_sequence`](Self::next_sequence).
    pub fn apply_update(&self, update: &OrderUpdate) -> Result<UpdateOutcome> {
        self.tracker.apply(update)
    }

    /// Release a terminal order from tracking
    pub fn acknowledge(&self, client_order_id: &str) -> Result<InFlightOrder> {
        self.tracker.acknowledge(client_order_id)
    }

    // ------------------------------------------------------------------
    // Stream
    // ------------------------------------------------------------------

    pub fn wss_url(&self) -> &str {
        &self.config.wss_url
    }

    /// Parse a market data frame, translating the symbol to its pair
    pub fn parse_stream_message(&self, text: &str) -> Result<Option<StreamEvent>> {
        stream::parse_event(text, &self.symbols.snapshot())
    }

    /// Subscription frame for depth and trades of the given pairs
    pub fn subscription_request(&self, trading_pairs: &[&str], id: u64) -> Result<WsRequest> {
        let snapshot = self.symbols.snapshot();
        let mut channels = Vec::with_capacity(trading_pairs.len() * 2);
        for pair in trading_pairs {
            channels.extend(stream::channels_for(&snapshot.to_exchange_symbol(pair)?));
        }
        let request = WsRequest::new(stream::subscribe_payload(&channels, id));
        Ok(self.auth.decorate_ws(request))
    }
}
