//! In-flight order tracking
//!
//! Orders are keyed by client order id with a secondary exchange id index.
//! Every status observation goes through [`InFlightOrder::apply_update`]
//! under the entry's lock, so the sequence check and the state change are one
//! step per order. Terminal orders stay until the caller acknowledges them.
//!
//! Observations from every source share one ordering: the sequence issued
//! when the request that produced them was sent. Exchange-reported update
//! times are kept on the order but never compared against local times.

use apiengine_core::{
    InFlightOrder, OrderState, OrderUpdate, Price, Quantity, Timestamp, TradingPair, UpdateOutcome,
};
use dashmap::DashMap;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ConnectorError, Result};

/// Normalized snapshot of one order as reported by the exchange
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusReport {
    pub exchange_order_id: String,
    /// `None` when the exchange did not echo the market
    pub trading_pair: Option<TradingPair>,
    pub state: OrderState,
    pub amount: Option<Quantity>,
    pub price: Option<Price>,
    pub executed_amount: Option<Quantity>,
    pub update_time: Timestamp,
    /// Issued by [`OrderTracker::next_sequence`] when the request was sent
    pub sequence: u64,
}

impl OrderStatusReport {
    pub fn to_update(&self, client_order_id: impl Into<String>) -> OrderUpdate {
        OrderUpdate {
            client_order_id: client_order_id.into(),
            exchange_order_id: Some(self.exchange_order_id.clone()),
            state: self.state,
            executed_amount: self.executed_amount,
            sequence: self.sequence,
            update_time: self.update_time,
        }
    }
}

/// Strictly increasing sequences derived from a local clock
#[derive(Debug, Default)]
pub struct Sequencer {
    last: AtomicU64,
}

impl Sequencer {
    /// `now` in ns, bumped past the previous value when the clock stood
    /// still or stepped back
    pub fn next(&self, now: Timestamp) -> u64 {
        let ns = now
            .timestamp_nanos_opt()
            .map(|ns| ns.max(0) as u64)
            .unwrap_or_default();
        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(ns.max(last + 1))
            }) {
            Ok(last) | Err(last) => ns.max(last + 1),
        }
    }
}

#[derive(Default)]
pub struct OrderTracker {
    orders: DashMap<String, InFlightOrder>,
    /// exchange order id -> client order id
    exchange_ids: DashMap<String, String>,
    sequencer: Sequencer,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence for an observation whose request is being issued at `now`
    pub fn next_sequence(&self, now: Timestamp) -> u64 {
        self.sequencer.next(now)
    }

    /// Start tracking a freshly submitted order
    pub fn track(&self, order: InFlightOrder) -> Result<()> {
        let client_order_id = order.client_order_id.clone();
        if let Some(exchange_order_id) = &order.exchange_order_id {
            self.exchange_ids
                .insert(exchange_order_id.clone(), client_order_id.clone());
        }

        match self.orders.entry(client_order_id) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Err(ConnectorError::InvalidOrder(
                format!("client order id {} already tracked", entry.key()),
            )),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                debug!("Tracking order {}", entry.key());
                entry.insert(order);
                Ok(())
            }
        }
    }

    pub fn get(&self, client_order_id: &str) -> Option<InFlightOrder> {
        self.orders.get(client_order_id).map(|o| o.clone())
    }

    pub fn client_order_id(&self, exchange_order_id: &str) -> Option<String> {
        self.exchange_ids.get(exchange_order_id).map(|id| id.clone())
    }

    pub fn get_by_exchange_id(&self, exchange_order_id: &str) -> Option<InFlightOrder> {
        self.get(&self.client_order_id(exchange_order_id)?)
    }

    /// Apply a status observation to a tracked order
    pub fn apply(&self, update: &OrderUpdate) -> Result<UpdateOutcome> {
        let mut order = self
            .orders
            .get_mut(&update.client_order_id)
            .ok_or_else(|| ConnectorError::UnknownOrder(update.client_order_id.clone()))?;

        let had_exchange_id = order.exchange_order_id.is_some();
        let outcome = order.apply_update(update);

        match outcome {
            UpdateOutcome::Applied { previous, current } => {
                if !had_exchange_id {
                    if let Some(exchange_order_id) = &order.exchange_order_id {
                        self.exchange_ids
                            .insert(exchange_order_id.clone(), order.client_order_id.clone());
                    }
                }
                if previous != current {
                    info!(
                        "Order {} {} -> {}",
                        update.client_order_id, previous, current
                    );
                }
            }
            UpdateOutcome::Stale {
                sequence,
                last_sequence,
            } => {
                debug!(
                    "Discarding stale update for {} (seq {} <= {})",
                    update.client_order_id, sequence, last_sequence
                );
            }
            UpdateOutcome::AlreadyTerminal(state) => {
                debug!(
                    "Ignoring {} update for {}: already {}",
                    update.state, update.client_order_id, state
                );
            }
            UpdateOutcome::ExchangeIdMismatch => {
                warn!(
                    "Update for {} names exchange id {:?}, tracked as {:?}",
                    update.client_order_id, update.exchange_order_id, order.exchange_order_id
                );
            }
        }

        Ok(outcome)
    }

    /// Stop tracking a terminal order. Orders still in flight are kept.
    pub fn acknowledge(&self, client_order_id: &str) -> Result<InFlightOrder> {
        match self
            .orders
            .remove_if(client_order_id, |_, order| order.is_terminal())
        {
            Some((_, order)) => {
                if let Some(exchange_order_id) = &order.exchange_order_id {
                    self.exchange_ids.remove(exchange_order_id);
                }
                debug!("Order {} acknowledged and evicted", client_order_id);
                Ok(order)
            }
            None if self.orders.contains_key(client_order_id) => {
                Err(ConnectorError::InvalidOrder(format!(
                    "order {} is not terminal",
                    client_order_id
                )))
            }
            None => Err(ConnectorError::UnknownOrder(client_order_id.to_string())),
        }
    }

    /// Orders not yet in a terminal state
    pub fn active_orders(&self) -> Vec<InFlightOrder> {
        self.orders
            .iter()
            .filter(|entry| !entry.is_terminal())
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Terminal orders waiting for acknowledgement
    pub fn terminal_orders(&self) -> Vec<InFlightOrder> {
        self.orders
            .iter()
            .filter(|entry| entry.is_terminal())
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
