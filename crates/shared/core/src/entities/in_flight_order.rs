use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderState, OrderType, Side};
use crate::values::{Price, Quantity, Timestamp, TradingPair};

/// Coarse lifecycle phase of an in-flight order
///
/// ```text
/// New ──► Submitted ──► Working ──► Terminal
///  │          │                        ▲
///  └──────────┴────────────────────────┘  (rejected / canceled early)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderPhase {
    /// Client id assigned, nothing heard back from the exchange
    New,
    /// Exchange id assigned, still pending on the exchange side
    Submitted,
    /// Open or partially filled
    Working,
    /// Filled, canceled or failed
    Terminal,
}

/// Order tracked locally between submission and terminal resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InFlightOrder {
    pub client_order_id: String,
    /// Assigned by the exchange once the order is accepted
    pub exchange_order_id: Option<String>,
    pub trading_pair: TradingPair,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Quantity,
    /// Required for limit orders
    pub price: Option<Price>,
    pub executed_amount: Quantity,
    pub state: OrderState,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Sequence of the last applied update, `None` until the first one
    pub last_sequence: Option<u64>,
}

/// A status observation for one order, from a poll or a stream message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub client_order_id: String,
    pub exchange_order_id: Option<String>,
    pub state: OrderState,
    /// Cumulative executed amount, when the source reports it
    pub executed_amount: Option<Quantity>,
    /// Position in the single order shared by every source feeding this
    /// order; updates not newer than the last applied one are dropped
    pub sequence: u64,
    pub update_time: Timestamp,
}

/// Result of applying an [`OrderUpdate`] to an [`InFlightOrder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update was applied
    Applied {
        previous: OrderState,
        current: OrderState,
    },
    /// The update's sequence is not newer than the last applied one
    Stale { sequence: u64, last_sequence: u64 },
    /// The order already reached a terminal state
    AlreadyTerminal(OrderState),
    /// The update names a different exchange order id than the one on record
    ExchangeIdMismatch,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied { .. })
    }
}

impl InFlightOrder {
    /// Create a new order in the `PendingCreate` state
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_order_id: impl Into<String>,
        trading_pair: impl Into<TradingPair>,
        side: Side,
        order_type: OrderType,
        amount: Quantity,
        price: Option<Price>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            client_order_id: client_order_id.into(),
            exchange_order_id: None,
            trading_pair: trading_pair.into(),
            side,
            order_type,
            amount,
            price,
            executed_amount: Decimal::ZERO,
            state: OrderState::PendingCreate,
            created_at,
            updated_at: created_at,
            last_sequence: None,
        }
    }

    pub fn phase(&self) -> OrderPhase {
        if self.state.is_terminal() {
            OrderPhase::Terminal
        } else if matches!(self.state, OrderState::Open | OrderState::PartiallyFilled) {
            OrderPhase::Working
        } else if self.exchange_order_id.is_some() {
            OrderPhase::Submitted
        } else {
            OrderPhase::New
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Quantity still to be executed
    pub fn remaining_amount(&self) -> Quantity {
        (self.amount - self.executed_amount).max(Decimal::ZERO)
    }

    /// Apply a status observation.
    ///
    /// Updates must carry a sequence strictly greater than the last applied
    /// one, and nothing moves an order out of a terminal state.
    pub fn apply_update(&mut self, update: &OrderUpdate) -> UpdateOutcome {
        if let Some(last_sequence) = self.last_sequence {
            if update.sequence <= last_sequence {
                return UpdateOutcome::Stale {
                    sequence: update.sequence,
                    last_sequence,
                };
            }
        }

        if self.state.is_terminal() {
            return UpdateOutcome::AlreadyTerminal(self.state);
        }

        match (&self.exchange_order_id, &update.exchange_order_id) {
            (Some(known), Some(reported)) if known != reported => {
                return UpdateOutcome::ExchangeIdMismatch;
            }
            (None, Some(reported)) => {
                self.exchange_order_id = Some(reported.clone());
            }
            _ => {}
        }

        let previous = self.state;
        self.state = update.state;
        if let Some(executed) = update.executed_amount {
            self.executed_amount = executed;
        } else if update.state == OrderState::Filled {
            self.executed_amount = self.amount;
        }
        self.updated_at = update.update_time;
        self.last_sequence = Some(update.sequence);

        UpdateOutcome::Applied {
            previous,
            current: self.state,
        }
    }
}
