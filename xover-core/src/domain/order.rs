//! Order intents emitted by the engine and execution reports fed back to it.
//!
//! The engine never talks to a venue directly. It returns `OrderCommand`s and
//! later receives `ExecutionEvent`s; the two halves are correlated by
//! `OrderTag`, never by a cached `OrderId`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{OrderId, OrderTag, PositionId};
use super::position::{PositionOrigin, Side};
use super::timeframe::Timeframe;

/// A bracket order: market entry + protective stop + optional take-profit.
///
/// Stop and target prices are absolute, anchored on `reference_price`
/// (the close of the bar that triggered the entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketRequest {
    pub position_id: PositionId,
    pub side: Side,
    pub size: f64,
    pub reference_price: f64,
    pub stop_price: f64,
    pub take_profit_price: Option<f64>,
    pub managed_on: Timeframe,
    pub origin: PositionOrigin,
}

impl BracketRequest {
    pub fn entry_tag(&self) -> OrderTag {
        OrderTag::entry(self.position_id)
    }

    pub fn stop_tag(&self) -> OrderTag {
        OrderTag::protective_stop(self.position_id)
    }

    pub fn take_profit_tag(&self) -> OrderTag {
        OrderTag::take_profit(self.position_id)
    }
}

/// Order intent handed to the execution collaborator (fire-and-forget).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderCommand {
    SubmitBracket(BracketRequest),
    /// Move the trigger of the protective stop currently known as `order_id`.
    ModifyStop {
        tag: OrderTag,
        order_id: OrderId,
        trigger_price: f64,
    },
    CancelOrder {
        tag: OrderTag,
        order_id: OrderId,
    },
    /// Flatten the position at market and cancel its working orders.
    ClosePosition {
        position_id: PositionId,
        reason: ExitReason,
    },
}

/// Why a position closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Reversal,
    External,
}

/// Asynchronous report from the execution collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
    OrderAccepted {
        tag: OrderTag,
        order_id: OrderId,
    },
    OrderRejected {
        tag: OrderTag,
        reason: String,
    },
    /// The venue replaced an order; `new_order_id` is its identity from now on.
    OrderModified {
        tag: OrderTag,
        old_order_id: OrderId,
        new_order_id: OrderId,
        trigger_price: f64,
    },
    OrderCancelled {
        tag: OrderTag,
        order_id: OrderId,
    },
    EntryFilled {
        position_id: PositionId,
        side: Side,
        price: f64,
        size: f64,
        timestamp: DateTime<Utc>,
    },
    ExitFilled {
        position_id: PositionId,
        reason: ExitReason,
        price: f64,
        timestamp: DateTime<Utc>,
    },
}
