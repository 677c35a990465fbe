use serde::{Deserialize, Serialize};
use std::fmt;

/// Venue order identity. Changes whenever the venue replaces an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O-{}", self.0)
    }
}

/// Engine-assigned position identity, stable for the life of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Logical role of an order within a bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRole {
    Entry,
    ProtectiveStop,
    TakeProfit,
}

impl OrderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderRole::Entry => "entry",
            OrderRole::ProtectiveStop => "protective-stop",
            OrderRole::TakeProfit => "take-profit",
        }
    }
}

/// Stable tag for an order: its role for a given position.
///
/// The venue may hand out a fresh `OrderId` every time an order is modified,
/// so the engine always looks orders up by tag rather than caching ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderTag {
    pub position_id: PositionId,
    pub role: OrderRole,
}

impl OrderTag {
    pub fn new(position_id: PositionId, role: OrderRole) -> Self {
        Self { position_id, role }
    }

    pub fn entry(position_id: PositionId) -> Self {
        Self::new(position_id, OrderRole::Entry)
    }

    pub fn protective_stop(position_id: PositionId) -> Self {
        Self::new(position_id, OrderRole::ProtectiveStop)
    }

    pub fn take_profit(position_id: PositionId) -> Self {
        Self::new(position_id, OrderRole::TakeProfit)
    }
}

impl fmt::Display for OrderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-for-position-{}", self.role.as_str(), self.position_id.0)
    }
}
