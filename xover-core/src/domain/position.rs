use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::PositionId;
use super::timeframe::Timeframe;

/// Position / signal side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    /// Price `distance` away from `price` in the losing direction (where a stop sits).
    pub fn stop_from(&self, price: f64, distance: f64) -> f64 {
        price - self.sign() * distance
    }

    /// Price `distance` away from `price` in the winning direction (where a target sits).
    pub fn target_from(&self, price: f64, distance: f64) -> f64 {
        price + self.sign() * distance
    }

    /// True if `candidate` is strictly more protective than `current` for this side.
    pub fn is_tighter(&self, candidate: f64, current: f64) -> bool {
        match self {
            Side::Long => candidate > current,
            Side::Short => candidate < current,
        }
    }
}

/// Which signal path opened a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionOrigin {
    Primary,
    Dormant,
}

/// An open position, created only once the venue confirms the entry fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub side: Side,
    /// Fill price reported by the venue.
    pub entry_price: f64,
    pub size: f64,
    pub opened_at: DateTime<Utc>,
    /// Timeframe whose bars drive trailing/duration management.
    pub managed_on: Timeframe,
    pub origin: PositionOrigin,
}

impl Position {
    /// Unrealized move in price units, positive when in profit.
    pub fn profit_distance(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.side.sign()
    }
}
