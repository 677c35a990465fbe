//! Per-position trailing stop state.

use crate::components::risk::RiskLevels;
use crate::domain::Side;

use super::ratchet::RatchetState;

/// Trailing state of one open position.
///
/// Trailing starts inactive. Once profit reaches the activation distance the
/// stop follows the close at the trailing distance, moving only when the new
/// level is strictly tighter than the current stop.
///
/// A move counts once it is sent; `confirmed_stop` is the level the venue
/// last acknowledged, so a rejected move can be rolled back and sent again.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailingState {
    ratchet: RatchetState,
    confirmed_stop: f64,
    active: bool,
    activation_distance: f64,
    trailing_distance: f64,
    last_trail_price: Option<f64>,
    escalated: bool,
}

impl TrailingState {
    pub fn new(side: Side, initial_stop: f64, levels: &RiskLevels) -> Self {
        Self {
            ratchet: RatchetState::with_initial_level(side, initial_stop),
            confirmed_stop: initial_stop,
            active: false,
            activation_distance: levels.trailing_activation,
            trailing_distance: levels.trailing_distance,
            last_trail_price: None,
            escalated: false,
        }
    }

    pub fn current_stop(&self) -> Option<f64> {
        self.ratchet.current_level()
    }

    /// Stop level last acknowledged by the venue.
    pub fn confirmed_stop(&self) -> f64 {
        self.confirmed_stop
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_escalated(&self) -> bool {
        self.escalated
    }

    pub fn activation_distance(&self) -> f64 {
        self.activation_distance
    }

    pub fn trailing_distance(&self) -> f64 {
        self.trailing_distance
    }

    /// Close price at the last committed trail move.
    pub fn last_trail_price(&self) -> Option<f64> {
        self.last_trail_price
    }

    /// Activate when `profit` reaches the activation distance. True on the activating call.
    pub fn activate_on_profit(&mut self, profit: f64) -> bool {
        if self.active || profit < self.activation_distance {
            return false;
        }
        self.active = true;
        true
    }

    /// Switch to the long-hold trailing distance and force trailing on. Once per position.
    pub fn escalate(&mut self, trailing_distance: f64) -> bool {
        if self.escalated {
            return false;
        }
        self.escalated = true;
        self.active = true;
        self.trailing_distance = trailing_distance;
        true
    }

    /// The trailed stop for `close`, if trailing is active and it is strictly tighter.
    pub fn candidate(&self, close: f64) -> Option<f64> {
        if !self.active {
            return None;
        }
        let proposed = self.ratchet.side().stop_from(close, self.trailing_distance);
        self.ratchet.tighter(proposed)
    }

    /// `Some(level)` if `level` would tighten the current stop.
    pub fn tighter(&self, level: f64) -> Option<f64> {
        self.ratchet.tighter(level)
    }

    /// Record a stop move sent to the venue.
    pub fn commit(&mut self, stop: f64, close: f64) {
        self.ratchet.apply(stop);
        self.last_trail_price = Some(close);
    }

    /// The venue acknowledged a stop at `level`.
    pub fn confirm(&mut self, level: f64) {
        self.confirmed_stop = level;
    }

    /// Return to the last acknowledged level after the venue refused a move.
    /// True if the working level changed.
    pub fn rollback(&mut self) -> bool {
        if self.current_stop() == Some(self.confirmed_stop) {
            return false;
        }
        self.ratchet = RatchetState::with_initial_level(self.ratchet.side(), self.confirmed_stop);
        self.last_trail_price = None;
        true
    }

    /// Back to inactive after the stop could not be resolved. The stop level is kept.
    pub fn reset(&mut self) {
        self.active = false;
        self.last_trail_price = None;
    }
}
