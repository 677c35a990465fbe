//! Ratchet invariant enforcement.
//!
//! **Core rule:** a protective stop may tighten, never loosen. A trailing
//! candidate that would move the stop against the position is ignored.

use crate::domain::Side;

/// Ratchet state for one position's protective stop.
///
/// - Long positions: the stop can only rise.
/// - Short positions: the stop can only fall.
#[derive(Debug, Clone, PartialEq)]
pub struct RatchetState {
    current_level: Option<f64>,
    side: Side,
}

impl RatchetState {
    pub fn with_initial_level(side: Side, initial_level: f64) -> Self {
        Self {
            current_level: Some(initial_level),
            side,
        }
    }

    /// Apply the ratchet to a proposed level and return the resulting level.
    ///
    /// # Example
    /// ```
    /// use xover_core::domain::Side;
    /// use xover_core::lifecycle::RatchetState;
    ///
    /// let mut ratchet = RatchetState::with_initial_level(Side::Long, 95.0);
    /// assert_eq!(ratchet.apply(100.0), 100.0);
    /// // loosening is blocked
    /// assert_eq!(ratchet.apply(90.0), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        let level = match self.current_level {
            None => proposed,
            Some(current) => match self.side {
                Side::Long => current.max(proposed),
                Side::Short => current.min(proposed),
            },
        };
        self.current_level = Some(level);
        level
    }

    /// `Some(proposed)` when it is strictly tighter than the current level.
    /// Does not move the ratchet; call `apply` once the move is committed.
    pub fn tighter(&self, proposed: f64) -> Option<f64> {
        match self.current_level {
            None => Some(proposed),
            Some(current) if self.side.is_tighter(proposed, current) => Some(proposed),
            Some(_) => None,
        }
    }

    pub fn current_level(&self) -> Option<f64> {
        self.current_level
    }

    pub fn side(&self) -> Side {
        self.side
    }
}
