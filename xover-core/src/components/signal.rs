//! Crossover detection: edge-triggered fast/slow moving-average crosses.
//!
//! Signals describe a market event only. Whether the event becomes a trade is
//! decided downstream by the filter chain and the lifecycle manager.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::indicator::IndicatorValues;
use crate::config::MaType;
use crate::domain::{Bar, Side, Timeframe};
use crate::indicators::ma_key;

/// A detected crossover on one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub direction: Side,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// |fast - slow| on the crossing bar, in price units.
    pub separation: f64,
    /// Largest opposite-side separation over the bars preceding the cross.
    pub pre_separation: f64,
    pub fast_value: f64,
    pub slow_value: f64,
}

/// Stateful fast/slow crossover detector.
///
/// Fires Long when fast moves from `<=` slow to `>` slow and Short for the
/// mirror. The first bar on which both averages are defined only seeds the
/// previous values and never fires.
#[derive(Debug, Clone)]
pub struct CrossoverDetector {
    fast_key: String,
    slow_key: String,
    lookback: usize,
    prev: Option<(f64, f64)>,
    /// fast - slow on the most recent bars, oldest first, crossing bar excluded.
    history: VecDeque<f64>,
}

impl CrossoverDetector {
    pub fn new(ma_type: MaType, fast_period: usize, slow_period: usize, lookback: usize) -> Self {
        Self {
            fast_key: ma_key(ma_type, fast_period),
            slow_key: ma_key(ma_type, slow_period),
            lookback: lookback.max(1),
            prev: None,
            history: VecDeque::with_capacity(lookback.max(1) + 1),
        }
    }

    pub fn fast_key(&self) -> &str {
        &self.fast_key
    }

    pub fn slow_key(&self) -> &str {
        &self.slow_key
    }

    /// Side of the last observed fast/slow relation, `None` before warmup or when equal.
    pub fn trend(&self) -> Option<Side> {
        match self.prev {
            Some((fast, slow)) if fast > slow => Some(Side::Long),
            Some((fast, slow)) if fast < slow => Some(Side::Short),
            _ => None,
        }
    }

    /// Evaluate the bar just routed into `values`. Emits at most one event.
    pub fn on_bar(&mut self, bar: &Bar, values: &IndicatorValues) -> Option<SignalEvent> {
        let fast = values.get(&self.fast_key)?;
        let slow = values.get(&self.slow_key)?;

        let direction = match self.prev {
            Some((pf, ps)) if pf <= ps && fast > slow => Some(Side::Long),
            Some((pf, ps)) if pf >= ps && fast < slow => Some(Side::Short),
            _ => None,
        };

        let event = direction.map(|direction| SignalEvent {
            direction,
            timeframe: bar.timeframe,
            timestamp: bar.timestamp,
            close: bar.close,
            separation: (fast - slow).abs(),
            pre_separation: self.opposite_separation(direction),
            fast_value: fast,
            slow_value: slow,
        });

        self.prev = Some((fast, slow));
        self.history.push_back(fast - slow);
        if self.history.len() > self.lookback {
            self.history.pop_front();
        }
        event
    }

    fn opposite_separation(&self, direction: Side) -> f64 {
        // before a long cross fast sits below slow, so the gap there is -(fast - slow)
        self.history
            .iter()
            .map(|diff| (-direction.sign() * diff).max(0.0))
            .fold(0.0, f64::max)
    }
}
