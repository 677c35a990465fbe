//! Percentile rank of the current ATR within a rolling window of ATR values.
//!
//! rank = (# window values <= current) / window length, in (0, 1].
//! The window includes the current value; the rank is only published once the
//! window is full. Output: `atr_pctrank_{period}_{window}`.

use std::collections::VecDeque;

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;
use crate::indicators::Atr;

#[derive(Debug, Clone)]
pub struct AtrPercentile {
    window: usize,
    name: String,
    atr: Atr,
    history: VecDeque<f64>,
}

impl AtrPercentile {
    pub fn new(atr_period: usize, window: usize) -> Self {
        assert!(window >= 1, "percentile window must be >= 1");
        Self {
            window,
            name: format!("atr_pctrank_{atr_period}_{window}"),
            atr: Atr::new(atr_period),
            history: VecDeque::with_capacity(window + 1),
        }
    }

    pub fn push(&mut self, bar: &Bar) -> Option<f64> {
        let current = self.atr.push(bar)?;
        self.history.push_back(current);
        if self.history.len() > self.window {
            self.history.pop_front();
        }
        if self.history.len() < self.window {
            return None;
        }
        let at_or_below = self.history.iter().filter(|&&v| v <= current).count();
        Some(at_or_below as f64 / self.window as f64)
    }
}

impl Indicator for AtrPercentile {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.atr.lookback() + self.window - 1
    }

    fn update(&mut self, bar: &Bar, out: &mut IndicatorValues) {
        let value = self.push(bar).unwrap_or(f64::NAN);
        out.insert(self.name.clone(), value);
    }
}
