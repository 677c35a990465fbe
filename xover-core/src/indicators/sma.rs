//! Simple Moving Average (SMA) of closes.
//!
//! SMA[t] = mean(close[t-period+1..=t]). Lookback: period - 1.

use std::collections::VecDeque;

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
    window: VecDeque<f64>,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
            window: VecDeque::with_capacity(period + 1),
        }
    }

    /// Push a value and return the mean once the window is full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.window.push_back(value);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        if self.window.len() < self.period {
            return None;
        }
        // Summing the window each time keeps the mean free of running-sum drift.
        Some(self.window.iter().sum::<f64>() / self.period as f64)
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn update(&mut self, bar: &Bar, out: &mut IndicatorValues) {
        let value = self.push(bar.close).unwrap_or(f64::NAN);
        out.insert(self.name.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, feed, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_basic() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let values = feed(&mut Sma::new(3), &bars, "sma_3");
        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert_approx(values[2].unwrap(), 2.0, DEFAULT_EPSILON);
        assert_approx(values[3].unwrap(), 3.0, DEFAULT_EPSILON);
        assert_approx(values[4].unwrap(), 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_period_one_is_close() {
        let bars = make_bars(&[10.0, 20.0]);
        let values = feed(&mut Sma::new(1), &bars, "sma_1");
        assert_eq!(values, vec![Some(10.0), Some(20.0)]);
    }

    #[test]
    fn sma_of_constant_window_is_stable() {
        let bars = make_bars(&[1.1; 40]);
        let values = feed(&mut Sma::new(20), &bars, "sma_20");
        let first = values[19].unwrap();
        for v in values.iter().skip(19) {
            assert_eq!(v.unwrap(), first);
        }
    }
}
