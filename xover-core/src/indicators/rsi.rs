//! Relative Strength Index (Wilder).
//!
//! Gains/losses from consecutive closes, Wilder-smoothed.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss); 100 when avg_loss is zero.
//! Lookback: period.

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;
use crate::indicators::atr::WilderSmoother;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
    prev_close: Option<f64>,
    gains: WilderSmoother,
    losses: WilderSmoother,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
            prev_close: None,
            gains: WilderSmoother::new(period),
            losses: WilderSmoother::new(period),
        }
    }

    pub fn push(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev_close.replace(close)?;
        let change = close - prev;
        let gain = self.gains.push(change.max(0.0));
        let loss = self.losses.push((-change).max(0.0));
        match (gain, loss) {
            (Some(_), Some(l)) if l == 0.0 => Some(100.0),
            (Some(g), Some(l)) => Some(100.0 - 100.0 / (1.0 + g / l)),
            _ => None,
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
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
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let values = feed(&mut Rsi::new(14), &make_bars(&closes), "rsi_14");
        assert!(values[13].is_none());
        assert_approx(values[14].unwrap(), 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let values = feed(&mut Rsi::new(14), &make_bars(&closes), "rsi_14");
        assert_approx(values[19].unwrap(), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_balanced_is_50() {
        // alternating +1 / -1 with period 2 seeds equal averages
        let values = feed(&mut Rsi::new(2), &make_bars(&[10.0, 11.0, 10.0]), "rsi_2");
        assert_approx(values[2].unwrap(), 50.0, DEFAULT_EPSILON);
    }
}
