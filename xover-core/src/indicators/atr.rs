//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); the first
//! bar has no previous close and uses high-low.
//! ATR uses Wilder smoothing (alpha = 1/period), seeded with the mean of the
//! first `period` true ranges. Lookback: period - 1.

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;

/// True range of `bar` given the previous close, if any.
pub fn true_range(bar: &Bar, prev_close: Option<f64>) -> f64 {
    let hl = bar.high - bar.low;
    match prev_close {
        Some(pc) => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        None => hl,
    }
}

/// Streaming Wilder smoothing. Seed: mean of the first `period` values.
#[derive(Debug, Clone)]
pub struct WilderSmoother {
    period: usize,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl WilderSmoother {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Wilder period must be >= 1");
        Self {
            period,
            seed_sum: 0.0,
            seen: 0,
            value: None,
        }
    }

    pub fn push(&mut self, x: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                self.value = Some(prev + (x - prev) / self.period as f64);
            }
            None => {
                self.seed_sum += x;
                self.seen += 1;
                if self.seen == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
    prev_close: Option<f64>,
    smoother: WilderSmoother,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
            prev_close: None,
            smoother: WilderSmoother::new(period),
        }
    }

    pub fn push(&mut self, bar: &Bar) -> Option<f64> {
        let tr = true_range(bar, self.prev_close);
        self.prev_close = Some(bar.close);
        self.smoother.push(tr)
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn update(&mut self, bar: &Bar, out: &mut IndicatorValues) {
        let value = self.push(bar).unwrap_or(f64::NAN);
        out.insert(self.name.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, feed, make_bars, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_uses_gap() {
        let bars = make_ohlc_bars(&[(10.0, 11.0, 9.0, 10.5), (12.0, 13.0, 12.0, 12.5)]);
        assert_approx(true_range(&bars[0], None), 2.0, DEFAULT_EPSILON);
        // gap up: |13 - 10.5| = 2.5 beats high-low = 1.0
        assert_approx(true_range(&bars[1], Some(10.5)), 2.5, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_constant_range() {
        // make_bars: high/low = max/min(open, close) +/- 1; flat closes -> TR = 2
        let bars = make_bars(&[100.0; 10]);
        let values = feed(&mut Atr::new(3), &bars, "atr_3");
        assert!(values[1].is_none());
        for v in values.iter().skip(2) {
            assert_approx(v.unwrap(), 2.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn wilder_smoothing_step() {
        let mut w = WilderSmoother::new(2);
        assert_eq!(w.push(2.0), None);
        assert_eq!(w.push(4.0), Some(3.0));
        // 3 + (5 - 3) / 2 = 4
        assert_eq!(w.push(5.0), Some(4.0));
        assert_eq!(w.value(), Some(4.0));
    }

    #[test]
    fn atr_is_positive_on_moving_series() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let bars = make_bars(&closes);
        let values = feed(&mut Atr::new(14), &bars, "atr_14");
        for v in values.iter().skip(13) {
            assert!(v.unwrap() > 0.0);
        }
    }
}
