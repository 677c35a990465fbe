//! ADX: Average Directional Index (Wilder), with +DI and -DI.
//!
//! Steps, per bar from the second bar on:
//! 1. +DM = high - prev_high when it beats prev_low - low and is positive, else 0;
//!    -DM mirrors it.
//! 2. Wilder-smooth +DM, -DM and TR.
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise.
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI).
//! 5. ADX = Wilder-smoothed DX.
//!
//! Outputs `adx_{p}`, `plus_di_{p}`, `minus_di_{p}`. Lookback: 2 * period.

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;
use crate::indicators::atr::{true_range, WilderSmoother};

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
    plus_name: String,
    minus_name: String,
    prev: Option<(f64, f64, f64)>,
    tr: WilderSmoother,
    plus_dm: WilderSmoother,
    minus_dm: WilderSmoother,
    dx: WilderSmoother,
}

/// Directional reading at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalReading {
    pub plus_di: f64,
    pub minus_di: f64,
    pub adx: Option<f64>,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
            plus_name: format!("plus_di_{period}"),
            minus_name: format!("minus_di_{period}"),
            prev: None,
            tr: WilderSmoother::new(period),
            plus_dm: WilderSmoother::new(period),
            minus_dm: WilderSmoother::new(period),
            dx: WilderSmoother::new(period),
        }
    }

    pub fn push(&mut self, bar: &Bar) -> Option<DirectionalReading> {
        let Some((prev_high, prev_low, prev_close)) = self.prev.replace((bar.high, bar.low, bar.close))
        else {
            return None;
        };

        let up = bar.high - prev_high;
        let down = prev_low - bar.low;
        let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
        let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };

        let tr = self.tr.push(true_range(bar, Some(prev_close)));
        let plus = self.plus_dm.push(plus_dm);
        let minus = self.minus_dm.push(minus_dm);

        let (tr, plus, minus) = match (tr, plus, minus) {
            (Some(t), Some(p), Some(m)) if t > 0.0 => (t, p, m),
            _ => return None,
        };

        let plus_di = 100.0 * plus / tr;
        let minus_di = 100.0 * minus / tr;
        let di_sum = plus_di + minus_di;
        let dx = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };

        Some(DirectionalReading {
            plus_di,
            minus_di,
            adx: self.dx.push(dx),
        })
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period
    }

    fn update(&mut self, bar: &Bar, out: &mut IndicatorValues) {
        match self.push(bar) {
            Some(reading) => {
                out.insert(self.plus_name.clone(), reading.plus_di);
                out.insert(self.minus_name.clone(), reading.minus_di);
                out.insert(self.name.clone(), reading.adx.unwrap_or(f64::NAN));
            }
            None => {
                out.insert(self.plus_name.clone(), f64::NAN);
                out.insert(self.minus_name.clone(), f64::NAN);
                out.insert(self.name.clone(), f64::NAN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{feed, make_bars};

    #[test]
    fn adx_bounds() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1)
            .collect();
        let bars = make_bars(&closes);
        let values = feed(&mut Adx::new(14), &bars, "adx_14");
        let valid: Vec<f64> = values.into_iter().flatten().collect();
        assert!(!valid.is_empty());
        for v in valid {
            assert!((0.0..=100.0).contains(&v), "ADX out of range: {v}");
        }
    }

    #[test]
    fn adx_lookback() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let values = feed(&mut Adx::new(5), &bars, "adx_5");
        // first DX at bar 5 (bar 0 seeds prev), first ADX after 5 DX values
        assert!(values[8].is_none());
        assert!(values[9].is_some());
    }

    #[test]
    fn uptrend_has_plus_di_dominant() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64 * 2.0).collect();
        let bars = make_bars(&closes);
        let mut adx = Adx::new(14);
        let mut iv = IndicatorValues::new();
        for bar in &bars {
            adx.update(bar, &mut iv);
        }
        assert!(iv.get("plus_di_14").unwrap() > iv.get("minus_di_14").unwrap());
        assert!(iv.get("adx_14").unwrap() > 25.0);
    }

    #[test]
    fn downtrend_has_minus_di_dominant() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64 * 2.0).collect();
        let bars = make_bars(&closes);
        let mut adx = Adx::new(14);
        let mut iv = IndicatorValues::new();
        for bar in &bars {
            adx.update(bar, &mut iv);
        }
        assert!(iv.get("minus_di_14").unwrap() > iv.get("plus_di_14").unwrap());
    }
}
