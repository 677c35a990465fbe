//! Stochastic oscillator (%K / %D) with cross ages.
//!
//! %K = 100 * (close - LL) / (HH - LL) over the last `k` bars; 50 when HH == LL.
//! %D = SMA(%K, d).
//!
//! Besides %K and %D, the indicator tracks how many bars ago %K last crossed
//! above %D (`stoch_bull_age_*`) and below %D (`stoch_bear_age_*`). Age 0 is
//! the crossing bar itself; an age is absent until the first such cross.

use std::collections::VecDeque;

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;
use crate::indicators::Sma;

#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
    name: String,
    d_name: String,
    bull_age_name: String,
    bear_age_name: String,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
    d_sma: Sma,
    prev: Option<(f64, f64)>,
    bull_age: Option<usize>,
    bear_age: Option<usize>,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize) -> Self {
        assert!(k_period >= 1, "stochastic %K period must be >= 1");
        assert!(d_period >= 1, "stochastic %D period must be >= 1");
        let suffix = format!("{k_period}_{d_period}");
        Self {
            k_period,
            d_period,
            name: format!("stoch_k_{suffix}"),
            d_name: format!("stoch_d_{suffix}"),
            bull_age_name: format!("stoch_bull_age_{suffix}"),
            bear_age_name: format!("stoch_bear_age_{suffix}"),
            highs: VecDeque::with_capacity(k_period + 1),
            lows: VecDeque::with_capacity(k_period + 1),
            d_sma: Sma::new(d_period),
            prev: None,
            bull_age: None,
            bear_age: None,
        }
    }

    fn percent_k(&mut self, bar: &Bar) -> Option<f64> {
        self.highs.push_back(bar.high);
        self.lows.push_back(bar.low);
        if self.highs.len() > self.k_period {
            self.highs.pop_front();
            self.lows.pop_front();
        }
        if self.highs.len() < self.k_period {
            return None;
        }
        let hh = self.highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ll = self.lows.iter().copied().fold(f64::INFINITY, f64::min);
        let range = hh - ll;
        if range <= 0.0 {
            return Some(50.0);
        }
        Some(100.0 * (bar.close - ll) / range)
    }

    /// Returns (%K, %D) once both are defined.
    pub fn push(&mut self, bar: &Bar) -> Option<(f64, f64)> {
        let k = self.percent_k(bar)?;
        let d = self.d_sma.push(k)?;

        self.bull_age = self.bull_age.map(|a| a + 1);
        self.bear_age = self.bear_age.map(|a| a + 1);
        if let Some((prev_k, prev_d)) = self.prev {
            if prev_k <= prev_d && k > d {
                self.bull_age = Some(0);
            } else if prev_k >= prev_d && k < d {
                self.bear_age = Some(0);
            }
        }
        self.prev = Some((k, d));
        Some((k, d))
    }
}

fn age_value(age: Option<usize>) -> f64 {
    age.map(|a| a as f64).unwrap_or(f64::NAN)
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.k_period + self.d_period - 2
    }

    fn update(&mut self, bar: &Bar, out: &mut IndicatorValues) {
        let (k, d) = self.push(bar).unwrap_or((f64::NAN, f64::NAN));
        out.insert(self.name.clone(), k);
        out.insert(self.d_name.clone(), d);
        out.insert(self.bull_age_name.clone(), age_value(self.bull_age));
        out.insert(self.bear_age_name.clone(), age_value(self.bear_age));
    }
}
