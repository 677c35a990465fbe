//! Rolling average of bar volume, current bar included. Lookback: period - 1.

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;
use crate::indicators::Sma;

#[derive(Debug, Clone)]
pub struct VolumeAverage {
    period: usize,
    name: String,
    inner: Sma,
}

impl VolumeAverage {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("volume_avg_{period}"),
            inner: Sma::new(period),
        }
    }
}

impl Indicator for VolumeAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn update(&mut self, bar: &Bar, out: &mut IndicatorValues) {
        let value = self.inner.push(bar.volume).unwrap_or(f64::NAN);
        out.insert(self.name.clone(), value);
    }
}
