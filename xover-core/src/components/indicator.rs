//! Indicator trait and the current-value container.
//!
//! Indicators are streaming: each bar is fed exactly once, in arrival order,
//! and the indicator writes its latest output(s) into an `IndicatorValues`
//! snapshot keyed by series name. Nothing is recomputed from history.

use crate::domain::Bar;
use std::collections::HashMap;

/// Trait for streaming indicators.
///
/// Until `lookback()` bars have been seen an indicator writes `f64::NAN`,
/// which `IndicatorValues::get` reports as absent.
///
/// # Look-ahead guard
/// `update` sees only the bar being fed; there is no way to peek ahead.
pub trait Indicator: Send + Sync {
    /// Name of the primary output series (e.g., "sma_20", "adx_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Consume one bar and write every output series into `out`.
    fn update(&mut self, bar: &Bar, out: &mut IndicatorValues);
}

/// Latest value of every series registered on one timeframe.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, f64>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current value of a named series.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.series.insert(name.into(), value);
    }

    /// Current value of a series, `None` when missing or still warming up (NaN).
    pub fn get(&self, name: &str) -> Option<f64> {
        self.series.get(name).copied().filter(|v| !v.is_nan())
    }

    /// Number of series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
