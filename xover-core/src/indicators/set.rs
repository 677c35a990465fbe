//! Per-timeframe indicator set.
//!
//! One `IndicatorSet` exists per routed timeframe. It owns the streaming
//! indicators registered for that timeframe and their latest values, and is
//! only ever mutated by the bar router with bars of its own timeframe.

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::{Bar, Timeframe};

pub struct IndicatorSet {
    timeframe: Timeframe,
    indicators: Vec<Box<dyn Indicator>>,
    values: IndicatorValues,
    bars_seen: usize,
    last_bar: Option<Bar>,
}

impl IndicatorSet {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            indicators: Vec::new(),
            values: IndicatorValues::new(),
            bars_seen: 0,
            last_bar: None,
        }
    }

    /// Register an indicator. A second indicator with the same name is ignored,
    /// so several roles can ask for the same series.
    pub fn register(&mut self, indicator: Box<dyn Indicator>) {
        if self.indicators.iter().any(|i| i.name() == indicator.name()) {
            return;
        }
        self.indicators.push(indicator);
    }

    /// Feed one bar of this set's timeframe to every registered indicator.
    pub fn update(&mut self, bar: &Bar) {
        debug_assert_eq!(bar.timeframe, self.timeframe);
        for indicator in &mut self.indicators {
            indicator.update(bar, &mut self.values);
        }
        self.bars_seen += 1;
        self.last_bar = Some(bar.clone());
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn values(&self) -> &IndicatorValues {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key)
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn last_bar(&self) -> Option<&Bar> {
        self.last_bar.as_ref()
    }

    pub fn indicator_names(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.name()).collect()
    }

    /// Largest lookback among the registered indicators.
    pub fn warmup_bars(&self) -> usize {
        self.indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn inject_value(&mut self, key: &str, value: f64) {
        self.values.insert(key, value);
    }

    #[cfg(test)]
    pub(crate) fn inject_last_bar(&mut self, bar: Bar) {
        self.last_bar = Some(bar);
    }
}

impl std::fmt::Debug for IndicatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorSet")
            .field("timeframe", &self.timeframe)
            .field("indicators", &self.indicator_names())
            .field("bars_seen", &self.bars_seen)
            .finish()
    }
}
