//! Bar router: routes each bar to the indicator set of its own timeframe.
//!
//! The router owns one `IndicatorSet` per timeframe any role needs (primary
//! signal, filters, regime, entry timing, dormant mode). Bars are routed purely
//! by the timeframe they carry, in arrival order, with no assumption about
//! how timeframes interleave. A bar never touches another timeframe's set.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::components::indicator::Indicator;
use crate::config::{EngineConfig, PullbackReference, RiskMode};
use crate::domain::{Bar, Timeframe};
use crate::indicators::{
    moving_average, Adx, Atr, AtrPercentile, Ema, IndicatorSet, Rsi, Stochastic, VolumeAverage,
};

#[derive(Debug, Default)]
pub struct BarRouter {
    sets: BTreeMap<Timeframe, IndicatorSet>,
    dropped: u64,
}

/// Outcome of routing one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Routed,
    UnknownTimeframe,
    VoidBar,
}

impl BarRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every indicator the configured roles read.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut router = Self::new();
        let primary = config.primary_timeframe;

        let signal = &config.signal;
        router.register(primary, moving_average(signal.ma_type, signal.fast_period));
        router.register(primary, moving_average(signal.ma_type, signal.slow_period));
        router.register(primary, Box::new(Atr::new(config.risk.atr_period)));
        if let RiskMode::PercentileAdaptive(p) = &config.risk.mode {
            router.register(
                primary,
                Box::new(AtrPercentile::new(config.risk.atr_period, p.window)),
            );
        }

        let filters = &config.filters;
        if filters.dmi.enabled {
            router.register(config.dmi_timeframe(), Box::new(Adx::new(filters.dmi.period)));
        }
        if filters.stochastic.enabled {
            router.register(
                config.stochastic_timeframe(),
                Box::new(Stochastic::new(
                    filters.stochastic.k_period,
                    filters.stochastic.d_period,
                )),
            );
        }
        if filters.rsi.enabled {
            router.register(config.rsi_timeframe(), Box::new(Rsi::new(filters.rsi.period)));
        }
        if filters.volume.enabled {
            router.register(primary, Box::new(VolumeAverage::new(filters.volume.period)));
        }
        if filters.atr.enabled {
            router.register(primary, Box::new(Atr::new(filters.atr.period)));
        }
        let htf = &filters.higher_timeframe;
        if let (true, Some(tf)) = (htf.enabled, htf.timeframe) {
            router.register(tf, moving_average(htf.effective_ma_type(), htf.period));
        }

        if config.regime.enabled {
            router.register(
                config.regime_timeframe(),
                Box::new(Adx::new(config.regime.adx_period)),
            );
        }

        let et = &config.entry_timing;
        if let (true, Some(tf)) = (et.enabled, et.timeframe) {
            router.ensure(tf);
            if let PullbackReference::Ema { period } = et.reference {
                router.register(tf, Box::new(Ema::new(period)));
            }
        }

        let dormant = &config.dormant;
        if let (true, Some(tf)) = (dormant.enabled, dormant.timeframe) {
            router.register(tf, moving_average(dormant.ma_type, dormant.fast_period));
            router.register(tf, moving_average(dormant.ma_type, dormant.slow_period));
        }

        for (timeframe, set) in &router.sets {
            debug!(
                %timeframe,
                indicators = ?set.indicator_names(),
                warmup_bars = set.warmup_bars(),
                "indicator set registered"
            );
        }
        router
    }

    /// Make sure `timeframe` is routed, even with no indicators on it.
    pub fn ensure(&mut self, timeframe: Timeframe) -> &mut IndicatorSet {
        self.sets
            .entry(timeframe)
            .or_insert_with(|| IndicatorSet::new(timeframe))
    }

    pub fn register(&mut self, timeframe: Timeframe, indicator: Box<dyn Indicator>) {
        self.ensure(timeframe).register(indicator);
    }

    /// Feed `bar` to its timeframe's set. Unknown timeframes and void bars are
    /// dropped with a warning; routing never fails.
    pub fn route(&mut self, bar: &Bar) -> RouteOutcome {
        if bar.is_void() {
            warn!(timeframe = %bar.timeframe, timestamp = %bar.timestamp, "dropping void bar");
            self.dropped += 1;
            return RouteOutcome::VoidBar;
        }
        match self.sets.get_mut(&bar.timeframe) {
            Some(set) => {
                set.update(bar);
                RouteOutcome::Routed
            }
            None => {
                warn!(
                    timeframe = %bar.timeframe,
                    timestamp = %bar.timestamp,
                    "dropping bar for unrecognised timeframe"
                );
                self.dropped += 1;
                RouteOutcome::UnknownTimeframe
            }
        }
    }

    pub fn set(&self, timeframe: Timeframe) -> Option<&IndicatorSet> {
        self.sets.get(&timeframe)
    }

    pub fn value(&self, timeframe: Timeframe, key: &str) -> Option<f64> {
        self.sets.get(&timeframe).and_then(|s| s.get(key))
    }

    pub fn last_bar(&self, timeframe: Timeframe) -> Option<&Bar> {
        self.sets.get(&timeframe).and_then(|s| s.last_bar())
    }

    pub fn timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.sets.keys().copied()
    }

    /// Number of bars dropped so far (unknown timeframe or void).
    pub fn dropped_bars(&self) -> u64 {
        self.dropped
    }

    #[cfg(test)]
    pub(crate) fn inject(&mut self, timeframe: Timeframe, key: &str, value: f64) {
        self.ensure(timeframe).inject_value(key, value);
    }

    #[cfg(test)]
    pub(crate) fn inject_bar(&mut self, bar: Bar) {
        self.ensure(bar.timeframe).inject_last_bar(bar);
    }
}
