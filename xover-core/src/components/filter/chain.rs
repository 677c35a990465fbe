//! Ordered, short-circuiting filter chain.
//!
//! Order is fixed: crossover strength, time of day, DMI trend direction,
//! stochastic momentum, RSI, volume, ATR strength, higher-timeframe alignment.
//! Only enabled filters are instantiated; the first rejection ends the chain.

use tracing::debug;

use crate::components::signal::SignalEvent;
use crate::config::EngineConfig;

use super::{
    CrossoverStrengthFilter, DmiFilter, FilterContext, HigherTimeframeFilter, RsiFilter,
    SignalEvaluation, SignalFilter, StochasticFilter, TimeOfDayFilter, VolatilityFilter,
    VolumeFilter,
};

#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn SignalFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter at the end of the chain.
    pub fn push(&mut self, filter: Box<dyn SignalFilter>) {
        self.filters.push(filter);
    }

    /// The chain applied to primary-timeframe crossovers.
    pub fn primary(config: &EngineConfig) -> Self {
        let mut chain = Self::new();
        let f = &config.filters;
        let signal = &config.signal;

        let pre = signal
            .pre_separation
            .enabled
            .then(|| config.pips(signal.pre_separation.min_pips));
        if signal.crossover_threshold_pips > 0.0 || pre.is_some() {
            chain.push(Box::new(CrossoverStrengthFilter::new(
                config.pips(signal.crossover_threshold_pips),
                pre,
            )));
        }
        if f.time.enabled {
            chain.push(Box::new(TimeOfDayFilter::new(&f.time.excluded_hours)));
        }
        if f.dmi.enabled {
            chain.push(Box::new(DmiFilter::new(
                config.dmi_timeframe(),
                f.dmi.period,
                f.dmi.min_adx,
            )));
        }
        if f.stochastic.enabled {
            chain.push(Box::new(StochasticFilter::new(
                config.stochastic_timeframe(),
                &f.stochastic,
            )));
        }
        if f.rsi.enabled {
            chain.push(Box::new(RsiFilter::new(
                config.rsi_timeframe(),
                f.rsi.period,
                f.rsi.overbought,
                f.rsi.oversold,
            )));
        }
        if f.volume.enabled {
            chain.push(Box::new(VolumeFilter::new(
                config.primary_timeframe,
                f.volume.period,
                f.volume.min_ratio,
            )));
        }
        if f.atr.enabled {
            chain.push(Box::new(VolatilityFilter::new(
                config.primary_timeframe,
                f.atr.period,
                config.pips(f.atr.min_atr_pips),
            )));
        }
        if let (true, Some(tf)) = (f.higher_timeframe.enabled, f.higher_timeframe.timeframe) {
            chain.push(Box::new(HigherTimeframeFilter::new(
                tf,
                &f.higher_timeframe,
                config.pip_size,
            )));
        }
        chain
    }

    /// The reduced chain for dormant-mode crossovers: own threshold plus time of day.
    pub fn dormant(config: &EngineConfig) -> Self {
        let mut chain = Self::new();
        if config.dormant.crossover_threshold_pips > 0.0 {
            chain.push(Box::new(CrossoverStrengthFilter::new(
                config.pips(config.dormant.crossover_threshold_pips),
                None,
            )));
        }
        if config.filters.time.enabled {
            chain.push(Box::new(TimeOfDayFilter::new(
                &config.filters.time.excluded_hours,
            )));
        }
        chain
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run the filters in order and return the first rejection, if any.
    pub fn first_rejection(
        &self,
        signal: &SignalEvent,
        ctx: &FilterContext<'_>,
    ) -> Option<SignalEvaluation> {
        for filter in &self.filters {
            let evaluation = filter.evaluate(signal, ctx);
            if !evaluation.verdict.is_passed() {
                debug!(
                    filter = filter.name(),
                    direction = ?signal.direction,
                    state = ?evaluation.filter_state,
                    "signal vetoed"
                );
                return Some(evaluation);
            }
        }
        None
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.names())
            .finish()
    }
}
