//! Higher-timeframe alignment.
//!
//! `ma` mode: the last higher-timeframe close must sit on the signal's side of
//! the higher-timeframe moving average. `ema_distance` mode: the close must be
//! at least `min_distance` beyond the EMA in the signal direction.

use crate::components::signal::SignalEvent;
use crate::config::{HigherTimeframeConfig, HtfMode};
use crate::domain::Timeframe;
use crate::indicators::ma_key;

use super::{snapshot, FilterContext, RejectionReason, SignalEvaluation, SignalFilter};

#[derive(Debug, Clone)]
pub struct HigherTimeframeFilter {
    timeframe: Timeframe,
    mode: HtfMode,
    key: String,
    /// Price units.
    min_distance: f64,
}

impl HigherTimeframeFilter {
    pub fn new(timeframe: Timeframe, config: &HigherTimeframeConfig, pip_size: f64) -> Self {
        Self {
            timeframe,
            mode: config.mode,
            key: ma_key(config.effective_ma_type(), config.period),
            min_distance: config.min_distance_pips * pip_size,
        }
    }
}

impl SignalFilter for HigherTimeframeFilter {
    fn name(&self) -> &str {
        "higher_timeframe"
    }

    fn evaluate(&self, signal: &SignalEvent, ctx: &FilterContext<'_>) -> SignalEvaluation {
        let (Some(ma), Some(bar)) = (
            ctx.value(self.timeframe, &self.key),
            ctx.last_bar(self.timeframe),
        ) else {
            return SignalEvaluation::unavailable(self.name());
        };
        // positive when the higher timeframe agrees with the signal
        let distance = (bar.close - ma) * signal.direction.sign();
        let ok = match self.mode {
            HtfMode::Ma => distance > 0.0,
            HtfMode::EmaDistance => distance > 0.0 && distance >= self.min_distance,
        };
        let state = snapshot(&[
            ("htf_close", bar.close),
            ("htf_ma", ma),
            ("distance", distance),
            ("min_distance", self.min_distance),
        ]);
        SignalEvaluation::check(self.name(), ok, RejectionReason::HigherTimeframe, state)
    }
}
