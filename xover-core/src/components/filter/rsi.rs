//! RSI guard: no longs into overbought, no shorts into oversold.

use crate::components::signal::SignalEvent;
use crate::domain::{Side, Timeframe};
use crate::indicators::rsi_key;

use super::{snapshot, FilterContext, RejectionReason, SignalEvaluation, SignalFilter};

#[derive(Debug, Clone)]
pub struct RsiFilter {
    timeframe: Timeframe,
    key: String,
    overbought: f64,
    oversold: f64,
}

impl RsiFilter {
    pub fn new(timeframe: Timeframe, period: usize, overbought: f64, oversold: f64) -> Self {
        Self {
            timeframe,
            key: rsi_key(period),
            overbought,
            oversold,
        }
    }
}

impl SignalFilter for RsiFilter {
    fn name(&self) -> &str {
        "rsi"
    }

    fn evaluate(&self, signal: &SignalEvent, ctx: &FilterContext<'_>) -> SignalEvaluation {
        let Some(rsi) = ctx.value(self.timeframe, &self.key) else {
            return SignalEvaluation::unavailable(self.name());
        };
        let ok = match signal.direction {
            Side::Long => rsi < self.overbought,
            Side::Short => rsi > self.oversold,
        };
        let state = snapshot(&[
            ("rsi", rsi),
            ("overbought", self.overbought),
            ("oversold", self.oversold),
        ]);
        SignalEvaluation::check(self.name(), ok, RejectionReason::Rsi, state)
    }
}
