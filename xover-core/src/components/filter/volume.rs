//! Liquidity guard: the signal bar's volume against its rolling average.

use crate::components::signal::SignalEvent;
use crate::domain::Timeframe;
use crate::indicators::volume_avg_key;

use super::{snapshot, FilterContext, RejectionReason, SignalEvaluation, SignalFilter};

#[derive(Debug, Clone)]
pub struct VolumeFilter {
    timeframe: Timeframe,
    key: String,
    min_ratio: f64,
}

impl VolumeFilter {
    pub fn new(timeframe: Timeframe, period: usize, min_ratio: f64) -> Self {
        Self {
            timeframe,
            key: volume_avg_key(period),
            min_ratio,
        }
    }
}

impl SignalFilter for VolumeFilter {
    fn name(&self) -> &str {
        "volume"
    }

    fn evaluate(&self, _signal: &SignalEvent, ctx: &FilterContext<'_>) -> SignalEvaluation {
        let Some(avg) = ctx.value(self.timeframe, &self.key) else {
            return SignalEvaluation::unavailable(self.name());
        };
        let volume = ctx.bar.volume;
        let state = snapshot(&[
            ("volume", volume),
            ("average", avg),
            ("min_ratio", self.min_ratio),
        ]);
        SignalEvaluation::check(
            self.name(),
            volume >= self.min_ratio * avg,
            RejectionReason::Volume,
            state,
        )
    }
}
