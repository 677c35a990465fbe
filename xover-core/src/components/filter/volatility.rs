//! Volatility strength: the market must move at least `min_atr` per bar.

use crate::components::signal::SignalEvent;
use crate::domain::Timeframe;
use crate::indicators::atr_key;

use super::{snapshot, FilterContext, RejectionReason, SignalEvaluation, SignalFilter};

#[derive(Debug, Clone)]
pub struct VolatilityFilter {
    timeframe: Timeframe,
    key: String,
    /// Minimum ATR in price units.
    min_atr: f64,
}

impl VolatilityFilter {
    pub fn new(timeframe: Timeframe, period: usize, min_atr: f64) -> Self {
        Self {
            timeframe,
            key: atr_key(period),
            min_atr,
        }
    }
}

impl SignalFilter for VolatilityFilter {
    fn name(&self) -> &str {
        "atr"
    }

    fn evaluate(&self, _signal: &SignalEvent, ctx: &FilterContext<'_>) -> SignalEvaluation {
        let Some(atr) = ctx.value(self.timeframe, &self.key) else {
            return SignalEvaluation::unavailable(self.name());
        };
        let state = snapshot(&[("atr", atr), ("min_atr", self.min_atr)]);
        SignalEvaluation::check(
            self.name(),
            atr >= self.min_atr,
            RejectionReason::Volatility,
            state,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::filter::test_support::{bar_at, signal_on};
    use crate::domain::Side;
    use crate::engine::router::BarRouter;

    #[test]
    fn quiet_market_rejected() {
        let tf = Timeframe::minutes(15);
        let mut router = BarRouter::new();
        router.inject(tf, "atr_14", 0.0002);
        let bar = bar_at(tf, 10, 0, 1.0);
        let ctx = FilterContext::new(&bar, tf, &router);
        let signal = signal_on(&bar, Side::Short);

        let strict = VolatilityFilter::new(tf, 14, 0.0003);
        assert!(!strict.evaluate(&signal, &ctx).verdict.is_passed());
        let loose = VolatilityFilter::new(tf, 14, 0.0001);
        assert!(loose.evaluate(&signal, &ctx).verdict.is_passed());
    }
}
