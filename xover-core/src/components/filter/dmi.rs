//! Trend direction via the directional movement index: +DI must lead -DI for
//! longs and trail it for shorts, optionally with a minimum ADX.

use crate::components::signal::SignalEvent;
use crate::domain::{Side, Timeframe};
use crate::indicators::{adx_key, minus_di_key, plus_di_key};

use super::{snapshot, FilterContext, RejectionReason, SignalEvaluation, SignalFilter};

#[derive(Debug, Clone)]
pub struct DmiFilter {
    timeframe: Timeframe,
    min_adx: Option<f64>,
    plus_key: String,
    minus_key: String,
    adx_key: String,
}

impl DmiFilter {
    pub fn new(timeframe: Timeframe, period: usize, min_adx: Option<f64>) -> Self {
        Self {
            timeframe,
            min_adx,
            plus_key: plus_di_key(period),
            minus_key: minus_di_key(period),
            adx_key: adx_key(period),
        }
    }
}

impl SignalFilter for DmiFilter {
    fn name(&self) -> &str {
        "dmi"
    }

    fn evaluate(&self, signal: &SignalEvent, ctx: &FilterContext<'_>) -> SignalEvaluation {
        let (Some(plus), Some(minus)) = (
            ctx.value(self.timeframe, &self.plus_key),
            ctx.value(self.timeframe, &self.minus_key),
        ) else {
            return SignalEvaluation::unavailable(self.name());
        };

        let mut state = snapshot(&[("plus_di", plus), ("minus_di", minus)]);
        let aligned = match signal.direction {
            Side::Long => plus > minus,
            Side::Short => minus > plus,
        };
        if !aligned {
            return SignalEvaluation::rejected(self.name(), RejectionReason::TrendDirection, state);
        }

        if let Some(min_adx) = self.min_adx {
            let Some(adx) = ctx.value(self.timeframe, &self.adx_key) else {
                return SignalEvaluation::unavailable(self.name());
            };
            state.insert("adx".into(), adx);
            state.insert("min_adx".into(), min_adx);
            if adx < min_adx {
                return SignalEvaluation::rejected(
                    self.name(),
                    RejectionReason::TrendDirection,
                    state,
                );
            }
        }
        SignalEvaluation::passed(self.name(), state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::filter::test_support::{bar_at, signal_on};
    use crate::components::filter::FilterVerdict;
    use crate::engine::router::BarRouter;

    fn router(plus: f64, minus: f64, adx: Option<f64>) -> BarRouter {
        let mut r = BarRouter::new();
        let h1 = Timeframe::hours(1);
        r.inject(h1, "plus_di_14", plus);
        r.inject(h1, "minus_di_14", minus);
        if let Some(a) = adx {
            r.inject(h1, "adx_14", a);
        }
        r
    }

    fn verdict(filter: &DmiFilter, router: &BarRouter, side: Side) -> FilterVerdict {
        let bar = bar_at(Timeframe::minutes(15), 10, 0, 1.0);
        let signal = signal_on(&bar, side);
        let ctx = FilterContext::new(&bar, Timeframe::minutes(15), router);
        filter.evaluate(&signal, &ctx).verdict
    }

    #[test]
    fn direction_must_agree_with_di() {
        let f = DmiFilter::new(Timeframe::hours(1), 14, None);
        let r = router(30.0, 10.0, None);
        assert!(verdict(&f, &r, Side::Long).is_passed());
        assert_eq!(
            verdict(&f, &r, Side::Short),
            FilterVerdict::Rejected(RejectionReason::TrendDirection)
        );
    }

    #[test]
    fn minimum_adx() {
        let f = DmiFilter::new(Timeframe::hours(1), 14, Some(20.0));
        assert!(!verdict(&f, &router(30.0, 10.0, Some(15.0)), Side::Long).is_passed());
        assert!(verdict(&f, &router(30.0, 10.0, Some(25.0)), Side::Long).is_passed());
    }

    #[test]
    fn missing_values_reject() {
        let f = DmiFilter::new(Timeframe::hours(1), 14, None);
        assert_eq!(
            verdict(&f, &BarRouter::new(), Side::Long),
            FilterVerdict::Rejected(RejectionReason::IndicatorUnavailable)
        );
    }
}
