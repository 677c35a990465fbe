//! Momentum confirmation via the stochastic oscillator.
//!
//! Longs need a recent %K-over-%D cross (at most `max_bars_since_cross` bars
//! old) with %K above the bullish level; shorts need a recent %K-under-%D
//! cross with %K below the bearish level. The qualifying cross must also be
//! the latest one: an opposite cross after it rejects.

use crate::components::signal::SignalEvent;
use crate::config::StochasticFilterConfig;
use crate::domain::{Side, Timeframe};
use crate::indicators::{stochastic_keys, StochasticKeys};

use super::{snapshot, FilterContext, RejectionReason, SignalEvaluation, SignalFilter};

#[derive(Debug, Clone)]
pub struct StochasticFilter {
    timeframe: Timeframe,
    bullish_threshold: f64,
    bearish_threshold: f64,
    max_bars_since_cross: usize,
    keys: StochasticKeys,
}

impl StochasticFilter {
    pub fn new(timeframe: Timeframe, config: &StochasticFilterConfig) -> Self {
        Self {
            timeframe,
            bullish_threshold: config.bullish_threshold,
            bearish_threshold: config.bearish_threshold,
            max_bars_since_cross: config.max_bars_since_cross,
            keys: stochastic_keys(config.k_period, config.d_period),
        }
    }
}

impl SignalFilter for StochasticFilter {
    fn name(&self) -> &str {
        "stochastic"
    }

    fn evaluate(&self, signal: &SignalEvent, ctx: &FilterContext<'_>) -> SignalEvaluation {
        let Some(k) = ctx.value(self.timeframe, &self.keys.k) else {
            return SignalEvaluation::unavailable(self.name());
        };
        let (age_key, opposite_key, level, beyond) = match signal.direction {
            Side::Long => (
                &self.keys.bull_age,
                &self.keys.bear_age,
                self.bullish_threshold,
                k > self.bullish_threshold,
            ),
            Side::Short => (
                &self.keys.bear_age,
                &self.keys.bull_age,
                self.bearish_threshold,
                k < self.bearish_threshold,
            ),
        };
        let age = ctx.value(self.timeframe, age_key);
        let opposite_age = ctx.value(self.timeframe, opposite_key);

        let mut state = snapshot(&[("k", k), ("threshold", level)]);
        if let Some(d) = ctx.value(self.timeframe, &self.keys.d) {
            state.insert("d".into(), d);
        }
        if let Some(a) = age {
            state.insert("bars_since_cross".into(), a);
        }

        let recent = age.is_some_and(|a| a <= self.max_bars_since_cross as f64);
        let latest = match (age, opposite_age) {
            (Some(a), Some(o)) => a < o,
            _ => true,
        };
        SignalEvaluation::check(
            self.name(),
            recent && latest && beyond,
            RejectionReason::Momentum,
            state,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::filter::test_support::{bar_at, signal_on};
    use crate::components::filter::FilterVerdict;
    use crate::engine::router::BarRouter;

    fn filter() -> StochasticFilter {
        StochasticFilter::new(Timeframe::minutes(15), &StochasticFilterConfig::default())
    }

    fn router(k: f64, bull_age: Option<f64>, bear_age: Option<f64>) -> BarRouter {
        let tf = Timeframe::minutes(15);
        let mut r = BarRouter::new();
        r.inject(tf, "stoch_k_14_3", k);
        r.inject(tf, "stoch_d_14_3", k - 1.0);
        r.inject(tf, "stoch_bull_age_14_3", bull_age.unwrap_or(f64::NAN));
        r.inject(tf, "stoch_bear_age_14_3", bear_age.unwrap_or(f64::NAN));
        r
    }

    fn verdict(router: &BarRouter, side: Side) -> FilterVerdict {
        let bar = bar_at(Timeframe::minutes(15), 10, 0, 1.0);
        let signal = signal_on(&bar, side);
        let ctx = FilterContext::new(&bar, Timeframe::minutes(15), router);
        filter().evaluate(&signal, &ctx).verdict
    }

    #[test]
    fn recent_bullish_cross_above_level_passes() {
        assert!(verdict(&router(45.0, Some(3.0), None), Side::Long).is_passed());
    }

    #[test]
    fn stale_cross_rejects() {
        assert_eq!(
            verdict(&router(45.0, Some(10.0), None), Side::Long),
            FilterVerdict::Rejected(RejectionReason::Momentum)
        );
    }

    #[test]
    fn level_must_be_beyond_threshold() {
        assert!(!verdict(&router(25.0, Some(1.0), None), Side::Long).is_passed());
        assert!(verdict(&router(60.0, None, Some(0.0)), Side::Short).is_passed());
        assert!(!verdict(&router(75.0, None, Some(0.0)), Side::Short).is_passed());
    }

    #[test]
    fn no_cross_yet_rejects() {
        assert!(!verdict(&router(50.0, None, None), Side::Long).is_passed());
    }

    #[test]
    fn later_opposite_cross_overrides() {
        // bull cross 6 bars ago, bear cross since
        assert_eq!(
            verdict(&router(45.0, Some(6.0), Some(1.0)), Side::Long),
            FilterVerdict::Rejected(RejectionReason::Momentum)
        );
        assert!(!verdict(&router(10.0, Some(0.0), Some(2.0)), Side::Short).is_passed());
        // the older opposite cross does not matter
        assert!(verdict(&router(45.0, Some(1.0), Some(6.0)), Side::Long).is_passed());
    }

    #[test]
    fn live_oscillator_turning_down_rejects_long() {
        use crate::domain::Bar;
        use crate::indicators::Stochastic;

        let tf = Timeframe::minutes(15);
        let mut router = BarRouter::new();
        router.register(tf, Box::new(Stochastic::new(5, 3)));

        // slide, rally (bull cross), then a sharp turn (bear cross)
        let mut closes: Vec<f64> = (0..8).map(|i| 100.0 - i as f64).collect();
        for step in [2.0, 2.0, 2.0, 2.0, 2.0, 2.0, -3.0, -3.0] {
            let last = closes[closes.len() - 1];
            closes.push(last + step);
        }
        let start = bar_at(tf, 0, 0, 0.0).timestamp;
        let mut prev = closes[0];
        let mut last_bar = None;
        for (i, &close) in closes.iter().enumerate() {
            let bar = Bar {
                timeframe: tf,
                timestamp: start + tf.duration() * i as i32,
                open: prev,
                high: prev.max(close) + 0.5,
                low: prev.min(close) - 0.5,
                close,
                volume: 1000.0,
            };
            prev = close;
            router.route(&bar);
            last_bar = Some(bar);
        }
        let bar = last_bar.unwrap();
        assert_eq!(router.value(tf, "stoch_bull_age_5_3"), Some(7.0));
        assert_eq!(router.value(tf, "stoch_bear_age_5_3"), Some(1.0));

        let config = StochasticFilterConfig {
            k_period: 5,
            d_period: 3,
            bullish_threshold: 0.0,
            max_bars_since_cross: 10,
            ..StochasticFilterConfig::default()
        };
        let signal = signal_on(&bar, Side::Long);
        let ctx = FilterContext::new(&bar, tf, &router);
        let evaluation = StochasticFilter::new(tf, &config).evaluate(&signal, &ctx);
        assert_eq!(
            evaluation.verdict,
            FilterVerdict::Rejected(RejectionReason::Momentum)
        );
    }
}
