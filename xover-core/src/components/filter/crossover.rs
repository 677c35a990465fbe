//! Crossover strength: the crossing bar's separation and, optionally, how far
//! apart the averages were on the other side before the cross.

use crate::components::signal::SignalEvent;

use super::{snapshot, FilterContext, RejectionReason, SignalEvaluation, SignalFilter};

#[derive(Debug, Clone)]
pub struct CrossoverStrengthFilter {
    /// Separation the crossing bar must exceed, in price units.
    threshold: f64,
    /// Minimum opposite-side separation before the cross, when enabled.
    min_pre_separation: Option<f64>,
}

impl CrossoverStrengthFilter {
    pub fn new(threshold: f64, min_pre_separation: Option<f64>) -> Self {
        Self {
            threshold,
            min_pre_separation,
        }
    }
}

impl SignalFilter for CrossoverStrengthFilter {
    fn name(&self) -> &str {
        "crossover_threshold"
    }

    fn evaluate(&self, signal: &SignalEvent, _ctx: &FilterContext<'_>) -> SignalEvaluation {
        let state = snapshot(&[
            ("separation", signal.separation),
            ("threshold", self.threshold),
            ("pre_separation", signal.pre_separation),
        ]);
        if signal.separation <= self.threshold {
            return SignalEvaluation::rejected(
                self.name(),
                RejectionReason::CrossoverThreshold,
                state,
            );
        }
        match self.min_pre_separation {
            Some(min) if signal.pre_separation < min => {
                SignalEvaluation::rejected(self.name(), RejectionReason::PreSeparation, state)
            }
            _ => SignalEvaluation::passed(self.name(), state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::filter::test_support::{bar_at, signal_on};
    use crate::components::filter::FilterVerdict;
    use crate::domain::{Side, Timeframe};
    use crate::engine::router::BarRouter;

    fn verdict(filter: &CrossoverStrengthFilter, separation: f64, pre: f64) -> FilterVerdict {
        let router = BarRouter::new();
        let bar = bar_at(Timeframe::minutes(15), 10, 0, 1.0);
        let mut signal = signal_on(&bar, Side::Long);
        signal.separation = separation;
        signal.pre_separation = pre;
        let ctx = FilterContext::new(&bar, Timeframe::minutes(15), &router);
        filter.evaluate(&signal, &ctx).verdict
    }

    #[test]
    fn separation_must_exceed_threshold() {
        let f = CrossoverStrengthFilter::new(0.0002, None);
        assert_eq!(
            verdict(&f, 0.0002, 0.0),
            FilterVerdict::Rejected(RejectionReason::CrossoverThreshold)
        );
        assert!(verdict(&f, 0.0003, 0.0).is_passed());
    }

    #[test]
    fn zero_threshold_accepts_any_cross() {
        let f = CrossoverStrengthFilter::new(0.0, None);
        assert!(verdict(&f, 1e-9, 0.0).is_passed());
    }

    #[test]
    fn pre_separation_minimum() {
        let f = CrossoverStrengthFilter::new(0.0, Some(0.0002));
        assert_eq!(
            verdict(&f, 0.001, 0.0001),
            FilterVerdict::Rejected(RejectionReason::PreSeparation)
        );
        assert!(verdict(&f, 0.001, 0.0002).is_passed());
    }
}
