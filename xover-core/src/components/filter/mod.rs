//! Signal filters: gate crossover signals on market conditions.
//!
//! Filters evaluate a `SignalEvent` against indicator state and produce a
//! `SignalEvaluation` record carrying the verdict and a snapshot of the values
//! the filter looked at. A veto is data, never an error.
//!
//! Filters are portfolio-agnostic: they read indicator sets through a
//! `FilterContext` and never see positions or orders.

pub mod chain;
pub mod crossover;
pub mod dmi;
pub mod higher_timeframe;
pub mod rsi;
pub mod stochastic;
pub mod time_of_day;
pub mod volatility;
pub mod volume;

pub use chain::FilterChain;
pub use crossover::CrossoverStrengthFilter;
pub use dmi::DmiFilter;
pub use higher_timeframe::HigherTimeframeFilter;
pub use rsi::RsiFilter;
pub use stochastic::StochasticFilter;
pub use time_of_day::TimeOfDayFilter;
pub use volatility::VolatilityFilter;
pub use volume::VolumeFilter;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::signal::SignalEvent;
use crate::domain::{Bar, Side, Timeframe};
use crate::engine::router::BarRouter;

/// Trait for signal filters.
pub trait SignalFilter: Send + Sync {
    /// Stable name used in rejection records (e.g. "dmi", "time_of_day").
    fn name(&self) -> &str;

    fn evaluate(&self, signal: &SignalEvent, ctx: &FilterContext<'_>) -> SignalEvaluation;
}

/// What a filter is allowed to see while evaluating a signal.
pub struct FilterContext<'a> {
    /// Bar the signal was detected on.
    pub bar: &'a Bar,
    /// Bar close time rounded up to the primary timeframe boundary.
    pub close_time: DateTime<Utc>,
    router: &'a BarRouter,
}

impl<'a> FilterContext<'a> {
    pub fn new(bar: &'a Bar, primary: Timeframe, router: &'a BarRouter) -> Self {
        Self {
            bar,
            close_time: primary.ceil_to_boundary(bar.timestamp),
            router,
        }
    }

    /// Current value of `key` on `timeframe`, `None` when absent or warming up.
    pub fn value(&self, timeframe: Timeframe, key: &str) -> Option<f64> {
        self.router.value(timeframe, key)
    }

    /// Most recent bar routed on `timeframe`.
    pub fn last_bar(&self, timeframe: Timeframe) -> Option<&Bar> {
        self.router.last_bar(timeframe)
    }
}

/// Why a signal did not become a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    CrossoverThreshold,
    PreSeparation,
    TimeOfDay,
    TrendDirection,
    Momentum,
    Rsi,
    Volume,
    Volatility,
    HigherTimeframe,
    /// A value the filter needs is missing or still warming up.
    IndicatorUnavailable,
    /// A position is already open and the signal cannot replace it.
    PositionLimit,
    /// Dormant crossover against the last primary trend.
    DormantMisaligned,
    /// Deferred entry timed out under the drop policy.
    EntryTimeout,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrossoverThreshold => "crossover_threshold",
            Self::PreSeparation => "pre_separation",
            Self::TimeOfDay => "time_of_day",
            Self::TrendDirection => "trend_direction",
            Self::Momentum => "momentum",
            Self::Rsi => "rsi",
            Self::Volume => "volume",
            Self::Volatility => "volatility",
            Self::HigherTimeframe => "higher_timeframe",
            Self::IndicatorUnavailable => "indicator_unavailable",
            Self::PositionLimit => "position_limit",
            Self::DormantMisaligned => "dormant_misaligned",
            Self::EntryTimeout => "entry_timeout",
        }
    }
}

/// Outcome of a signal filter evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterVerdict {
    Passed,
    Rejected(RejectionReason),
}

impl FilterVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Record of one filter evaluating one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvaluation {
    pub filter_name: String,
    pub verdict: FilterVerdict,
    /// Values the filter looked at (e.g. "adx", "plus_di").
    pub filter_state: BTreeMap<String, f64>,
}

impl SignalEvaluation {
    pub fn passed(filter_name: &str, filter_state: BTreeMap<String, f64>) -> Self {
        Self {
            filter_name: filter_name.to_string(),
            verdict: FilterVerdict::Passed,
            filter_state,
        }
    }

    pub fn rejected(
        filter_name: &str,
        reason: RejectionReason,
        filter_state: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            filter_name: filter_name.to_string(),
            verdict: FilterVerdict::Rejected(reason),
            filter_state,
        }
    }

    /// Pass when `ok`, otherwise reject with `reason`.
    pub fn check(
        filter_name: &str,
        ok: bool,
        reason: RejectionReason,
        filter_state: BTreeMap<String, f64>,
    ) -> Self {
        if ok {
            Self::passed(filter_name, filter_state)
        } else {
            Self::rejected(filter_name, reason, filter_state)
        }
    }

    pub fn unavailable(filter_name: &str) -> Self {
        Self::rejected(
            filter_name,
            RejectionReason::IndicatorUnavailable,
            BTreeMap::new(),
        )
    }
}

/// Append-only log entry for a vetoed signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub direction: Side,
    pub reason: RejectionReason,
    pub filter_name: String,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub state: BTreeMap<String, f64>,
}

impl RejectionRecord {
    /// Build a record from a rejecting evaluation. Returns `None` for a pass.
    pub fn from_evaluation(signal: &SignalEvent, evaluation: SignalEvaluation) -> Option<Self> {
        match evaluation.verdict {
            FilterVerdict::Passed => None,
            FilterVerdict::Rejected(reason) => Some(Self {
                direction: signal.direction,
                reason,
                filter_name: evaluation.filter_name,
                timeframe: signal.timeframe,
                timestamp: signal.timestamp,
                close: signal.close,
                state: evaluation.filter_state,
            }),
        }
    }

    /// Record a rejection decided outside the filter chain (position limit, timeouts).
    pub fn for_signal(
        signal: &SignalEvent,
        reason: RejectionReason,
        filter_name: &str,
        state: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            direction: signal.direction,
            reason,
            filter_name: filter_name.to_string(),
            timeframe: signal.timeframe,
            timestamp: signal.timestamp,
            close: signal.close,
            state,
        }
    }
}

/// Build a filter-state snapshot from (name, value) pairs.
pub fn snapshot(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}
