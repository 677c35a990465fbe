//! Strategy components: the building blocks the engine composes per bar.
//!
//! - Signal: fast/slow crossover detection on one timeframe
//! - Filter: ordered veto chain over detected signals
//! - Regime: ADX classification feeding risk multipliers
//! - Risk: stop / target / trailing distances
//! - Dormant and entry timing: secondary signal paths on faster timeframes
//!
//! Plus the indicator trait for streaming numeric series.

pub mod dormant;
pub mod entry_timing;
pub mod filter;
pub mod indicator;
pub mod regime;
pub mod risk;
pub mod signal;

pub use dormant::{DormantMode, DormantSignal, DormantStatus};
pub use entry_timing::{EntryTiming, PendingSignal, TimingDecision};
pub use filter::{
    FilterChain, FilterContext, FilterVerdict, RejectionReason, RejectionRecord, SignalEvaluation,
    SignalFilter,
};
pub use indicator::{Indicator, IndicatorValues};
pub use regime::{Regime, RegimeState};
pub use risk::{RiskCalculator, RiskInputs, RiskLevels, RiskSource};
pub use signal::{CrossoverDetector, SignalEvent};
