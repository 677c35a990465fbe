//! xover core: a streaming multi-timeframe moving-average crossover decision engine.
//!
//! This crate contains all of the decision logic:
//! - Domain types (bars, timeframes, order tags, order commands, execution reports)
//! - Configuration loading, validation, and fingerprinting
//! - Streaming indicators with one indicator set per timeframe
//! - Signal detection, the filter chain, regime and risk sizing
//! - Position lifecycle with the stop ratchet invariant
//! - The execution seam, a simulated venue, and a replay harness

pub mod components;
pub mod config;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod indicators;
pub mod lifecycle;

pub use config::{ConfigError, EngineConfig};
pub use engine::{EngineSummary, StrategyEngine};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the engine and everything it hands out are Send + Sync,
    /// so a driver can move an engine onto its own thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Timeframe>();
        require_sync::<domain::Timeframe>();
        require_send::<domain::OrderTag>();
        require_sync::<domain::OrderTag>();
        require_send::<domain::OrderCommand>();
        require_sync::<domain::OrderCommand>();
        require_send::<domain::ExecutionEvent>();
        require_sync::<domain::ExecutionEvent>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();

        // Component types
        require_send::<components::SignalEvent>();
        require_sync::<components::SignalEvent>();
        require_send::<components::RejectionRecord>();
        require_sync::<components::RejectionRecord>();
        require_send::<components::FilterChain>();
        require_sync::<components::FilterChain>();
        require_send::<components::IndicatorValues>();
        require_sync::<components::IndicatorValues>();

        // Engine types
        require_send::<EngineConfig>();
        require_sync::<EngineConfig>();
        require_send::<StrategyEngine>();
        require_sync::<StrategyEngine>();
        require_send::<engine::BarRouter>();
        require_sync::<engine::BarRouter>();
        require_send::<lifecycle::LifecycleManager>();
        require_sync::<lifecycle::LifecycleManager>();
        require_send::<execution::SimulatedVenue>();
        require_sync::<execution::SimulatedVenue>();
    }

    /// Architecture contract: filters see the signal and a read-only market view only.
    ///
    /// `evaluate()` takes `&SignalEvent` and `&FilterContext`; there is no way to
    /// reach the lifecycle or the venue from a filter.
    #[test]
    fn signal_filter_trait_has_no_position_parameter() {
        fn _check_trait_object_builds(
            filter: &dyn components::SignalFilter,
            signal: &components::SignalEvent,
            ctx: &components::FilterContext<'_>,
        ) -> components::SignalEvaluation {
            filter.evaluate(signal, ctx)
        }
    }

    /// Architecture contract: indicators only ever see bars of their own timeframe.
    #[test]
    fn indicator_trait_sees_single_bar() {
        fn _check_trait_object_builds(
            indicator: &mut dyn components::Indicator,
            bar: &domain::Bar,
            out: &mut components::IndicatorValues,
        ) {
            indicator.update(bar, out)
        }
    }
}
