//! Strategy engine: the streaming decision loop.
//!
//! The engine consumes bars of any configured timeframe in arrival order and
//! execution reports from the venue, and emits order commands. Per routed bar:
//!
//! 1. Regime: refresh from the regime timeframe's ADX
//! 2. Lifecycle: trailing / duration rules for the open position
//! 3. Primary: crossover detection, filter chain, entry or deferral
//! 4. Entry timing: pullback confirmation of a deferred signal
//! 5. Dormant: secondary crossovers while the primary timeframe is quiet
//!
//! The engine is single-threaded and owns all of its state; nothing is shared.

pub mod router;

use chrono::Timelike;
use serde::Serialize;
use tracing::{debug, info};

use crate::components::dormant::{DormantMode, DormantSignal, DormantStatus};
use crate::components::entry_timing::{EntryTiming, PendingSignal, TimingDecision};
use crate::components::filter::{
    snapshot, FilterChain, FilterContext, RejectionReason, RejectionRecord,
};
use crate::components::regime::{Regime, RegimeState};
use crate::components::risk::{RiskCalculator, RiskInputs, RiskLevels};
use crate::components::signal::{CrossoverDetector, SignalEvent};
use crate::config::{AdjustmentMultipliers, ConfigError, EngineConfig};
use crate::domain::{Bar, ExecutionEvent, OrderCommand, Position, PositionOrigin};
use crate::lifecycle::{ClosedPosition, LifecycleManager, Transition};

pub use router::{BarRouter, RouteOutcome};

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub bars_routed: u64,
    pub bars_dropped: u64,
    pub primary_signals: u64,
    pub dormant_signals: u64,
    pub brackets_submitted: u64,
    pub rejections: u64,
}

/// Serializable end-of-run report.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSummary {
    pub instrument: String,
    pub config_fingerprint: String,
    pub stats: EngineStats,
    pub regime: Regime,
    pub dormant: Option<DormantStatus>,
    pub open_position: Option<Position>,
    pub closed_positions: Vec<ClosedPosition>,
    pub rejections: Vec<RejectionRecord>,
}

#[derive(Debug)]
pub struct StrategyEngine {
    config: EngineConfig,
    router: BarRouter,
    detector: CrossoverDetector,
    primary_filters: FilterChain,
    dormant_filters: FilterChain,
    regime: RegimeState,
    risk: RiskCalculator,
    dormant_risk: RiskCalculator,
    dormant: Option<DormantMode>,
    entry_timing: Option<EntryTiming>,
    lifecycle: LifecycleManager,
    rejections: Vec<RejectionRecord>,
    stats: EngineStats,
}

impl StrategyEngine {
    /// Build an engine from a configuration, validating it first.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let signal = &config.signal;
        let lookback = if signal.pre_separation.enabled {
            signal.pre_separation.lookback_bars
        } else {
            1
        };
        let engine = Self {
            router: BarRouter::from_config(&config),
            detector: CrossoverDetector::new(
                signal.ma_type,
                signal.fast_period,
                signal.slow_period,
                lookback,
            ),
            primary_filters: FilterChain::primary(&config),
            dormant_filters: FilterChain::dormant(&config),
            regime: RegimeState::new(&config.regime, config.regime_timeframe()),
            risk: RiskCalculator::new(&config),
            dormant_risk: RiskCalculator::dormant(&config),
            dormant: DormantMode::from_config(&config),
            entry_timing: EntryTiming::from_config(&config),
            lifecycle: LifecycleManager::new(&config),
            rejections: Vec::new(),
            stats: EngineStats::default(),
            config,
        };
        info!(
            instrument = %engine.config.instrument,
            primary = %engine.config.primary_timeframe,
            filters = ?engine.primary_filters.names(),
            fingerprint = %engine.config.fingerprint(),
            "engine ready"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn router(&self) -> &BarRouter {
        &self.router
    }

    pub fn rejections(&self) -> &[RejectionRecord] {
        &self.rejections
    }

    pub fn closed_positions(&self) -> &[ClosedPosition] {
        self.lifecycle.closed_positions()
    }

    pub fn position(&self) -> Option<&Position> {
        self.lifecycle.position()
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn regime(&self) -> Regime {
        self.regime.regime()
    }

    pub fn dormant_status(&self) -> Option<DormantStatus> {
        self.dormant.as_ref().map(|d| d.status())
    }

    pub fn pending_entry(&self) -> Option<&PendingSignal> {
        self.entry_timing.as_ref().and_then(|et| et.pending())
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            bars_dropped: self.router.dropped_bars(),
            rejections: self.rejections.len() as u64,
            ..self.stats
        }
    }

    pub fn summary(&self) -> EngineSummary {
        EngineSummary {
            instrument: self.config.instrument.clone(),
            config_fingerprint: self.config.fingerprint(),
            stats: self.stats(),
            regime: self.regime(),
            dormant: self.dormant_status(),
            open_position: self.position().cloned(),
            closed_positions: self.closed_positions().to_vec(),
            rejections: self.rejections.clone(),
        }
    }

    /// Process one bar and return the order commands it produced.
    pub fn on_bar(&mut self, bar: &Bar) -> Vec<OrderCommand> {
        if self.router.route(bar) != RouteOutcome::Routed {
            return Vec::new();
        }
        self.stats.bars_routed += 1;
        let timeframe = bar.timeframe;
        let mut commands = Vec::new();

        if self.regime.enabled() && timeframe == self.regime.timeframe() {
            let adx = self.router.value(timeframe, self.regime.adx_key());
            self.regime.update(adx);
        }

        commands.extend(self.lifecycle.on_bar(bar));

        if timeframe == self.config.primary_timeframe {
            commands.extend(self.on_primary_bar(bar));
        }
        if self.entry_timing.as_ref().map(|et| et.timeframe()) == Some(timeframe) {
            commands.extend(self.on_entry_timing_bar(bar));
        }
        if self.dormant.as_ref().map(|d| d.timeframe()) == Some(timeframe) {
            commands.extend(self.on_dormant_bar(bar));
        }

        self.stats.brackets_submitted += commands
            .iter()
            .filter(|c| matches!(c, OrderCommand::SubmitBracket(_)))
            .count() as u64;
        commands
    }

    /// Apply one execution report. Safe to call with duplicates.
    pub fn on_execution_event(&mut self, event: &ExecutionEvent) {
        if let Some(Transition::Opened(id)) = self.lifecycle.on_event(event) {
            if let Some(pending) = self.entry_timing.as_mut().and_then(|et| et.clear()) {
                debug!(position = %id, direction = ?pending.signal.direction, "pending entry dropped, position open");
            }
        }
    }

    fn on_primary_bar(&mut self, bar: &Bar) -> Vec<OrderCommand> {
        let Some(set) = self.router.set(bar.timeframe) else {
            return Vec::new();
        };
        let signal = self.detector.on_bar(bar, set.values());
        if let Some(dormant) = self.dormant.as_mut() {
            dormant.on_primary_bar(bar.timestamp, self.detector.trend(), signal.is_some());
        }
        let Some(signal) = signal else {
            return Vec::new();
        };
        self.stats.primary_signals += 1;
        info!(
            direction = ?signal.direction,
            close = signal.close,
            separation = signal.separation,
            timestamp = %signal.timestamp,
            "primary crossover"
        );

        let ctx = FilterContext::new(bar, self.config.primary_timeframe, &self.router);
        let rejection = self.primary_filters.first_rejection(&signal, &ctx);
        if let Some(record) = rejection.and_then(|e| RejectionRecord::from_evaluation(&signal, e)) {
            self.record(record);
            return Vec::new();
        }

        match self.entry_timing.as_mut() {
            Some(et) => {
                if let Some(superseded) = et.clear() {
                    debug!(direction = ?superseded.signal.direction, "pending entry superseded");
                }
                et.defer(signal, PositionOrigin::Primary);
                Vec::new()
            }
            None => self.enter(&signal, bar, PositionOrigin::Primary),
        }
    }

    fn on_entry_timing_bar(&mut self, bar: &Bar) -> Vec<OrderCommand> {
        let decision = match (self.entry_timing.as_mut(), self.router.set(bar.timeframe)) {
            (Some(et), Some(set)) => et.on_bar(bar, set.values()),
            _ => None,
        };
        match decision {
            Some(TimingDecision::Confirmed(pending)) => {
                info!(direction = ?pending.signal.direction, close = bar.close, "pullback confirmed");
                self.enter(&pending.signal, bar, pending.origin)
            }
            Some(TimingDecision::TimedOutExecute(pending)) => {
                info!(direction = ?pending.signal.direction, close = bar.close, "entry timed out, executing");
                self.enter(&pending.signal, bar, pending.origin)
            }
            Some(TimingDecision::Dropped(pending)) => {
                let state = snapshot(&[("timeout_bars", self.config.entry_timing.timeout_bars as f64)]);
                self.record(RejectionRecord::for_signal(
                    &pending.signal,
                    RejectionReason::EntryTimeout,
                    "entry_timing",
                    state,
                ));
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn on_dormant_bar(&mut self, bar: &Bar) -> Vec<OrderCommand> {
        let outcome = match (self.dormant.as_mut(), self.router.set(bar.timeframe)) {
            (Some(dormant), Some(set)) => dormant.on_bar(bar, set.values()),
            _ => None,
        };
        let signal = match outcome {
            Some(DormantSignal::Aligned(signal)) => signal,
            Some(DormantSignal::Misaligned(signal)) => {
                self.stats.dormant_signals += 1;
                let trend = self
                    .dormant
                    .as_ref()
                    .and_then(|d| d.primary_trend())
                    .map(|s| s.sign())
                    .unwrap_or(0.0);
                self.record(RejectionRecord::for_signal(
                    &signal,
                    RejectionReason::DormantMisaligned,
                    "dormant",
                    snapshot(&[("primary_trend", trend)]),
                ));
                return Vec::new();
            }
            None => return Vec::new(),
        };
        self.stats.dormant_signals += 1;
        info!(direction = ?signal.direction, close = signal.close, "dormant crossover");

        let ctx = FilterContext::new(bar, self.config.primary_timeframe, &self.router);
        let rejection = self.dormant_filters.first_rejection(&signal, &ctx);
        if let Some(record) = rejection.and_then(|e| RejectionRecord::from_evaluation(&signal, e)) {
            self.record(record);
            return Vec::new();
        }
        self.enter(&signal, bar, PositionOrigin::Dormant)
    }

    /// Open (or reverse into) a position for `signal` at `bar`'s close.
    fn enter(&mut self, signal: &SignalEvent, bar: &Bar, origin: PositionOrigin) -> Vec<OrderCommand> {
        let mut commands = Vec::new();
        if let Some(open_side) = self.lifecycle.exposure() {
            if open_side == signal.direction || !self.config.position.allow_reversal {
                self.record(RejectionRecord::for_signal(
                    signal,
                    RejectionReason::PositionLimit,
                    "position_limit",
                    snapshot(&[("open_side", open_side.sign())]),
                ));
                return commands;
            }
            commands.extend(self.lifecycle.close_for_reversal());
        }

        let levels = self.levels_for(bar, origin);
        commands.push(self.lifecycle.open(
            signal.direction,
            bar.close,
            levels,
            signal.timeframe,
            origin,
        ));
        commands
    }

    fn levels_for(&self, bar: &Bar, origin: PositionOrigin) -> RiskLevels {
        let primary = self.config.primary_timeframe;
        let hour = primary.ceil_to_boundary(bar.timestamp).hour();
        match origin {
            PositionOrigin::Primary => {
                let inputs = RiskInputs {
                    atr: self.router.value(primary, self.risk.atr_key()),
                    atr_rank: self
                        .risk
                        .rank_key()
                        .and_then(|key| self.router.value(primary, key)),
                    hour,
                };
                self.risk.compute(&inputs, &self.regime.adjustments())
            }
            PositionOrigin::Dormant => self.dormant_risk.compute(
                &RiskInputs {
                    hour,
                    ..RiskInputs::default()
                },
                &AdjustmentMultipliers::default(),
            ),
        }
    }

    fn record(&mut self, record: RejectionRecord) {
        info!(
            direction = ?record.direction,
            reason = record.reason.as_str(),
            filter = %record.filter_name,
            timestamp = %record.timestamp,
            "signal rejected"
        );
        self.rejections.push(record);
    }
}
