//! Deferred entries: wait on a faster timeframe for a pullback before entering.
//!
//! A signal that passes the primary filters becomes a `PendingSignal`. Each
//! entry-timing bar either confirms it (long: the bar trades down to the
//! reference level and closes bullish; short: mirror) or counts down its
//! timeout. Only one pending signal exists at a time.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::components::indicator::IndicatorValues;
use crate::components::signal::SignalEvent;
use crate::config::{EngineConfig, MaType, PullbackReference, TimeoutPolicy};
use crate::domain::{Bar, PositionOrigin, Side, Timeframe};
use crate::indicators::ma_key;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingSignal {
    pub signal: SignalEvent,
    pub origin: PositionOrigin,
    pub created_at: DateTime<Utc>,
    pub bars_remaining: usize,
}

/// What an entry-timing bar did to the pending signal.
#[derive(Debug, Clone, PartialEq)]
pub enum TimingDecision {
    /// Pullback seen; enter at this bar's close.
    Confirmed(PendingSignal),
    /// Timed out with the execute policy; enter at this bar's close.
    TimedOutExecute(PendingSignal),
    /// Timed out with the drop policy.
    Dropped(PendingSignal),
}

#[derive(Debug, Clone)]
pub struct EntryTiming {
    timeframe: Timeframe,
    reference: PullbackReference,
    ema_key: Option<String>,
    timeout_bars: usize,
    on_timeout: TimeoutPolicy,
    pending: Option<PendingSignal>,
}

impl EntryTiming {
    /// `None` unless entry timing is enabled with a timeframe.
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let et = &config.entry_timing;
        let timeframe = et.timeframe.filter(|_| et.enabled)?;
        let ema_key = match et.reference {
            PullbackReference::Ema { period } => Some(ma_key(MaType::Ema, period)),
            PullbackReference::SignalFastMa => None,
        };
        Some(Self {
            timeframe,
            reference: et.reference.clone(),
            ema_key,
            timeout_bars: et.timeout_bars.max(1),
            on_timeout: et.on_timeout,
            pending: None,
        })
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn pending(&self) -> Option<&PendingSignal> {
        self.pending.as_ref()
    }

    /// Park `signal` until confirmation. Replaces any earlier pending signal.
    pub fn defer(&mut self, signal: SignalEvent, origin: PositionOrigin) {
        debug!(direction = ?signal.direction, at = %signal.timestamp, "entry deferred");
        self.pending = Some(PendingSignal {
            created_at: signal.timestamp,
            signal,
            origin,
            bars_remaining: self.timeout_bars,
        });
    }

    pub fn clear(&mut self) -> Option<PendingSignal> {
        self.pending.take()
    }

    fn reference_level(&self, pending: &PendingSignal, values: &IndicatorValues) -> Option<f64> {
        match self.reference {
            PullbackReference::SignalFastMa => Some(pending.signal.fast_value),
            PullbackReference::Ema { .. } => self.ema_key.as_deref().and_then(|k| values.get(k)),
        }
    }

    /// Evaluate one entry-timing bar already routed into `values`.
    pub fn on_bar(&mut self, bar: &Bar, values: &IndicatorValues) -> Option<TimingDecision> {
        let mut pending = self.pending.take()?;
        // bars stamped no later than the signal predate it
        if bar.timestamp <= pending.created_at {
            self.pending = Some(pending);
            return None;
        }

        let confirmed = self
            .reference_level(&pending, values)
            .map(|level| pulled_back(pending.signal.direction, bar, level))
            .unwrap_or(false);
        if confirmed {
            return Some(TimingDecision::Confirmed(pending));
        }

        pending.bars_remaining = pending.bars_remaining.saturating_sub(1);
        if pending.bars_remaining > 0 {
            self.pending = Some(pending);
            return None;
        }
        Some(match self.on_timeout {
            TimeoutPolicy::Execute => TimingDecision::TimedOutExecute(pending),
            TimeoutPolicy::Drop => TimingDecision::Dropped(pending),
        })
    }
}

/// Long: the bar reached down to `level` and closed up. Short: mirror.
fn pulled_back(direction: Side, bar: &Bar, level: f64) -> bool {
    match direction {
        Side::Long => bar.low <= level && bar.is_bullish(),
        Side::Short => bar.high >= level && bar.is_bearish(),
    }
}
