//! Dormant mode: a faster crossover path that only trades while the primary
//! timeframe has been quiet.
//!
//! The mode activates once no primary crossover has occurred for the
//! configured number of hours (counted from the first primary bar when no
//! crossover has happened yet) and deactivates on the next primary crossover.
//! While active, crossovers on the dormant timeframe are traded only when they
//! agree with the primary trend.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use crate::components::indicator::IndicatorValues;
use crate::components::signal::{CrossoverDetector, SignalEvent};
use crate::config::EngineConfig;
use crate::domain::{Bar, Side, Timeframe};

/// A dormant-timeframe crossover seen while the mode is active.
#[derive(Debug, Clone, PartialEq)]
pub enum DormantSignal {
    /// Agrees with the primary trend; goes on to the dormant filter chain.
    Aligned(SignalEvent),
    /// Disagrees with (or has no) primary trend; recorded as a rejection.
    Misaligned(SignalEvent),
}

/// Snapshot for reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DormantStatus {
    pub active: bool,
    pub activations: u32,
    pub last_primary_cross: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct DormantMode {
    timeframe: Timeframe,
    threshold: Duration,
    detector: CrossoverDetector,
    active: bool,
    activations: u32,
    last_primary_cross: Option<DateTime<Utc>>,
    primary_trend: Option<Side>,
}

impl DormantMode {
    /// `None` unless dormant mode is enabled with a timeframe.
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let d = &config.dormant;
        let timeframe = d.timeframe.filter(|_| d.enabled)?;
        let threshold_secs = (d.threshold_hours * 3600.0).round() as i64;
        Some(Self {
            timeframe,
            threshold: Duration::seconds(threshold_secs),
            detector: CrossoverDetector::new(d.ma_type, d.fast_period, d.slow_period, 1),
            active: false,
            activations: 0,
            last_primary_cross: None,
            primary_trend: None,
        })
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn primary_trend(&self) -> Option<Side> {
        self.primary_trend
    }

    pub fn status(&self) -> DormantStatus {
        DormantStatus {
            active: self.active,
            activations: self.activations,
            last_primary_cross: self.last_primary_cross,
        }
    }

    /// Observe a primary bar: its timestamp, the primary trend after it, and
    /// whether it carried a crossover.
    pub fn on_primary_bar(&mut self, timestamp: DateTime<Utc>, trend: Option<Side>, crossed: bool) {
        self.primary_trend = trend;
        if crossed {
            self.last_primary_cross = Some(timestamp);
            if self.active {
                self.active = false;
                info!(%timestamp, "dormant mode deactivated by primary crossover");
            }
            return;
        }
        if self.last_primary_cross.is_none() {
            self.last_primary_cross = Some(timestamp);
        }
        self.refresh(timestamp);
    }

    /// Observe a dormant-timeframe bar already routed into `values`.
    pub fn on_bar(&mut self, bar: &Bar, values: &IndicatorValues) -> Option<DormantSignal> {
        // the detector sees every bar so a cross right after activation is a real edge
        let signal = self.detector.on_bar(bar, values);
        self.refresh(bar.timestamp);
        if !self.active {
            return None;
        }
        let signal = signal?;
        if self.primary_trend == Some(signal.direction) {
            Some(DormantSignal::Aligned(signal))
        } else {
            Some(DormantSignal::Misaligned(signal))
        }
    }

    fn refresh(&mut self, now: DateTime<Utc>) {
        if self.active {
            return;
        }
        let Some(since) = self.last_primary_cross else {
            return;
        };
        if now - since >= self.threshold {
            self.active = true;
            self.activations += 1;
            info!(%now, quiet_since = %since, "dormant mode activated");
        }
    }
}
