//! Market regime classification from ADX.
//!
//! ADX above the trending threshold is a trending market, below the ranging
//! threshold a ranging one, anything in between is moderate. Moderate applies
//! no adjustment: every multiplier is 1.0.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{AdjustmentMultipliers, RegimeConfig};
use crate::domain::Timeframe;
use crate::indicators::adx_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Trending,
    Ranging,
    Moderate,
}

/// Pure classification of one ADX reading.
pub fn classify(adx: f64, trending_threshold: f64, ranging_threshold: f64) -> Regime {
    if adx > trending_threshold {
        Regime::Trending
    } else if adx < ranging_threshold {
        Regime::Ranging
    } else {
        Regime::Moderate
    }
}

/// Multipliers for `regime`; moderate always yields the neutral set.
pub fn multipliers(regime: Regime, config: &RegimeConfig) -> AdjustmentMultipliers {
    match regime {
        Regime::Trending => config.trending.clone(),
        Regime::Ranging => config.ranging.clone(),
        Regime::Moderate => AdjustmentMultipliers::default(),
    }
}

/// Regime tracker fed from the regime timeframe's ADX.
#[derive(Debug, Clone)]
pub struct RegimeState {
    config: RegimeConfig,
    timeframe: Timeframe,
    key: String,
    regime: Regime,
    last_adx: Option<f64>,
}

impl RegimeState {
    pub fn new(config: &RegimeConfig, timeframe: Timeframe) -> Self {
        Self {
            config: config.clone(),
            timeframe,
            key: adx_key(config.adx_period),
            regime: Regime::Moderate,
            last_adx: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn adx_key(&self) -> &str {
        &self.key
    }

    /// Recompute from the latest ADX. Unready ADX keeps the previous regime.
    pub fn update(&mut self, adx: Option<f64>) -> Regime {
        if !self.config.enabled {
            return self.regime;
        }
        let Some(adx) = adx else {
            return self.regime;
        };
        let next = classify(
            adx,
            self.config.trending_threshold,
            self.config.ranging_threshold,
        );
        if next != self.regime {
            info!(from = ?self.regime, to = ?next, adx, "regime change");
        }
        self.regime = next;
        self.last_adx = Some(adx);
        self.regime
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    pub fn last_adx(&self) -> Option<f64> {
        self.last_adx
    }

    /// Multipliers for the current regime; neutral when regime detection is off.
    pub fn adjustments(&self) -> AdjustmentMultipliers {
        if !self.config.enabled {
            return AdjustmentMultipliers::default();
        }
        multipliers(self.regime, &self.config)
    }
}
