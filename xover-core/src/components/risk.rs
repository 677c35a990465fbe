//! Stop / target / trailing distance sizing.
//!
//! The sizing mode is chosen once from configuration:
//! - fixed pip distances;
//! - volatility multiple: ATR x per-leg multiplier;
//! - percentile adaptive: ATR x multiplier x (1 + sensitivity x (rank - 0.5)),
//!   rank being the percentile of the current ATR within its rolling window.
//!
//! Regime multipliers apply next, then session multipliers, then the minimum
//! stop floor. Zero or unready ATR falls back to the fixed distances.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{
    AdjustmentMultipliers, AtrMultipliers, EngineConfig, FixedDistances, RiskMode, SessionConfig,
    SessionMultipliers, SessionWindow,
};
use crate::indicators::{atr_key, atr_rank_key};

/// Lower bound on the percentile scale factor; keeps every distance positive.
const MIN_PERCENTILE_FACTOR: f64 = 0.1;

/// How a set of levels was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSource {
    Fixed,
    Volatility,
    PercentileAdaptive,
    /// Volatility mode without a usable ATR.
    FixedFallback,
}

/// Distances in price units, all positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLevels {
    pub stop_distance: f64,
    pub target_distance: f64,
    pub trailing_activation: f64,
    pub trailing_distance: f64,
    pub source: RiskSource,
}

/// Market readings the calculator needs at signal time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RiskInputs {
    pub atr: Option<f64>,
    pub atr_rank: Option<f64>,
    /// UTC hour of the signal bar's close, for session windows.
    pub hour: u32,
}

#[derive(Debug, Clone)]
pub struct RiskCalculator {
    mode: RiskMode,
    fixed: FixedDistances,
    pip_size: f64,
    min_stop: f64,
    session: SessionConfig,
    atr_key: String,
    rank_key: Option<String>,
}

impl RiskCalculator {
    pub fn new(config: &EngineConfig) -> Self {
        let rank_key = match &config.risk.mode {
            RiskMode::PercentileAdaptive(p) => Some(atr_rank_key(config.risk.atr_period, p.window)),
            _ => None,
        };
        Self {
            mode: config.risk.mode.clone(),
            fixed: config.risk.fixed.clone(),
            pip_size: config.pip_size,
            min_stop: config.pips(config.risk.min_stop_pips),
            session: config.session.clone(),
            atr_key: atr_key(config.risk.atr_period),
            rank_key,
        }
    }

    /// Fixed-distance profile used by dormant-mode trades. No session adjustment.
    pub fn dormant(config: &EngineConfig) -> Self {
        Self {
            mode: RiskMode::Fixed,
            fixed: config.dormant.risk.clone(),
            pip_size: config.pip_size,
            min_stop: config.pips(config.risk.min_stop_pips),
            session: SessionConfig::default(),
            atr_key: atr_key(config.risk.atr_period),
            rank_key: None,
        }
    }

    pub fn atr_key(&self) -> &str {
        &self.atr_key
    }

    pub fn rank_key(&self) -> Option<&str> {
        self.rank_key.as_deref()
    }

    fn fixed_levels(&self, source: RiskSource) -> RiskLevels {
        RiskLevels {
            stop_distance: self.fixed.stop_pips * self.pip_size,
            target_distance: self.fixed.target_pips * self.pip_size,
            trailing_activation: self.fixed.trailing_activation_pips * self.pip_size,
            trailing_distance: self.fixed.trailing_distance_pips * self.pip_size,
            source,
        }
    }

    fn atr_levels(atr: f64, m: &AtrMultipliers, scale: f64, source: RiskSource) -> RiskLevels {
        RiskLevels {
            stop_distance: atr * m.stop * scale,
            target_distance: atr * m.target * scale,
            trailing_activation: atr * m.trailing_activation * scale,
            trailing_distance: atr * m.trailing_distance * scale,
            source,
        }
    }

    /// Distances before regime/session adjustment.
    pub fn base(&self, inputs: &RiskInputs) -> RiskLevels {
        let usable_atr = inputs.atr.filter(|a| a.is_finite() && *a > 0.0);
        match (&self.mode, usable_atr) {
            (RiskMode::Fixed, _) => self.fixed_levels(RiskSource::Fixed),
            (RiskMode::VolatilityMultiple(m), Some(atr)) => {
                Self::atr_levels(atr, m, 1.0, RiskSource::Volatility)
            }
            (RiskMode::PercentileAdaptive(p), Some(atr)) => {
                // unready rank: plain volatility multiple
                let scale = inputs
                    .atr_rank
                    .map(|rank| (1.0 + p.sensitivity * (rank - 0.5)).max(MIN_PERCENTILE_FACTOR))
                    .unwrap_or(1.0);
                Self::atr_levels(atr, &p.multipliers, scale, RiskSource::PercentileAdaptive)
            }
            (_, None) => {
                warn!(atr = ?inputs.atr, "volatility undefined, using fixed distances");
                self.fixed_levels(RiskSource::FixedFallback)
            }
        }
    }

    /// Final distances: base, then regime, then session, then the stop floor.
    pub fn compute(&self, inputs: &RiskInputs, regime: &AdjustmentMultipliers) -> RiskLevels {
        let mut levels = self.base(inputs);

        levels.target_distance *= regime.take_profit;
        levels.stop_distance *= regime.stop_loss;
        levels.trailing_activation *= regime.trailing_activation;
        levels.trailing_distance *= regime.trailing_distance;

        let session = session_multipliers(&self.session, inputs.hour);
        levels.target_distance *= session.take_profit;
        levels.stop_distance *= session.stop_loss;
        levels.trailing_activation *= session.trailing_activation;

        levels.stop_distance = levels.stop_distance.max(self.min_stop);
        levels
    }
}

fn window_contains(window: &SessionWindow, hour: u32) -> bool {
    if window.start_hour < window.end_hour {
        (window.start_hour..window.end_hour).contains(&hour)
    } else {
        hour >= window.start_hour || hour < window.end_hour
    }
}

/// Multipliers for `hour`: the first matching window, else "other hours".
pub fn session_multipliers(session: &SessionConfig, hour: u32) -> SessionMultipliers {
    if !session.enabled {
        return SessionMultipliers::default();
    }
    session
        .windows
        .iter()
        .find(|w| window_contains(w, hour))
        .map(|w| w.multipliers.clone())
        .unwrap_or_else(|| session.other_hours.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::regime::{multipliers, Regime};
    use crate::config::{PercentileAdaptiveConfig, RegimeConfig};

    const EPS: f64 = 1e-12;

    fn config_with(mode: RiskMode) -> EngineConfig {
        let mut c = EngineConfig::default();
        c.pip_size = 1.0;
        c.risk.mode = mode;
        c.risk.min_stop_pips = 0.0;
        c
    }

    fn neutral() -> AdjustmentMultipliers {
        AdjustmentMultipliers::default()
    }

    #[test]
    fn fixed_mode_uses_pips() {
        let calc = RiskCalculator::new(&config_with(RiskMode::Fixed));
        let levels = calc.compute(&RiskInputs::default(), &neutral());
        assert_eq!(levels.stop_distance, 25.0);
        assert_eq!(levels.target_distance, 50.0);
        assert_eq!(levels.trailing_activation, 20.0);
        assert_eq!(levels.trailing_distance, 15.0);
        assert_eq!(levels.source, RiskSource::Fixed);
    }

    #[test]
    fn volatility_multiple_scales_atr() {
        let calc = RiskCalculator::new(&config_with(RiskMode::VolatilityMultiple(
            AtrMultipliers::default(),
        )));
        let inputs = RiskInputs {
            atr: Some(2.0),
            ..RiskInputs::default()
        };
        let levels = calc.compute(&inputs, &neutral());
        assert!((levels.stop_distance - 3.0).abs() < EPS);
        assert!((levels.target_distance - 6.0).abs() < EPS);
        assert_eq!(levels.source, RiskSource::Volatility);
    }

    #[test]
    fn zero_atr_falls_back_to_fixed() {
        let calc = RiskCalculator::new(&config_with(RiskMode::VolatilityMultiple(
            AtrMultipliers::default(),
        )));
        for atr in [None, Some(0.0), Some(f64::NAN)] {
            let inputs = RiskInputs {
                atr,
                ..RiskInputs::default()
            };
            let levels = calc.compute(&inputs, &neutral());
            assert_eq!(levels.source, RiskSource::FixedFallback);
            assert_eq!(levels.stop_distance, 25.0);
        }
    }

    #[test]
    fn percentile_rank_widens_and_narrows() {
        let calc = RiskCalculator::new(&config_with(RiskMode::PercentileAdaptive(
            PercentileAdaptiveConfig::default(),
        )));
        let at = |rank| {
            calc.compute(
                &RiskInputs {
                    atr: Some(2.0),
                    atr_rank: Some(rank),
                    hour: 0,
                },
                &neutral(),
            )
        };
        // stop = 2 * 1.5 * (1 + (rank - 0.5))
        assert!((at(0.5).stop_distance - 3.0).abs() < EPS);
        assert!((at(1.0).stop_distance - 4.5).abs() < EPS);
        assert!((at(0.0).stop_distance - 1.5).abs() < EPS);
    }

    #[test]
    fn regime_then_session_then_floor() {
        let mut c = config_with(RiskMode::Fixed);
        c.risk.min_stop_pips = 30.0;
        c.session.enabled = true;
        c.session.windows.push(SessionWindow {
            name: "london".into(),
            start_hour: 7,
            end_hour: 16,
            multipliers: SessionMultipliers {
                take_profit: 2.0,
                stop_loss: 1.0,
                trailing_activation: 1.0,
            },
        });
        let calc = RiskCalculator::new(&c);
        let trending = multipliers(Regime::Trending, &RegimeConfig::default());
        let levels = calc.compute(
            &RiskInputs {
                hour: 9,
                ..RiskInputs::default()
            },
            &trending,
        );
        // 50 * 1.5 (trending) * 2.0 (london)
        assert!((levels.target_distance - 150.0).abs() < EPS);
        // 25 raised to the 30 floor
        assert_eq!(levels.stop_distance, 30.0);
        // 20 * 1.2 (trending)
        assert!((levels.trailing_activation - 24.0).abs() < EPS);
    }

    #[test]
    fn session_windows_wrap_midnight() {
        let session = SessionConfig {
            enabled: true,
            windows: vec![SessionWindow {
                name: "asia".into(),
                start_hour: 22,
                end_hour: 6,
                multipliers: SessionMultipliers {
                    take_profit: 0.5,
                    ..SessionMultipliers::default()
                },
            }],
            other_hours: SessionMultipliers {
                take_profit: 1.1,
                ..SessionMultipliers::default()
            },
        };
        assert_eq!(session_multipliers(&session, 23).take_profit, 0.5);
        assert_eq!(session_multipliers(&session, 3).take_profit, 0.5);
        assert_eq!(session_multipliers(&session, 12).take_profit, 1.1);
    }

    #[test]
    fn dormant_profile_ignores_sessions() {
        let mut c = config_with(RiskMode::VolatilityMultiple(AtrMultipliers::default()));
        c.session.enabled = true;
        c.session.other_hours.take_profit = 3.0;
        let calc = RiskCalculator::dormant(&c);
        let levels = calc.compute(&RiskInputs::default(), &neutral());
        assert_eq!(levels.stop_distance, 10.0);
        assert_eq!(levels.target_distance, 20.0);
    }
}
