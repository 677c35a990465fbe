//! Engine configuration: every parameter the decision engine reads.
//!
//! Loaded from TOML. Every section carries `#[serde(default)]` and every
//! filter defaults to disabled, so turning a feature on is always explicit.
//! `validate()` runs before an engine can be built; a config that passes it
//! cannot misclassify at runtime.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::domain::Timeframe;

/// Configuration errors, all raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field} must be > 0 (got {value})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be >= 1")]
    ZeroPeriod { field: &'static str },
    #[error("slow period ({slow}) must be greater than fast period ({fast}) in {section}")]
    InvalidPeriods {
        section: &'static str,
        fast: usize,
        slow: usize,
    },
    #[error("trending threshold ({trending}) must be greater than ranging threshold ({ranging})")]
    InvalidRegimeThresholds { trending: f64, ranging: f64 },
    #[error("hour {hour} out of range 0-23 in {section}")]
    InvalidHour { section: &'static str, hour: u32 },
    #[error("unknown weekday '{0}' in excluded hours")]
    UnknownWeekday(String),
    #[error("{section} requires a timeframe when enabled")]
    MissingTimeframe { section: &'static str },
    #[error("{section} timeframe {timeframe} must be faster than primary {primary}")]
    TimeframeNotFaster {
        section: &'static str,
        timeframe: Timeframe,
        primary: Timeframe,
    },
    #[error("RSI bounds invalid: oversold ({oversold}) must be below overbought ({overbought})")]
    InvalidRsiBounds { oversold: f64, overbought: f64 },
    #[error("stochastic thresholds must lie within 0-100 (bullish {bullish}, bearish {bearish})")]
    InvalidStochasticThresholds { bullish: f64, bearish: f64 },
    #[error("session window '{0}' has identical start and end hour")]
    EmptySessionWindow(String),
    #[error("{field} must be >= 0 (got {value})")]
    Negative { field: &'static str, value: f64 },
}

/// Moving average flavour used for crossover lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaType {
    Sma,
    Ema,
}

impl MaType {
    pub fn prefix(&self) -> &'static str {
        match self {
            MaType::Sma => "sma",
            MaType::Ema => "ema",
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub instrument: String,
    /// Price distance of one pip. All `*_pips` parameters are multiplied by it.
    pub pip_size: f64,
    pub trade_size: f64,
    pub primary_timeframe: Timeframe,
    pub signal: SignalConfig,
    pub filters: FilterConfig,
    pub regime: RegimeConfig,
    pub risk: RiskConfig,
    pub session: SessionConfig,
    pub trailing: TrailingConfig,
    pub duration_trailing: DurationTrailingConfig,
    pub min_hold: MinHoldConfig,
    pub entry_timing: EntryTimingConfig,
    pub dormant: DormantConfig,
    pub position: PositionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrument: "EUR/USD".into(),
            pip_size: 0.0001,
            trade_size: 100_000.0,
            primary_timeframe: Timeframe::minutes(15),
            signal: SignalConfig::default(),
            filters: FilterConfig::default(),
            regime: RegimeConfig::default(),
            risk: RiskConfig::default(),
            session: SessionConfig::default(),
            trailing: TrailingConfig::default(),
            duration_trailing: DurationTrailingConfig::default(),
            min_hold: MinHoldConfig::default(),
            entry_timing: EntryTimingConfig::default(),
            dormant: DormantConfig::default(),
            position: PositionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub ma_type: MaType,
    pub fast_period: usize,
    pub slow_period: usize,
    /// Separation the crossover bar must exceed. Zero accepts any strict cross.
    pub crossover_threshold_pips: f64,
    pub pre_separation: PreSeparationConfig,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            ma_type: MaType::Sma,
            fast_period: 10,
            slow_period: 20,
            crossover_threshold_pips: 0.0,
            pre_separation: PreSeparationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreSeparationConfig {
    pub enabled: bool,
    pub min_pips: f64,
    pub lookback_bars: usize,
}

impl Default for PreSeparationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_pips: 2.0,
            lookback_bars: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub time: TimeFilterConfig,
    pub dmi: DmiFilterConfig,
    pub stochastic: StochasticFilterConfig,
    pub rsi: RsiFilterConfig,
    pub volume: VolumeFilterConfig,
    pub atr: AtrFilterConfig,
    pub higher_timeframe: HigherTimeframeConfig,
}

/// Excluded trading hours (UTC), either one list for every day or one per weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExcludedHours {
    Flat(Vec<u32>),
    PerWeekday(BTreeMap<String, Vec<u32>>),
}

impl Default for ExcludedHours {
    fn default() -> Self {
        ExcludedHours::Flat(Vec::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeFilterConfig {
    pub enabled: bool,
    pub excluded_hours: ExcludedHours,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmiFilterConfig {
    pub enabled: bool,
    pub timeframe: Option<Timeframe>,
    pub period: usize,
    /// When set, ADX must also reach this value.
    pub min_adx: Option<f64>,
}

impl Default for DmiFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeframe: None,
            period: 14,
            min_adx: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticFilterConfig {
    pub enabled: bool,
    pub timeframe: Option<Timeframe>,
    pub k_period: usize,
    pub d_period: usize,
    /// Longs need %K above this level.
    pub bullish_threshold: f64,
    /// Shorts need %K below this level.
    pub bearish_threshold: f64,
    /// The %K/%D cross in the signal direction must be at most this many bars old.
    pub max_bars_since_cross: usize,
}

impl Default for StochasticFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeframe: None,
            k_period: 14,
            d_period: 3,
            bullish_threshold: 30.0,
            bearish_threshold: 70.0,
            max_bars_since_cross: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiFilterConfig {
    pub enabled: bool,
    pub timeframe: Option<Timeframe>,
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for RsiFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeframe: None,
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeFilterConfig {
    pub enabled: bool,
    pub period: usize,
    /// Current volume must be at least `min_ratio` x its rolling average.
    pub min_ratio: f64,
}

impl Default for VolumeFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            period: 20,
            min_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrFilterConfig {
    pub enabled: bool,
    pub period: usize,
    pub min_atr_pips: f64,
}

impl Default for AtrFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            period: 14,
            min_atr_pips: 3.0,
        }
    }
}

/// How the higher-timeframe trend is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HtfMode {
    /// Close above the moving average is an uptrend.
    Ma,
    /// Close must sit at least `min_distance_pips` beyond the EMA.
    EmaDistance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HigherTimeframeConfig {
    pub enabled: bool,
    pub timeframe: Option<Timeframe>,
    pub mode: HtfMode,
    pub ma_type: MaType,
    pub period: usize,
    pub min_distance_pips: f64,
}

impl Default for HigherTimeframeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeframe: None,
            mode: HtfMode::Ma,
            ma_type: MaType::Sma,
            period: 50,
            min_distance_pips: 0.0,
        }
    }
}

impl HigherTimeframeConfig {
    /// `ema_distance` always reads an EMA; `ma` reads the configured flavour.
    pub fn effective_ma_type(&self) -> MaType {
        match self.mode {
            HtfMode::Ma => self.ma_type,
            HtfMode::EmaDistance => MaType::Ema,
        }
    }
}

/// Multipliers applied in a given regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentMultipliers {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub trailing_activation: f64,
    pub trailing_distance: f64,
}

impl Default for AdjustmentMultipliers {
    fn default() -> Self {
        Self {
            take_profit: 1.0,
            stop_loss: 1.0,
            trailing_activation: 1.0,
            trailing_distance: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub enabled: bool,
    pub timeframe: Option<Timeframe>,
    pub adx_period: usize,
    pub trending_threshold: f64,
    pub ranging_threshold: f64,
    pub trending: AdjustmentMultipliers,
    pub ranging: AdjustmentMultipliers,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeframe: None,
            adx_period: 14,
            trending_threshold: 25.0,
            ranging_threshold: 20.0,
            trending: AdjustmentMultipliers {
                take_profit: 1.5,
                trailing_activation: 1.2,
                ..AdjustmentMultipliers::default()
            },
            ranging: AdjustmentMultipliers {
                take_profit: 0.8,
                trailing_activation: 0.8,
                ..AdjustmentMultipliers::default()
            },
        }
    }
}

/// Fixed distances in pips. Also the fallback when volatility is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedDistances {
    pub stop_pips: f64,
    pub target_pips: f64,
    pub trailing_activation_pips: f64,
    pub trailing_distance_pips: f64,
}

impl Default for FixedDistances {
    fn default() -> Self {
        Self {
            stop_pips: 25.0,
            target_pips: 50.0,
            trailing_activation_pips: 20.0,
            trailing_distance_pips: 15.0,
        }
    }
}

/// ATR multipliers for the volatility-based modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrMultipliers {
    pub stop: f64,
    pub target: f64,
    pub trailing_activation: f64,
    pub trailing_distance: f64,
}

impl Default for AtrMultipliers {
    fn default() -> Self {
        Self {
            stop: 1.5,
            target: 3.0,
            trailing_activation: 1.0,
            trailing_distance: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentileAdaptiveConfig {
    /// Number of ATR readings in the ranking window.
    pub window: usize,
    /// Scales how far the percentile rank moves the multiplier away from base.
    pub sensitivity: f64,
    pub multipliers: AtrMultipliers,
}

impl Default for PercentileAdaptiveConfig {
    fn default() -> Self {
        Self {
            window: 100,
            sensitivity: 1.0,
            multipliers: AtrMultipliers::default(),
        }
    }
}

/// Stop/target sizing mode, selected once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskMode {
    Fixed,
    VolatilityMultiple(AtrMultipliers),
    PercentileAdaptive(PercentileAdaptiveConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub mode: RiskMode,
    pub atr_period: usize,
    pub fixed: FixedDistances,
    /// Floor applied to the stop distance after every multiplier.
    pub min_stop_pips: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            mode: RiskMode::Fixed,
            atr_period: 14,
            fixed: FixedDistances::default(),
            min_stop_pips: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMultipliers {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub trailing_activation: f64,
}

impl Default for SessionMultipliers {
    fn default() -> Self {
        Self {
            take_profit: 1.0,
            stop_loss: 1.0,
            trailing_activation: 1.0,
        }
    }
}

/// Named UTC hour window `[start_hour, end_hour)`; wraps past midnight when start > end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub name: String,
    pub start_hour: u32,
    pub end_hour: u32,
    #[serde(default)]
    pub multipliers: SessionMultipliers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub enabled: bool,
    pub windows: Vec<SessionWindow>,
    pub other_hours: SessionMultipliers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationTrailingConfig {
    pub enabled: bool,
    pub threshold_minutes: i64,
    pub trailing_distance_pips: f64,
    pub cancel_take_profit: bool,
}

impl Default for DurationTrailingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_minutes: 240,
            trailing_distance_pips: 30.0,
            cancel_take_profit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinHoldConfig {
    pub enabled: bool,
    pub duration_minutes: i64,
    pub stop_multiplier: f64,
}

impl Default for MinHoldConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_minutes: 60,
            stop_multiplier: 1.5,
        }
    }
}

/// Level a deferred entry waits for price to revisit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PullbackReference {
    /// Primary fast MA value at the signal bar.
    SignalFastMa,
    /// Live EMA on the entry-timing timeframe.
    Ema { period: usize },
}

/// What to do when a pending entry never sees its pullback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    Execute,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryTimingConfig {
    pub enabled: bool,
    pub timeframe: Option<Timeframe>,
    pub reference: PullbackReference,
    pub timeout_bars: usize,
    pub on_timeout: TimeoutPolicy,
}

impl Default for EntryTimingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeframe: None,
            reference: PullbackReference::SignalFastMa,
            timeout_bars: 10,
            on_timeout: TimeoutPolicy::Execute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DormantConfig {
    pub enabled: bool,
    pub timeframe: Option<Timeframe>,
    pub threshold_hours: f64,
    pub ma_type: MaType,
    pub fast_period: usize,
    pub slow_period: usize,
    pub crossover_threshold_pips: f64,
    pub risk: FixedDistances,
}

impl Default for DormantConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeframe: None,
            threshold_hours: 14.0,
            ma_type: MaType::Ema,
            fast_period: 5,
            slow_period: 10,
            crossover_threshold_pips: 0.0,
            risk: FixedDistances {
                stop_pips: 10.0,
                target_pips: 20.0,
                trailing_activation_pips: 8.0,
                trailing_distance_pips: 5.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// An opposite signal closes the open position and opens the new side.
    /// When false, signals are rejected until the open position closes.
    pub allow_reversal: bool,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            allow_reversal: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Convert a pip count into a price distance.
    pub fn pips(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }

    pub fn dmi_timeframe(&self) -> Timeframe {
        self.filters.dmi.timeframe.unwrap_or(self.primary_timeframe)
    }

    pub fn stochastic_timeframe(&self) -> Timeframe {
        self.filters
            .stochastic
            .timeframe
            .unwrap_or(self.primary_timeframe)
    }

    pub fn rsi_timeframe(&self) -> Timeframe {
        self.filters.rsi.timeframe.unwrap_or(self.primary_timeframe)
    }

    pub fn regime_timeframe(&self) -> Timeframe {
        self.regime.timeframe.unwrap_or(self.primary_timeframe)
    }

    /// Deterministic identity of this configuration (BLAKE3 of canonical JSON).
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }

    /// Fail fast on any configuration the engine could misinterpret.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("pip_size", self.pip_size)?;
        positive("trade_size", self.trade_size)?;

        period("signal.fast_period", self.signal.fast_period)?;
        if self.signal.slow_period <= self.signal.fast_period {
            return Err(ConfigError::InvalidPeriods {
                section: "signal",
                fast: self.signal.fast_period,
                slow: self.signal.slow_period,
            });
        }
        non_negative(
            "signal.crossover_threshold_pips",
            self.signal.crossover_threshold_pips,
        )?;
        if self.signal.pre_separation.enabled {
            period(
                "signal.pre_separation.lookback_bars",
                self.signal.pre_separation.lookback_bars,
            )?;
            non_negative(
                "signal.pre_separation.min_pips",
                self.signal.pre_separation.min_pips,
            )?;
        }

        self.validate_filters()?;
        self.validate_regime()?;
        self.validate_risk()?;
        self.validate_session()?;
        self.validate_lifecycle()?;
        self.validate_secondary()?;
        Ok(())
    }

    fn validate_filters(&self) -> Result<(), ConfigError> {
        let f = &self.filters;
        if f.time.enabled {
            match &f.time.excluded_hours {
                ExcludedHours::Flat(hours) => check_hours("filters.time", hours)?,
                ExcludedHours::PerWeekday(map) => {
                    for (day, hours) in map {
                        day.parse::<Weekday>()
                            .map_err(|_| ConfigError::UnknownWeekday(day.clone()))?;
                        check_hours("filters.time", hours)?;
                    }
                }
            }
        }
        if f.dmi.enabled {
            period("filters.dmi.period", f.dmi.period)?;
            if let Some(min_adx) = f.dmi.min_adx {
                non_negative("filters.dmi.min_adx", min_adx)?;
            }
        }
        if f.stochastic.enabled {
            period("filters.stochastic.k_period", f.stochastic.k_period)?;
            period("filters.stochastic.d_period", f.stochastic.d_period)?;
            let in_range = |v: f64| (0.0..=100.0).contains(&v);
            if !in_range(f.stochastic.bullish_threshold) || !in_range(f.stochastic.bearish_threshold)
            {
                return Err(ConfigError::InvalidStochasticThresholds {
                    bullish: f.stochastic.bullish_threshold,
                    bearish: f.stochastic.bearish_threshold,
                });
            }
        }
        if f.rsi.enabled {
            period("filters.rsi.period", f.rsi.period)?;
            if f.rsi.oversold >= f.rsi.overbought {
                return Err(ConfigError::InvalidRsiBounds {
                    oversold: f.rsi.oversold,
                    overbought: f.rsi.overbought,
                });
            }
        }
        if f.volume.enabled {
            period("filters.volume.period", f.volume.period)?;
            non_negative("filters.volume.min_ratio", f.volume.min_ratio)?;
        }
        if f.atr.enabled {
            period("filters.atr.period", f.atr.period)?;
            non_negative("filters.atr.min_atr_pips", f.atr.min_atr_pips)?;
        }
        if f.higher_timeframe.enabled {
            if f.higher_timeframe.timeframe.is_none() {
                return Err(ConfigError::MissingTimeframe {
                    section: "filters.higher_timeframe",
                });
            }
            period("filters.higher_timeframe.period", f.higher_timeframe.period)?;
            non_negative(
                "filters.higher_timeframe.min_distance_pips",
                f.higher_timeframe.min_distance_pips,
            )?;
        }
        Ok(())
    }

    fn validate_regime(&self) -> Result<(), ConfigError> {
        if !self.regime.enabled {
            return Ok(());
        }
        period("regime.adx_period", self.regime.adx_period)?;
        if self.regime.trending_threshold <= self.regime.ranging_threshold {
            return Err(ConfigError::InvalidRegimeThresholds {
                trending: self.regime.trending_threshold,
                ranging: self.regime.ranging_threshold,
            });
        }
        for m in [&self.regime.trending, &self.regime.ranging] {
            positive("regime.take_profit multiplier", m.take_profit)?;
            positive("regime.stop_loss multiplier", m.stop_loss)?;
            positive("regime.trailing_activation multiplier", m.trailing_activation)?;
            positive("regime.trailing_distance multiplier", m.trailing_distance)?;
        }
        Ok(())
    }

    fn validate_risk(&self) -> Result<(), ConfigError> {
        let r = &self.risk;
        period("risk.atr_period", r.atr_period)?;
        check_fixed(&r.fixed)?;
        non_negative("risk.min_stop_pips", r.min_stop_pips)?;
        match &r.mode {
            RiskMode::Fixed => {}
            RiskMode::VolatilityMultiple(m) => check_multipliers(m)?,
            RiskMode::PercentileAdaptive(p) => {
                period("risk.mode.window", p.window)?;
                non_negative("risk.mode.sensitivity", p.sensitivity)?;
                check_multipliers(&p.multipliers)?;
            }
        }
        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        if !self.session.enabled {
            return Ok(());
        }
        for w in &self.session.windows {
            check_hours("session", &[w.start_hour])?;
            if w.end_hour > 24 {
                return Err(ConfigError::InvalidHour {
                    section: "session",
                    hour: w.end_hour,
                });
            }
            if w.start_hour == w.end_hour % 24 {
                return Err(ConfigError::EmptySessionWindow(w.name.clone()));
            }
            positive("session.take_profit multiplier", w.multipliers.take_profit)?;
            positive("session.stop_loss multiplier", w.multipliers.stop_loss)?;
            positive(
                "session.trailing_activation multiplier",
                w.multipliers.trailing_activation,
            )?;
        }
        Ok(())
    }

    fn validate_lifecycle(&self) -> Result<(), ConfigError> {
        if self.duration_trailing.enabled {
            positive(
                "duration_trailing.threshold_minutes",
                self.duration_trailing.threshold_minutes as f64,
            )?;
            positive(
                "duration_trailing.trailing_distance_pips",
                self.duration_trailing.trailing_distance_pips,
            )?;
        }
        if self.min_hold.enabled {
            positive(
                "min_hold.duration_minutes",
                self.min_hold.duration_minutes as f64,
            )?;
            positive("min_hold.stop_multiplier", self.min_hold.stop_multiplier)?;
        }
        Ok(())
    }

    fn validate_secondary(&self) -> Result<(), ConfigError> {
        let et = &self.entry_timing;
        if et.enabled {
            let tf = et.timeframe.ok_or(ConfigError::MissingTimeframe {
                section: "entry_timing",
            })?;
            if tf.duration() >= self.primary_timeframe.duration() {
                return Err(ConfigError::TimeframeNotFaster {
                    section: "entry_timing",
                    timeframe: tf,
                    primary: self.primary_timeframe,
                });
            }
            period("entry_timing.timeout_bars", et.timeout_bars)?;
            if let PullbackReference::Ema { period: p } = et.reference {
                period("entry_timing.reference.period", p)?;
            }
        }

        let d = &self.dormant;
        if d.enabled {
            let tf = d.timeframe.ok_or(ConfigError::MissingTimeframe {
                section: "dormant",
            })?;
            if tf.duration() >= self.primary_timeframe.duration() {
                return Err(ConfigError::TimeframeNotFaster {
                    section: "dormant",
                    timeframe: tf,
                    primary: self.primary_timeframe,
                });
            }
            positive("dormant.threshold_hours", d.threshold_hours)?;
            period("dormant.fast_period", d.fast_period)?;
            if d.slow_period <= d.fast_period {
                return Err(ConfigError::InvalidPeriods {
                    section: "dormant",
                    fast: d.fast_period,
                    slow: d.slow_period,
                });
            }
            non_negative("dormant.crossover_threshold_pips", d.crossover_threshold_pips)?;
            check_fixed(&d.risk)?;
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn period(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(ConfigError::ZeroPeriod { field })
    }
}

fn check_hours(section: &'static str, hours: &[u32]) -> Result<(), ConfigError> {
    match hours.iter().find(|&&h| h > 23) {
        Some(&hour) => Err(ConfigError::InvalidHour { section, hour }),
        None => Ok(()),
    }
}

fn check_fixed(fixed: &FixedDistances) -> Result<(), ConfigError> {
    positive("stop_pips", fixed.stop_pips)?;
    positive("target_pips", fixed.target_pips)?;
    non_negative("trailing_activation_pips", fixed.trailing_activation_pips)?;
    positive("trailing_distance_pips", fixed.trailing_distance_pips)?;
    Ok(())
}

fn check_multipliers(m: &AtrMultipliers) -> Result<(), ConfigError> {
    positive("risk.mode.stop", m.stop)?;
    positive("risk.mode.target", m.target)?;
    non_negative("risk.mode.trailing_activation", m.trailing_activation)?;
    positive("risk.mode.trailing_distance", m.trailing_distance)?;
    Ok(())
}
