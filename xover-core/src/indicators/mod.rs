//! Streaming indicator implementations.
//!
//! Every indicator implements the `Indicator` trait from `components::indicator`
//! and is fed one bar at a time by the `IndicatorSet` of its timeframe.
//! Series are addressed by name; the helpers below build those names so that
//! producers and consumers never disagree on a key.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod percentile;
pub mod rsi;
pub mod set;
pub mod sma;
pub mod stochastic;
pub mod volume;

pub use adx::Adx;
pub use atr::Atr;
pub use ema::Ema;
pub use percentile::AtrPercentile;
pub use rsi::Rsi;
pub use set::IndicatorSet;
pub use sma::Sma;
pub use stochastic::Stochastic;
pub use volume::VolumeAverage;

use crate::components::indicator::Indicator;
use crate::config::MaType;

/// Build a moving average of the requested flavour.
pub fn moving_average(ma_type: MaType, period: usize) -> Box<dyn Indicator> {
    match ma_type {
        MaType::Sma => Box::new(Sma::new(period)),
        MaType::Ema => Box::new(Ema::new(period)),
    }
}

pub fn ma_key(ma_type: MaType, period: usize) -> String {
    format!("{}_{period}", ma_type.prefix())
}

pub fn atr_key(period: usize) -> String {
    format!("atr_{period}")
}

pub fn adx_key(period: usize) -> String {
    format!("adx_{period}")
}

pub fn plus_di_key(period: usize) -> String {
    format!("plus_di_{period}")
}

pub fn minus_di_key(period: usize) -> String {
    format!("minus_di_{period}")
}

pub fn rsi_key(period: usize) -> String {
    format!("rsi_{period}")
}

pub fn volume_avg_key(period: usize) -> String {
    format!("volume_avg_{period}")
}

pub fn atr_rank_key(atr_period: usize, window: usize) -> String {
    format!("atr_pctrank_{atr_period}_{window}")
}

/// Keys of a stochastic oscillator's series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StochasticKeys {
    pub k: String,
    pub d: String,
    pub bull_age: String,
    pub bear_age: String,
}

pub fn stochastic_keys(k_period: usize, d_period: usize) -> StochasticKeys {
    let suffix = format!("{k_period}_{d_period}");
    StochasticKeys {
        k: format!("stoch_k_{suffix}"),
        d: format!("stoch_d_{suffix}"),
        bull_age: format!("stoch_bull_age_{suffix}"),
        bear_age: format!("stoch_bear_age_{suffix}"),
    }
}

/// Create synthetic 1-minute bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    let ohlc: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_bars(&ohlc)
}

/// Create synthetic 1-minute bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use crate::domain::{Bar, Timeframe};
    use chrono::TimeZone;
    let start = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 1, 0).unwrap();
    ohlc.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timeframe: Timeframe::minutes(1),
            timestamp: start + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Feed every bar into `indicator` and collect the series named `key` after each one.
#[cfg(test)]
pub fn feed(
    indicator: &mut impl Indicator,
    bars: &[crate::domain::Bar],
    key: &str,
) -> Vec<Option<f64>> {
    let mut values = crate::components::indicator::IndicatorValues::new();
    bars.iter()
        .map(|bar| {
            indicator.update(bar, &mut values);
            values.get(key)
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_indicator_names() {
        assert_eq!(ma_key(MaType::Ema, 10), Ema::new(10).name());
        assert_eq!(ma_key(MaType::Sma, 20), Sma::new(20).name());
        assert_eq!(atr_key(14), Atr::new(14).name());
        assert_eq!(adx_key(14), Adx::new(14).name());
        assert_eq!(rsi_key(7), Rsi::new(7).name());
        assert_eq!(volume_avg_key(20), VolumeAverage::new(20).name());
        assert_eq!(atr_rank_key(14, 100), AtrPercentile::new(14, 100).name());
        assert_eq!(stochastic_keys(14, 3).k, Stochastic::new(14, 3).name());
    }

    #[test]
    fn moving_average_factory_picks_flavour() {
        assert_eq!(moving_average(MaType::Sma, 5).name(), "sma_5");
        assert_eq!(moving_average(MaType::Ema, 5).name(), "ema_5");
    }
}
