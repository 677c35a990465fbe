//! Shared helpers for integration tests: bar builders, scenario configs, and a
//! driver that records every command the engine emits.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use xover_core::config::{FixedDistances, MaType, RiskMode};
use xover_core::domain::{Bar, BracketRequest, OrderCommand, Timeframe};
use xover_core::execution::OrderExecutor;
use xover_core::{EngineConfig, StrategyEngine};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
}

pub fn m15() -> Timeframe {
    Timeframe::minutes(15)
}

pub fn m5() -> Timeframe {
    Timeframe::minutes(5)
}

/// pip 1.0, SMA 10/20 on 15-MINUTE, fixed stop 30 / target 1000 /
/// activation 20 / distance 10, every filter off.
pub fn scenario_config() -> EngineConfig {
    let mut c = EngineConfig::default();
    c.instrument = "TEST".into();
    c.pip_size = 1.0;
    c.trade_size = 1.0;
    c.primary_timeframe = m15();
    c.signal.ma_type = MaType::Sma;
    c.signal.fast_period = 10;
    c.signal.slow_period = 20;
    c.risk.mode = RiskMode::Fixed;
    c.risk.fixed = FixedDistances {
        stop_pips: 30.0,
        target_pips: 1000.0,
        trailing_activation_pips: 20.0,
        trailing_distance_pips: 10.0,
    };
    c
}

/// One bar per close, `timeframe` apart, the first closing at `first`.
/// Each bar opens at the previous close; the range is the body.
pub fn bars_from_closes(timeframe: Timeframe, first: DateTime<Utc>, closes: &[f64]) -> Vec<Bar> {
    let mut prev = closes.first().copied().unwrap_or_default();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            Bar {
                timeframe,
                timestamp: first + timeframe.duration() * i as i32,
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

pub fn primary_bars(closes: &[f64]) -> Vec<Bar> {
    bars_from_closes(m15(), start() + m15().duration(), closes)
}

/// 200 closes: a 0.5/bar drift into bar 100, a 400-point jump against it on
/// bar 100, then a 0.5/bar drift in the new direction. Fast 10 / slow 20
/// cross once, at bar 100, with a separation of 20.
pub fn single_cross(bullish: bool) -> Vec<f64> {
    let sign = if bullish { 1.0 } else { -1.0 };
    (0..200)
        .map(|i| {
            if i < 100 {
                1000.0 - sign * 0.5 * i as f64
            } else {
                1000.0 + sign * (400.0 + 0.5 * (i - 100) as f64)
            }
        })
        .collect()
}

/// Flat segments alternating 1000 / 1100, switching at bars 40, 70, 100, 130, 160.
pub fn alternating_crosses() -> Vec<f64> {
    (0..200)
        .map(|i| {
            let segment = if i < 40 { 0 } else { (1 + (i - 40) / 30).min(5) };
            if segment % 2 == 0 {
                1000.0
            } else {
                1100.0
            }
        })
        .collect()
}

/// Bullish cross into 1400 at bar 100, +1/bar to 1440 at bar 140, then -5/bar.
pub fn trailing_path() -> Vec<f64> {
    (0..200)
        .map(|i| match i {
            i if i < 100 => 1000.0 - 0.5 * i as f64,
            i if i <= 140 => 1400.0 + (i - 100) as f64,
            i => 1440.0 - 5.0 * (i - 140) as f64,
        })
        .collect()
}

/// Run `bars` through engine and venue the way the replay harness does,
/// recording each command with the timestamp of the bar that produced it.
/// With `duplicate_events` every venue report is delivered twice.
pub fn drive<E: OrderExecutor>(
    engine: &mut StrategyEngine,
    venue: &mut E,
    bars: &[Bar],
    duplicate_events: bool,
) -> Vec<(DateTime<Utc>, OrderCommand)> {
    let deliveries = if duplicate_events { 2 } else { 1 };
    let mut commands = Vec::new();
    for bar in bars {
        for event in venue.on_bar(bar) {
            for _ in 0..deliveries {
                engine.on_execution_event(&event);
            }
        }
        for command in engine.on_bar(bar) {
            for event in venue.execute(&command) {
                for _ in 0..deliveries {
                    engine.on_execution_event(&event);
                }
            }
            commands.push((bar.timestamp, command));
        }
    }
    commands
}

pub fn brackets(commands: &[(DateTime<Utc>, OrderCommand)]) -> Vec<(DateTime<Utc>, &BracketRequest)> {
    commands
        .iter()
        .filter_map(|(ts, c)| match c {
            OrderCommand::SubmitBracket(req) => Some((*ts, req)),
            _ => None,
        })
        .collect()
}

pub fn stop_moves(commands: &[(DateTime<Utc>, OrderCommand)]) -> Vec<f64> {
    commands
        .iter()
        .filter_map(|(_, c)| match c {
            OrderCommand::ModifyStop { trigger_price, .. } => Some(*trigger_price),
            _ => None,
        })
        .collect()
}
