//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Ratchet monotonicity: stops may only tighten, never loosen
//! 2. Trailing stop moves from the lifecycle manager are strictly tightening
//! 3. Regime classification is pure and moderate is neutral
//! 4. Parallel moving averages never signal
//! 5. A single crossing emits exactly one signal
//! 6. The minimum-hold stop narrows exactly once

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use xover_core::components::regime::{classify, multipliers, Regime};
use xover_core::components::{RiskLevels, RiskSource};
use xover_core::config::{AdjustmentMultipliers, RegimeConfig};
use xover_core::domain::{
    Bar, ExecutionEvent, OrderCommand, OrderId, PositionOrigin, Side, Timeframe,
};
use xover_core::execution::SimulatedVenue;
use xover_core::lifecycle::{LifecycleManager, RatchetState};
use xover_core::StrategyEngine;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_stop_price() -> impl Strategy<Value = f64> {
    (50.0..200.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Long), Just(Side::Short)]
}

fn arb_multipliers() -> impl Strategy<Value = AdjustmentMultipliers> {
    (0.1..3.0_f64, 0.1..3.0_f64, 0.1..3.0_f64, 0.1..3.0_f64).prop_map(|(tp, sl, ta, td)| {
        AdjustmentMultipliers {
            take_profit: tp,
            stop_loss: sl,
            trailing_activation: ta,
            trailing_distance: td,
        }
    })
}

fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn m15_bar(minutes: i64, close: f64) -> Bar {
    Bar {
        timeframe: Timeframe::minutes(15),
        timestamp: t(minutes),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1000.0,
    }
}

fn levels() -> RiskLevels {
    RiskLevels {
        stop_distance: 30.0,
        target_distance: 1000.0,
        trailing_activation: 20.0,
        trailing_distance: 10.0,
        source: RiskSource::Fixed,
    }
}

/// A manager holding one filled position opened at 1400 at `t(0)`.
fn opened_manager(
    config: &xover_core::EngineConfig,
    side: Side,
) -> LifecycleManager {
    let mut lm = LifecycleManager::new(config);
    let OrderCommand::SubmitBracket(req) =
        lm.open(side, 1400.0, levels(), Timeframe::minutes(15), PositionOrigin::Primary)
    else {
        panic!("expected bracket");
    };
    lm.on_event(&ExecutionEvent::OrderAccepted {
        tag: req.stop_tag(),
        order_id: OrderId(2),
    });
    lm.on_event(&ExecutionEvent::EntryFilled {
        position_id: req.position_id,
        side,
        price: 1400.0,
        size: 1.0,
        timestamp: t(0),
    });
    lm
}

fn stop_moves(commands: &[OrderCommand]) -> Vec<f64> {
    commands
        .iter()
        .filter_map(|c| match c {
            OrderCommand::ModifyStop { trigger_price, .. } => Some(*trigger_price),
            _ => None,
        })
        .collect()
}

// ── 1. Ratchet Monotonicity ──────────────────────────────────────────

proptest! {
    /// Whatever is proposed, the level never moves against the position.
    #[test]
    fn ratchet_never_loosens(
        side in arb_side(),
        initial_stop in arb_stop_price(),
        deltas in prop::collection::vec(-10.0..10.0_f64, 1..30),
    ) {
        let mut ratchet = RatchetState::with_initial_level(side, initial_stop);
        let mut current = initial_stop;
        for delta in deltas {
            let next = ratchet.apply(current + delta);
            match side {
                Side::Long => prop_assert!(next >= current, "long loosened: {next} < {current}"),
                Side::Short => prop_assert!(next <= current, "short loosened: {next} > {current}"),
            }
            prop_assert_eq!(ratchet.current_level(), Some(next));
            current = next;
        }
    }
}

// ── 2. Trailing Moves ────────────────────────────────────────────────

proptest! {
    /// Every emitted stop move is strictly tighter than the previous one.
    #[test]
    fn trailing_moves_strictly_tighten(
        side in arb_side(),
        steps in prop::collection::vec(-8.0..8.0_f64, 1..60),
    ) {
        let mut config = common::scenario_config();
        config.trailing.enabled = true;
        let mut lm = opened_manager(&config, side);

        let mut close = 1400.0;
        let mut commands = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            close += step;
            commands.extend(lm.on_bar(&m15_bar(15 * (i as i64 + 1), close)));
        }

        let moves = stop_moves(&commands);
        for pair in moves.windows(2) {
            match side {
                Side::Long => prop_assert!(pair[1] > pair[0]),
                Side::Short => prop_assert!(pair[1] < pair[0]),
            }
        }
        // never looser than the initial stop either
        let initial = side.stop_from(1400.0, 30.0);
        for m in moves {
            prop_assert!(side.is_tighter(m, initial));
        }
    }
}

// ── 3. Regime Classification ─────────────────────────────────────────

proptest! {
    /// Same reading, same answer; moderate never scales anything.
    #[test]
    fn regime_is_pure_and_moderate_is_neutral(
        adx in 0.0..100.0_f64,
        ranging in 5.0..30.0_f64,
        gap in 0.0..30.0_f64,
        trending_set in arb_multipliers(),
        ranging_set in arb_multipliers(),
    ) {
        let trending = ranging + gap;
        let first = classify(adx, trending, ranging);
        prop_assert_eq!(first, classify(adx, trending, ranging));

        let config = RegimeConfig {
            trending: trending_set,
            ranging: ranging_set,
            ..RegimeConfig::default()
        };
        prop_assert_eq!(
            multipliers(Regime::Moderate, &config),
            AdjustmentMultipliers::default()
        );
        if first == Regime::Moderate {
            prop_assert!(adx >= ranging && adx <= trending);
        }
    }
}

// ── 4 & 5. Crossover Detection ───────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A straight line keeps fast and slow on the same side forever.
    #[test]
    fn parallel_averages_never_signal(
        base in 500.0..2000.0_f64,
        slope in prop_oneof![-2.0..-0.01_f64, 0.01..2.0_f64],
    ) {
        let closes: Vec<f64> = (0..150).map(|i| base + slope * i as f64).collect();
        let mut engine = StrategyEngine::new(common::scenario_config()).unwrap();
        let mut venue = SimulatedVenue::for_engine(&engine);
        let commands = common::drive(&mut engine, &mut venue, &common::primary_bars(&closes), false);

        prop_assert!(commands.is_empty());
        prop_assert_eq!(engine.stats().primary_signals, 0);
    }

    /// A drift broken once by a large jump against it crosses exactly once.
    #[test]
    fn single_crossing_signals_once(
        bullish in any::<bool>(),
        drift in 0.1..1.0_f64,
        jump in 300.0..600.0_f64,
        at in 40usize..120,
    ) {
        let sign = if bullish { 1.0 } else { -1.0 };
        let closes: Vec<f64> = (0..160)
            .map(|i| {
                if i < at {
                    1000.0 - sign * drift * i as f64
                } else {
                    1000.0 - sign * drift * at as f64 + sign * (jump + drift * (i - at) as f64)
                }
            })
            .collect();
        let mut engine = StrategyEngine::new(common::scenario_config()).unwrap();
        let mut venue = SimulatedVenue::for_engine(&engine);
        let bars = common::primary_bars(&closes);
        let commands = common::drive(&mut engine, &mut venue, &bars, false);

        prop_assert_eq!(engine.stats().primary_signals, 1);
        let brackets = common::brackets(&commands);
        prop_assert_eq!(brackets.len(), 1);
        prop_assert_eq!(brackets[0].0, bars[at].timestamp);
        let expected = if bullish { Side::Long } else { Side::Short };
        prop_assert_eq!(brackets[0].1.side, expected);
    }
}

// ── 6. Minimum Hold ──────────────────────────────────────────────────

proptest! {
    /// The widened stop is narrowed once, on the first managed bar at or
    /// after the hold period, and never again without trailing.
    #[test]
    fn min_hold_narrows_exactly_once(
        side in arb_side(),
        hold_bars in 1i64..8,
        closes in prop::collection::vec(1380.0..1420.0_f64, 10..30),
    ) {
        let mut config = common::scenario_config();
        config.min_hold.enabled = true;
        config.min_hold.duration_minutes = 15 * hold_bars;
        config.min_hold.stop_multiplier = 2.0;
        let mut lm = opened_manager(&config, side);

        let mut narrowed_at = Vec::new();
        for (i, close) in closes.iter().enumerate() {
            let bar_index = i as i64 + 1;
            let moves = stop_moves(&lm.on_bar(&m15_bar(15 * bar_index, *close)));
            for m in moves {
                narrowed_at.push((bar_index, m));
            }
        }

        let narrowed_to = side.stop_from(1400.0, 30.0);
        prop_assert_eq!(narrowed_at, vec![(hold_bars, narrowed_to)]);
    }
}
