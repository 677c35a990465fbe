//! Replay harness: engine + executor over an interleaved bar stream.
//!
//! Per bar the venue moves first (resting stops and targets may fill on the
//! bar's range), then the engine sees the bar; its commands go straight to the
//! executor and every report is fed back before the next bar.

use serde::Serialize;
use tracing::debug;

use crate::domain::Bar;
use crate::engine::StrategyEngine;

use super::OrderExecutor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub bars: u64,
    pub commands: u64,
    pub events: u64,
}

pub fn replay<E, I>(engine: &mut StrategyEngine, venue: &mut E, bars: I) -> ReplayStats
where
    E: OrderExecutor,
    I: IntoIterator<Item = Bar>,
{
    let mut stats = ReplayStats::default();
    for bar in bars {
        stats.bars += 1;
        for event in venue.on_bar(&bar) {
            stats.events += 1;
            engine.on_execution_event(&event);
        }
        for command in engine.on_bar(&bar) {
            stats.commands += 1;
            debug!(?command, "executing");
            for event in venue.execute(&command) {
                stats.events += 1;
                engine.on_execution_event(&event);
            }
        }
    }
    stats
}
