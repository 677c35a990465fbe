//! Execution seam: how order commands reach a venue and how its reports come back.
//!
//! The engine never calls a venue. A driver hands each `OrderCommand` to an
//! `OrderExecutor` and feeds the resulting `ExecutionEvent`s back through
//! `StrategyEngine::on_execution_event`.
//!
//! - `SimulatedVenue`: bar-driven venue for replays and tests
//! - `replay`: drives an engine and an executor over a bar stream

pub mod replay;
pub mod sim;

pub use replay::{replay, ReplayStats};
pub use sim::SimulatedVenue;

use crate::domain::{Bar, ExecutionEvent, OrderCommand};

/// A venue (real or simulated) that carries out order commands.
pub trait OrderExecutor {
    /// Carry out one command and report what happened.
    fn execute(&mut self, command: &OrderCommand) -> Vec<ExecutionEvent>;

    /// Advance the venue's market by one bar and report any fills it caused.
    fn on_bar(&mut self, bar: &Bar) -> Vec<ExecutionEvent>;
}
