//! Domain types for the crossover engine.

pub mod bar;
pub mod ids;
pub mod order;
pub mod position;
pub mod timeframe;

pub use bar::Bar;
pub use ids::{OrderId, OrderRole, OrderTag, PositionId};
pub use order::{BracketRequest, ExecutionEvent, ExitReason, OrderCommand};
pub use position::{Position, PositionOrigin, Side};
pub use timeframe::{TimeUnit, Timeframe, TimeframeError};
