//! Position lifecycle: bracket submission, trailing, duration rules, and the
//! reconciliation of execution reports.

pub mod manager;
pub mod ratchet;
pub mod registry;
pub mod trailing;

pub use manager::{ClosedPosition, LifecycleManager, Transition};
pub use ratchet::RatchetState;
pub use registry::{OrderRegistry, RegistryError};
pub use trailing::TrailingState;
