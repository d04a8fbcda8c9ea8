//! Supervisor core: child-process ownership and the lifecycle state machine.
//!
//! Internal modules:
//! - [`child`]: the single child-process slot with stop escalation;
//! - [`lifecycle`]: the phase state machine driving triggers → build → run;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod child;
mod lifecycle;
mod shutdown;

pub use child::ChildSlot;
pub use lifecycle::{Phase, Supervisor};
