//! The dispatch engine and the single task that drives it.

pub mod endpoints;
pub mod engine;
pub mod monitor;
pub mod policy;
pub mod rotation;
pub mod worker;

pub use endpoints::*;
pub use engine::{Delivery, Engine, Stall, TickOutcome};
pub use monitor::spawn_autotick;
pub use worker::{Dispatcher, Snapshot};
