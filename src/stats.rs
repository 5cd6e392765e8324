//! Read-only statistics over the session registry.

pub mod collector;
pub mod types;

pub use collector::snapshot;
pub use types::{ClientSummary, StatsSnapshot};
