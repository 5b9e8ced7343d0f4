//! Scenario replay module.

mod orchestrator;
mod scenario;
mod stats;

pub use orchestrator::ScenarioRunner;
pub use scenario::{Scenario, Step};
pub use stats::RunStats;
