//! Application layer: scenario simulation over the widget runtime.

pub mod scenario;
pub mod simulator;

pub use scenario::{CatalogSpec, LineSpec, Scenario, ScenarioStep};
pub use simulator::{SimulationReport, Simulator, TraceEntry};
