//! Deterministic discrete-event simulator for two sliding window stations.

pub mod channel;
pub mod engine;
pub mod scenario_runner;
pub mod trace;

pub use engine::{EventType, FrameRule, Simulator};
pub use scenario_runner::{load_scenario, run_loaded, run_scenario};
pub use trace::{FrameCounts, SimulationReport, StationReport, TraceRecord};
