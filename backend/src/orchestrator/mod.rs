//! Orchestrator - main simulation loop
//!
//! Wires arrivals, need growth, the resource coordinator, discharge and
//! snapshots into a deterministic tick loop.
//!
//! See `engine.rs` for the loop itself.

pub mod config;
pub mod engine;
pub mod snapshot;


// Re-export main types for convenience
pub use config::SimulationConfig;
pub use engine::{run_simulation, Orchestrator, SimulationError, TickResult};
pub use snapshot::{HospitalSnapshot, PatientSnapshot, TickSnapshot};
