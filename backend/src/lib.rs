//! Care Allocation Core - Rust Engine
//!
//! Deterministic multi-agent simulation of hospital resource allocation.
//! Patients develop need over time, hospitals bid to serve their requests,
//! and a coordinator arbitrates, replenishes and rebalances every tick.
//!
//! # Architecture
//!
//! - **core**: Time management
//! - **rng**: Deterministic random number generation
//! - **models**: Domain types (ResourceVector, Patient, Hospital, messages, events, state)
//! - **policy**: Bid scoring and request ordering
//! - **arrivals**: Initial cohort and Poisson patient arrivals
//! - **coordinator**: Hospital registry, arbitration, rebalancing, metrics
//! - **orchestrator**: Configuration, tick loop, snapshots
//!
//! # Critical Invariants
//!
//! 1. All resource quantities are i64 and never negative
//! 2. `available ≤ capacity` for every hospital, and only the hospital's own
//!    operations change `available`
//! 3. All randomness is deterministic (seeded RNG)
//! 4. A tick never fails

// Module declarations
pub mod arrivals;
pub mod coordinator;
pub mod core;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;

// Re-exports for convenience
pub use arrivals::{ArrivalConfig, PatientGenerator, SeverityWeights};
pub use coordinator::{CoordinationError, CoordinatorConfig, ResourceCoordinator, TickMetrics};
pub use core::time::TimeManager;
pub use models::{
    event::{Event, EventLog},
    hospital::{AllocationError, CareProvider, Hospital},
    patient::{Patient, Severity},
    resource::{ResourceType, ResourceVector},
    state::SimulationState,
};
pub use orchestrator::{run_simulation, Orchestrator, SimulationConfig, SimulationError, TickResult};
pub use policy::ScoringWeights;
pub use rng::RngManager;
