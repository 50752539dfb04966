//! Domain models for the allocation engine

pub mod event;
pub mod grid;
pub mod hospital;
pub mod message;
pub mod patient;
pub mod resource;
pub mod state;

// Re-exports
pub use event::{Event, EventLog, RemovalReason, UnmetReason};
pub use grid::{Grid, GridPosition};
pub use hospital::{AllocationError, CareProvider, Hospital, ReplenishConfig};
pub use message::{AllocationCommand, BidResponse, Request};
pub use patient::{NeedGrowthConfig, NeedUpdate, Patient, Severity};
pub use resource::{ResourceType, ResourceVector, MAX_QUANTITY};
pub use state::SimulationState;
