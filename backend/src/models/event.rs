//! Event logging for the allocation engine.
//!
//! Every interaction between agents is recorded as an [`Event`]. The log is
//! the message trail the rendering consumer shows and the audit trail tests
//! assert against.
//!
//! # Event Types
//!
//! Events are grouped by tick stage:
//! - **Needs**: patient arrival, severity escalation, request emission
//! - **Arbitration**: invalid bids, allocation retries, commits, unmet requests
//! - **Rebalance**: resource transfers between hospitals
//! - **Lifecycle**: patient removal
//!
//! # Example
//!
//! ```rust
//! use care_allocation_core_rs::models::event::{Event, EventLog, UnmetReason};
//! use care_allocation_core_rs::ResourceVector;
//!
//! let mut log = EventLog::new();
//! log.log(Event::RequestUnmet {
//!     tick: 3,
//!     patient_id: "P0007".to_string(),
//!     reason: UnmetReason::NoEligibleHospital,
//!     remaining: ResourceVector::uniform(1),
//! });
//!
//! assert_eq!(log.events_at_tick(3).len(), 1);
//! assert_eq!(log.events_for_patient("P0007")[0].event_type(), "RequestUnmet");
//! ```

use crate::models::patient::Severity;
use crate::models::resource::{ResourceType, ResourceVector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a request left arbitration without a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnmetReason {
    /// No valid bid reached the eligibility threshold with a non-empty offer
    NoEligibleHospital,
    /// Every eligible hospital refused at commit time
    HospitalsExhausted,
}

impl fmt::Display for UnmetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmetReason::NoEligibleHospital => f.write_str("no eligible hospital"),
            UnmetReason::HospitalsExhausted => f.write_str("all eligible hospitals exhausted"),
        }
    }
}

/// Why a patient left the active set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    /// Need stayed at zero for the discharge grace period
    Recovered,
    /// Simulation horizon reached
    SimulationEnd,
}

/// Simulation event capturing a state change.
///
/// Events are logged in the order they occur within a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// New patient entered the active set
    PatientArrived {
        tick: usize,
        patient_id: String,
        severity: Severity,
    },

    /// Prolonged unmet need raised a patient's severity
    SeverityEscalated {
        tick: usize,
        patient_id: String,
        from: Severity,
        to: Severity,
    },

    /// Patient reported outstanding need to the coordinator
    RequestEmitted {
        tick: usize,
        patient_id: String,
        severity: Severity,
        need: ResourceVector,
        wait_ticks: usize,
    },

    /// A bid broke the score/offer contract and was discarded
    InvalidBid {
        tick: usize,
        patient_id: String,
        hospital_id: String,
        reason: String,
    },

    /// A selected hospital refused at commit time; coordinator moved on
    AllocationRetry {
        tick: usize,
        patient_id: String,
        hospital_id: String,
        reason: String,
    },

    /// Allocation committed
    AllocationCommitted {
        tick: usize,
        patient_id: String,
        hospital_id: String,
        granted: ResourceVector,
        score: f64,
    },

    /// Request deferred to the next tick
    RequestUnmet {
        tick: usize,
        patient_id: String,
        reason: UnmetReason,
        remaining: ResourceVector,
    },

    /// Unallocated stock moved between hospitals during rebalancing
    ResourceTransfer {
        tick: usize,
        from_hospital: String,
        to_hospital: String,
        resource: ResourceType,
        amount: i64,
    },

    /// Patient left the active set
    PatientRemoved {
        tick: usize,
        patient_id: String,
        reason: RemovalReason,
    },
}

impl Event {
    /// Get the tick number when this event occurred
    pub fn tick(&self) -> usize {
        match self {
            Event::PatientArrived { tick, .. } => *tick,
            Event::SeverityEscalated { tick, .. } => *tick,
            Event::RequestEmitted { tick, .. } => *tick,
            Event::InvalidBid { tick, .. } => *tick,
            Event::AllocationRetry { tick, .. } => *tick,
            Event::AllocationCommitted { tick, .. } => *tick,
            Event::RequestUnmet { tick, .. } => *tick,
            Event::ResourceTransfer { tick, .. } => *tick,
            Event::PatientRemoved { tick, .. } => *tick,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::PatientArrived { .. } => "PatientArrived",
            Event::SeverityEscalated { .. } => "SeverityEscalated",
            Event::RequestEmitted { .. } => "RequestEmitted",
            Event::InvalidBid { .. } => "InvalidBid",
            Event::AllocationRetry { .. } => "AllocationRetry",
            Event::AllocationCommitted { .. } => "AllocationCommitted",
            Event::RequestUnmet { .. } => "RequestUnmet",
            Event::ResourceTransfer { .. } => "ResourceTransfer",
            Event::PatientRemoved { .. } => "PatientRemoved",
        }
    }

    /// Get patient ID if event relates to a specific patient
    pub fn patient_id(&self) -> Option<&str> {
        match self {
            Event::PatientArrived { patient_id, .. } => Some(patient_id),
            Event::SeverityEscalated { patient_id, .. } => Some(patient_id),
            Event::RequestEmitted { patient_id, .. } => Some(patient_id),
            Event::InvalidBid { patient_id, .. } => Some(patient_id),
            Event::AllocationRetry { patient_id, .. } => Some(patient_id),
            Event::AllocationCommitted { patient_id, .. } => Some(patient_id),
            Event::RequestUnmet { patient_id, .. } => Some(patient_id),
            Event::PatientRemoved { patient_id, .. } => Some(patient_id),
            Event::ResourceTransfer { .. } => None,
        }
    }

    /// True if event involves the given hospital (either side of a transfer)
    pub fn involves_hospital(&self, hospital_id: &str) -> bool {
        match self {
            Event::InvalidBid { hospital_id: h, .. }
            | Event::AllocationRetry { hospital_id: h, .. }
            | Event::AllocationCommitted { hospital_id: h, .. } => h == hospital_id,
            Event::ResourceTransfer {
                from_hospital,
                to_hospital,
                ..
            } => from_hospital == hospital_id || to_hospital == hospital_id,
            _ => false,
        }
    }
}

/// Event log for storing and querying simulation events.
///
/// Append-only: events are never rewritten or removed.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Get the number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events logged at or after position `start`
    pub fn since(&self, start: usize) -> &[Event] {
        &self.events[start.min(self.events.len())..]
    }

    /// Get events for a specific tick
    pub fn events_at_tick(&self, tick: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.tick() == tick).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific patient
    pub fn events_for_patient(&self, patient_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.patient_id() == Some(patient_id))
            .collect()
    }

    /// Get events involving a specific hospital
    pub fn events_for_hospital(&self, hospital_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.involves_hospital(hospital_id))
            .collect()
    }
}
