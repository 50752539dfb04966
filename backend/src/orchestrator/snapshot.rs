//! Per-tick rendering snapshots
//!
//! A read-only view of the world after a tick: where every agent is, how
//! full every hospital is, the tick's headline metrics and the events the
//! tick produced, in order.
//!
//! # Critical Invariants
//!
//! - **Read-only**: building a snapshot never mutates simulation state
//! - **Deterministic order**: hospitals in registry order, patients by ID

use crate::models::event::Event;
use crate::models::grid::GridPosition;
use crate::models::hospital::CareProvider;
use crate::models::patient::{Patient, Severity};
use crate::models::resource::{ResourceType, ResourceVector};
use serde::{Deserialize, Serialize};

/// Hospital view for rendering (size encodes `availability_ratio`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalSnapshot {
    pub id: String,
    pub position: GridPosition,
    pub specializations: Vec<ResourceType>,
    pub capacity: ResourceVector,
    pub available: ResourceVector,
    pub availability_ratio: f64,
    pub admitted_count: usize,
}

impl From<&dyn CareProvider> for HospitalSnapshot {
    fn from(hospital: &dyn CareProvider) -> Self {
        HospitalSnapshot {
            id: hospital.id().to_string(),
            position: hospital.position(),
            specializations: hospital.specializations().iter().copied().collect(),
            capacity: *hospital.capacity(),
            available: *hospital.available(),
            availability_ratio: hospital.availability_ratio(),
            admitted_count: hospital.admitted().len(),
        }
    }
}

/// Patient view for rendering (size encodes severity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub id: String,
    pub position: GridPosition,
    pub severity: Severity,
    pub need: ResourceVector,
    pub wait_ticks: usize,
}

impl From<&Patient> for PatientSnapshot {
    fn from(patient: &Patient) -> Self {
        PatientSnapshot {
            id: patient.id().to_string(),
            position: patient.position(),
            severity: patient.severity(),
            need: *patient.need(),
            wait_ticks: patient.wait_ticks(),
        }
    }
}

/// State of the world at the end of one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick: usize,
    pub hospitals: Vec<HospitalSnapshot>,
    pub patients: Vec<PatientSnapshot>,
    pub efficiency: f64,
    pub unmet_need: i64,
    /// Events logged during this tick, in order
    pub events: Vec<Event>,
}

impl TickSnapshot {
    pub fn hospital(&self, id: &str) -> Option<&HospitalSnapshot> {
        self.hospitals.iter().find(|h| h.id == id)
    }

    pub fn patient(&self, id: &str) -> Option<&PatientSnapshot> {
        self.patients.iter().find(|p| p.id == id)
    }

    /// Total unallocated stock across hospitals
    pub fn total_available(&self) -> ResourceVector {
        self.hospitals
            .iter()
            .fold(ResourceVector::zero(), |acc, h| acc.saturating_add(&h.available))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::hospital::Hospital;

    #[test]
    fn test_hospital_snapshot_reads_provider() {
        let capacity = ResourceVector::from_pairs(&[(ResourceType::Beds, 10)]);
        let hospital = Hospital::new("H01".to_string(), capacity, [ResourceType::Beds])
            .with_available(ResourceVector::from_pairs(&[(ResourceType::Beds, 5)]))
            .at(GridPosition::new(3, 4));

        let snapshot = HospitalSnapshot::from(&hospital as &dyn CareProvider);
        assert_eq!(snapshot.position, GridPosition::new(3, 4));
        assert_eq!(snapshot.availability_ratio, 0.5);
        assert_eq!(snapshot.specializations, vec![ResourceType::Beds]);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = TickSnapshot {
            tick: 0,
            hospitals: vec![],
            patients: vec![PatientSnapshot::from(&Patient::new(
                "P0001".to_string(),
                Severity::Low,
            ))],
            efficiency: 1.0,
            unmet_need: 0,
            events: vec![],
        };
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"P0001\""));
        assert_eq!(snapshot.total_available(), ResourceVector::zero());
    }
}
