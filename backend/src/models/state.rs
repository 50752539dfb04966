//! Simulation State
//!
//! Holds the active patient set. Hospitals live in the coordinator's
//! registry, so this state is exactly the demand side of the simulation.
//!
//! # Critical Invariants
//!
//! 1. **Patient Uniqueness**: each patient ID appears at most once
//! 2. **Deterministic Iteration**: patients iterate in ID order
//! 3. **Removal Discipline**: patients leave only via discharge or simulation end

use crate::models::patient::Patient;
use crate::models::resource::ResourceVector;
use std::collections::BTreeMap;

/// Active patient set
///
/// # Example
///
/// ```rust
/// use care_allocation_core_rs::{Patient, Severity, SimulationState};
///
/// let state = SimulationState::new(vec![
///     Patient::new("P0001".to_string(), Severity::Low),
///     Patient::new("P0002".to_string(), Severity::High),
/// ]);
/// assert_eq!(state.num_patients(), 2);
/// assert_eq!(state.total_unmet_need(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    /// Active patients, indexed (and iterated) by ID
    patients: BTreeMap<String, Patient>,
}

impl SimulationState {
    /// Create a new simulation state with the given patients
    ///
    /// # Panics
    ///
    /// Panics on duplicate patient IDs
    pub fn new(patients: Vec<Patient>) -> Self {
        let mut state = Self::default();
        for patient in patients {
            state.add_patient(patient);
        }
        state
    }

    /// Add a patient
    ///
    /// # Panics
    ///
    /// Panics if the patient ID already exists
    pub fn add_patient(&mut self, patient: Patient) {
        let id = patient.id().to_string();
        assert!(
            !self.patients.contains_key(&id),
            "Patient ID {} already exists",
            id
        );
        self.patients.insert(id, patient);
    }

    pub fn contains_patient(&self, id: &str) -> bool {
        self.patients.contains_key(id)
    }

    pub fn get_patient(&self, id: &str) -> Option<&Patient> {
        self.patients.get(id)
    }

    pub fn get_patient_mut(&mut self, id: &str) -> Option<&mut Patient> {
        self.patients.get_mut(id)
    }

    /// Remove a patient from the active set
    pub fn remove_patient(&mut self, id: &str) -> Option<Patient> {
        self.patients.remove(id)
    }

    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.patients.values()
    }

    pub fn patients_mut(&mut self) -> impl Iterator<Item = &mut Patient> {
        self.patients.values_mut()
    }

    /// Active patient IDs in iteration order
    pub fn patient_ids(&self) -> Vec<String> {
        self.patients.keys().cloned().collect()
    }

    pub fn num_patients(&self) -> usize {
        self.patients.len()
    }

    /// Componentwise sum of outstanding need
    pub fn total_need(&self) -> ResourceVector {
        self.patients
            .values()
            .fold(ResourceVector::zero(), |acc, p| acc.saturating_add(p.need()))
    }

    /// Sum of outstanding need magnitude over active patients
    pub fn total_unmet_need(&self) -> i64 {
        self.patients.values().map(|p| p.need().total()).sum()
    }
}
