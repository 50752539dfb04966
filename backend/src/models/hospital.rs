//! Hospital (supply agent) model
//!
//! A hospital owns a static `capacity` vector and a mutable `available`
//! vector. Only the hospital's own operations change `available`:
//!
//! - `allocate` (commit to a patient)
//! - `replenish` (per-tick restock)
//! - `release_surplus` / `accept_transfer` (rebalancing between hospitals)
//!
//! # Critical Invariants
//!
//! 1. `0 ≤ available ≤ capacity` componentwise, always
//! 2. A failed `allocate` leaves the hospital unchanged
//! 3. An offer never exceeds `available` or the request's need
//!
//! The coordinator talks to hospitals only through [`CareProvider`], so a
//! test double (or a future remote hospital) can stand in for [`Hospital`].

use crate::models::grid::GridPosition;
use crate::models::message::{BidResponse, Request};
use crate::models::resource::{ResourceType, ResourceVector};
use crate::policy::{ScoreComponents, ScoringWeights};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur during hospital operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocationError {
    #[error("Insufficient {resource}: requested {requested}, available {available}")]
    InsufficientResource {
        resource: ResourceType,
        requested: i64,
        available: i64,
    },
}

/// Per-tick restocking parameters
///
/// Each tick a hospital regains `ceil(capacity * rate_fraction)` per type
/// plus a uniform jitter in `[0, jitter]`, clamped at capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishConfig {
    #[serde(default = "default_rate_fraction")]
    pub rate_fraction: f64,

    #[serde(default)]
    pub jitter: i64,
}

fn default_rate_fraction() -> f64 {
    0.1
}

impl Default for ReplenishConfig {
    fn default() -> Self {
        Self {
            rate_fraction: default_rate_fraction(),
            jitter: 0,
        }
    }
}

/// Capability surface a hospital exposes to the coordinator
pub trait CareProvider: std::fmt::Debug {
    fn id(&self) -> &str;

    fn position(&self) -> GridPosition;

    fn specializations(&self) -> &BTreeSet<ResourceType>;

    fn capacity(&self) -> &ResourceVector;

    fn available(&self) -> &ResourceVector;

    /// Patients currently holding an allocation from this provider
    fn admitted(&self) -> &BTreeSet<String>;

    /// Score a request and propose an offer
    fn bid(&self, request: &Request, weights: &ScoringWeights) -> BidResponse;

    /// Commit `quantity` to `patient_id`
    fn allocate(
        &mut self,
        patient_id: &str,
        quantity: &ResourceVector,
    ) -> Result<ResourceVector, AllocationError>;

    /// Restock for this tick; returns what was actually added
    fn replenish(
        &mut self,
        tick: usize,
        config: &ReplenishConfig,
        rng: &mut RngManager,
    ) -> ResourceVector;

    /// Give up to `amount` of `resource` without dropping below
    /// `reserve_floor`; returns what was actually released
    fn release_surplus(&mut self, resource: ResourceType, amount: i64, reserve_floor: i64) -> i64;

    /// Take up to `amount` of `resource` without exceeding capacity;
    /// returns what was actually accepted
    fn accept_transfer(&mut self, resource: ResourceType, amount: i64) -> i64;

    /// Forget a departed patient; true if it was admitted here
    fn discharge(&mut self, patient_id: &str) -> bool;

    /// Fraction of capacity currently available, over all types (1.0 when capacity is zero)
    fn availability_ratio(&self) -> f64 {
        let capacity = self.capacity().total();
        if capacity <= 0 {
            return 1.0;
        }
        self.available().total() as f64 / capacity as f64
    }
}

/// A hospital in the simulation
///
/// # Example
/// ```
/// use care_allocation_core_rs::{CareProvider, Hospital, ResourceType, ResourceVector};
///
/// let capacity = ResourceVector::from_pairs(&[(ResourceType::Beds, 10)]);
/// let mut hospital = Hospital::new("H01".to_string(), capacity, [ResourceType::Beds]);
///
/// let granted = hospital
///     .allocate("P0001", &ResourceVector::from_pairs(&[(ResourceType::Beds, 4)]))
///     .unwrap();
/// assert_eq!(granted.get(ResourceType::Beds), 4);
/// assert_eq!(hospital.available().get(ResourceType::Beds), 6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    id: String,
    specializations: BTreeSet<ResourceType>,
    /// Static ceiling
    capacity: ResourceVector,
    /// Unallocated stock; never above `capacity`
    available: ResourceVector,
    admitted: BTreeSet<String>,
    position: GridPosition,
}

impl Hospital {
    /// Create a fully stocked hospital
    pub fn new(
        id: String,
        capacity: ResourceVector,
        specializations: impl IntoIterator<Item = ResourceType>,
    ) -> Self {
        Self {
            id,
            specializations: specializations.into_iter().collect(),
            capacity,
            available: capacity,
            admitted: BTreeSet::new(),
            position: GridPosition::default(),
        }
    }

    /// Builder: start partially stocked (clamped at capacity)
    pub fn with_available(mut self, available: ResourceVector) -> Self {
        self.available = available.min(&self.capacity);
        self
    }

    pub fn at(mut self, position: GridPosition) -> Self {
        self.position = position;
        self
    }

    /// True if any requested type is one of this hospital's specializations
    pub fn matches_specialization(&self, need: &ResourceVector) -> bool {
        need.types_present().any(|r| self.specializations.contains(&r))
    }

    /// Availability ratio of the request's dominant type (0 when it has no capacity)
    pub fn dominant_availability(&self, need: &ResourceVector) -> f64 {
        let Some(dominant) = need.dominant_type() else {
            return 0.0;
        };
        let capacity = self.capacity.get(dominant);
        if capacity <= 0 {
            return 0.0;
        }
        self.available.get(dominant) as f64 / capacity as f64
    }

    pub fn score_components(&self, request: &Request, weights: &ScoringWeights) -> ScoreComponents {
        ScoreComponents {
            specialization_match: weights
                .specialization_match(self.matches_specialization(&request.need)),
            availability_ratio: self.dominant_availability(&request.need),
            efficiency: weights.efficiency_term(self.admitted.len()),
        }
    }

    /// Suitability for `request` in [0, 1]
    pub fn score(&self, request: &Request, weights: &ScoringWeights) -> f64 {
        weights.combine(self.score_components(request, weights))
    }
}

impl CareProvider for Hospital {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> GridPosition {
        self.position
    }

    fn specializations(&self) -> &BTreeSet<ResourceType> {
        &self.specializations
    }

    fn capacity(&self) -> &ResourceVector {
        &self.capacity
    }

    fn available(&self) -> &ResourceVector {
        &self.available
    }

    fn admitted(&self) -> &BTreeSet<String> {
        &self.admitted
    }

    fn bid(&self, request: &Request, weights: &ScoringWeights) -> BidResponse {
        BidResponse {
            hospital_id: self.id.clone(),
            score: self.score(request, weights),
            offer: request.need.min(&self.available),
        }
    }

    fn allocate(
        &mut self,
        patient_id: &str,
        quantity: &ResourceVector,
    ) -> Result<ResourceVector, AllocationError> {
        if let Some((resource, requested, available)) = quantity.first_excess(&self.available) {
            return Err(AllocationError::InsufficientResource {
                resource,
                requested,
                available,
            });
        }

        self.available = self.available.saturating_sub(quantity);
        if !quantity.is_zero() {
            self.admitted.insert(patient_id.to_string());
        }
        Ok(*quantity)
    }

    fn replenish(
        &mut self,
        tick: usize,
        config: &ReplenishConfig,
        rng: &mut RngManager,
    ) -> ResourceVector {
        let mut inflow = self.capacity.scaled_ceil(config.rate_fraction);
        if config.jitter > 0 {
            for resource in ResourceType::ALL {
                let extra = rng.range(0, config.jitter.saturating_add(1));
                inflow.set(resource, inflow.get(resource).saturating_add(extra));
            }
        }

        let before = self.available;
        self.available = self.available.add_clamped(&inflow, &self.capacity);
        let added = self.available.saturating_sub(&before);
        tracing::trace!(tick, hospital = %self.id, added = %added, "replenished");
        added
    }

    fn release_surplus(&mut self, resource: ResourceType, amount: i64, reserve_floor: i64) -> i64 {
        let current = self.available.get(resource);
        let releasable = (current - reserve_floor.max(0)).max(0);
        let released = amount.max(0).min(releasable);
        self.available.set(resource, current - released);
        released
    }

    fn accept_transfer(&mut self, resource: ResourceType, amount: i64) -> i64 {
        let current = self.available.get(resource);
        let headroom = (self.capacity.get(resource) - current).max(0);
        let accepted = amount.max(0).min(headroom);
        self.available.set(resource, current + accepted);
        accepted
    }

    fn discharge(&mut self, patient_id: &str) -> bool {
        self.admitted.remove(patient_id)
    }
}
