//! Resource coordinator
//!
//! Owns the hospital registry, this tick's pending requests and the
//! metrics time series, and drives the per-tick stages:
//!
//! ```text
//! Collect → Order → Arbitrate → Replenish → Rebalance → Metrics
//! ```
//!
//! The coordinator never writes hospital state itself. Every change to a
//! hospital's `available` goes through that hospital's own
//! [`CareProvider`] operations.
//!
//! # Example
//!
//! ```rust
//! use care_allocation_core_rs::coordinator::{CoordinatorConfig, ResourceCoordinator};
//! use care_allocation_core_rs::models::EventLog;
//! use care_allocation_core_rs::{
//!     Hospital, Patient, ResourceType, ResourceVector, RngManager, Severity, SimulationState,
//! };
//!
//! let beds = |n| ResourceVector::from_pairs(&[(ResourceType::Beds, n)]);
//!
//! let mut coordinator = ResourceCoordinator::new(CoordinatorConfig::default());
//! coordinator
//!     .register_hospital(Box::new(Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds])))
//!     .unwrap();
//!
//! let mut state = SimulationState::new(vec![
//!     Patient::new("P0001".to_string(), Severity::High).with_need(beds(4)),
//! ]);
//! let mut rng = RngManager::new(42);
//! let mut log = EventLog::new();
//!
//! let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
//! assert_eq!(outcome.metrics.allocated, 4);
//! assert!(state.get_patient("P0001").unwrap().need().is_zero());
//! ```

pub mod arbitration;
pub mod metrics;
pub mod rebalance;

pub use arbitration::{arbitrate_all, arbitrate_request, validate_bid, ArbitrationSummary, BidRejection, Commitment};
pub use metrics::{efficiency, MetricsSeries, TickMetrics};
pub use rebalance::{rebalance, RebalanceConfig, Transfer};

use crate::models::event::{Event, EventLog, UnmetReason};
use crate::models::hospital::{AllocationError, CareProvider, ReplenishConfig};
use crate::models::message::{AllocationCommand, Request};
use crate::models::resource::ResourceVector;
use crate::models::state::SimulationState;
use crate::policy::{order_requests, OrderingConfig, ScoringWeights};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Coordination failures. None of them halts a tick.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinationError {
    #[error("No eligible hospital for patient {patient_id}")]
    NoEligibleHospital { patient_id: String },

    #[error("All eligible hospitals refused patient {patient_id} after {attempts} attempts")]
    HospitalsExhausted { patient_id: String, attempts: usize },

    #[error("Invalid bid from {hospital_id}: {rejection}")]
    InvalidBid {
        hospital_id: String,
        rejection: BidRejection,
    },

    #[error("Hospital {0} is already registered")]
    DuplicateHospital(String),

    #[error(transparent)]
    InsufficientResource(#[from] AllocationError),
}

impl CoordinationError {
    /// Reason to report when this error leaves a request unmet
    pub fn unmet_reason(&self) -> Option<UnmetReason> {
        match self {
            CoordinationError::NoEligibleHospital { .. } => Some(UnmetReason::NoEligibleHospital),
            CoordinationError::HospitalsExhausted { .. } => Some(UnmetReason::HospitalsExhausted),
            _ => None,
        }
    }
}

/// Coordinator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Minimum score a bid needs to be considered
    #[serde(default = "default_eligibility_threshold")]
    pub eligibility_threshold: f64,

    #[serde(default)]
    pub scoring: ScoringWeights,

    #[serde(default)]
    pub ordering: OrderingConfig,

    #[serde(default)]
    pub replenish: ReplenishConfig,

    #[serde(default)]
    pub rebalance: RebalanceConfig,
}

fn default_eligibility_threshold() -> f64 {
    0.5
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            eligibility_threshold: default_eligibility_threshold(),
            scoring: ScoringWeights::default(),
            ordering: OrderingConfig::default(),
            replenish: ReplenishConfig::default(),
            rebalance: RebalanceConfig::default(),
        }
    }
}

/// Everything one coordinator tick produced
#[derive(Debug, Clone, Default)]
pub struct CoordinatorTick {
    pub metrics: TickMetrics,
    pub commands: Vec<AllocationCommand>,
    pub transfers: Vec<Transfer>,
    pub replenished: ResourceVector,
}

/// Owns the hospital registry and runs arbitration
pub struct ResourceCoordinator {
    config: CoordinatorConfig,

    /// Registration order is the tie-break order for equal scores
    hospitals: Vec<Box<dyn CareProvider>>,

    /// Requests collected this tick, in service order once ordered
    pending_requests: Vec<Request>,

    /// Requests left unmet by the last arbitration pass
    deferred_requests: Vec<Request>,

    metrics: MetricsSeries,
}

impl ResourceCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            hospitals: Vec::new(),
            pending_requests: Vec::new(),
            deferred_requests: Vec::new(),
            metrics: MetricsSeries::new(),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Add a hospital to the registry
    pub fn register_hospital(&mut self, hospital: Box<dyn CareProvider>) -> Result<(), CoordinationError> {
        if self.hospital(hospital.id()).is_some() {
            return Err(CoordinationError::DuplicateHospital(hospital.id().to_string()));
        }
        self.hospitals.push(hospital);
        Ok(())
    }

    pub fn hospitals(&self) -> &[Box<dyn CareProvider>] {
        &self.hospitals
    }

    pub fn hospital(&self, id: &str) -> Option<&dyn CareProvider> {
        self.hospitals.iter().find(|h| h.id() == id).map(|h| h.as_ref())
    }

    pub fn num_hospitals(&self) -> usize {
        self.hospitals.len()
    }

    pub fn pending_requests(&self) -> &[Request] {
        &self.pending_requests
    }

    pub fn deferred_requests(&self) -> &[Request] {
        &self.deferred_requests
    }

    pub fn metrics(&self) -> &MetricsSeries {
        &self.metrics
    }

    /// Stage 1: gather a request from every patient with outstanding need
    pub fn collect_requests(&mut self, state: &mut SimulationState, tick: usize, log: &mut EventLog) -> usize {
        self.pending_requests.clear();
        for patient in state.patients_mut() {
            if let Some(request) = patient.emit_request() {
                log.log(Event::RequestEmitted {
                    tick,
                    patient_id: request.patient_id.clone(),
                    severity: request.severity,
                    need: request.need,
                    wait_ticks: request.wait_ticks,
                });
                self.pending_requests.push(request);
            }
        }
        self.pending_requests.len()
    }

    /// Stage 2: sort pending requests into service order
    pub fn order_pending(&mut self) {
        order_requests(&mut self.pending_requests, &self.config.ordering);
    }

    /// Stage 3: serve pending requests one at a time
    pub fn arbitrate(&mut self, state: &mut SimulationState, tick: usize, log: &mut EventLog) -> ArbitrationSummary {
        let (summary, deferred) = arbitrate_all(
            &mut self.hospitals,
            state,
            &self.pending_requests,
            &self.config.scoring,
            self.config.eligibility_threshold,
            tick,
            log,
        );
        self.deferred_requests = deferred;
        summary
    }

    /// Stage 4: restock every hospital; returns the total added
    pub fn replenish_all(&mut self, tick: usize, rng: &mut RngManager) -> ResourceVector {
        self.hospitals
            .iter_mut()
            .fold(ResourceVector::zero(), |acc, hospital| {
                acc.saturating_add(&hospital.replenish(tick, &self.config.replenish, rng))
            })
    }

    /// Stage 5: move surplus stock toward backlogged hospitals
    pub fn rebalance(
        &mut self,
        backlog: &BTreeMap<String, ResourceVector>,
        tick: usize,
        log: &mut EventLog,
    ) -> Vec<Transfer> {
        rebalance(&mut self.hospitals, backlog, &self.config.rebalance, tick, log)
    }

    /// Stage 6: append this tick's metrics
    pub fn record_metrics(
        &mut self,
        tick: usize,
        summary: &ArbitrationSummary,
        transfers: &[Transfer],
        state: &SimulationState,
    ) -> TickMetrics {
        let metrics = TickMetrics {
            tick,
            requests: summary.num_requests,
            requested: summary.requested,
            allocated: summary.allocated,
            efficiency: efficiency(summary.allocated, summary.requested),
            unmet_need: state.total_unmet_need(),
            unmet_requests: summary.unmet_requests,
            allocations: summary.commands.len(),
            invalid_bids: summary.invalid_bids,
            retries: summary.retries,
            transfers: transfers.len(),
            transferred: transfers.iter().map(|t| t.amount).sum(),
        };
        self.metrics.record(metrics.clone());
        metrics
    }

    /// Run all coordinator stages for one tick, strictly in order
    pub fn run_tick(
        &mut self,
        state: &mut SimulationState,
        tick: usize,
        rng: &mut RngManager,
        log: &mut EventLog,
    ) -> CoordinatorTick {
        self.collect_requests(state, tick, log);
        self.order_pending();
        let summary = self.arbitrate(state, tick, log);
        let replenished = self.replenish_all(tick, rng);
        let transfers = self.rebalance(&summary.backlog, tick, log);
        let metrics = self.record_metrics(tick, &summary, &transfers, state);

        CoordinatorTick {
            metrics,
            commands: summary.commands,
            transfers,
            replenished,
        }
    }

    /// Drop a departed patient from every hospital's admitted set.
    ///
    /// Returns how many hospitals had admitted it.
    pub fn discharge_patient(&mut self, patient_id: &str) -> usize {
        self.hospitals
            .iter_mut()
            .map(|h| h.discharge(patient_id))
            .filter(|was_admitted| *was_admitted)
            .count()
    }
}

impl std::fmt::Debug for ResourceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCoordinator")
            .field("num_hospitals", &self.hospitals.len())
            .field("pending_requests", &self.pending_requests.len())
            .field("ticks_recorded", &self.metrics.len())
            .finish()
    }
}
