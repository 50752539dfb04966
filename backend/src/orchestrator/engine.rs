//! Orchestrator Engine
//!
//! Main simulation loop integrating all components:
//! - Patient arrivals and need growth (deterministic, seeded)
//! - Coordinator stages (collect, order, arbitrate, replenish, rebalance, metrics)
//! - Discharge of recovered patients
//! - Event logging and per-tick snapshots
//!
//! # Architecture
//!
//! ```text
//! For each tick t:
//! 1. Generate arrivals (Poisson sampling, optional)
//! 2. Grow need and escalate severity for every active patient (ID order)
//! 3. Coordinator: Collect → Order → Arbitrate → Replenish → Rebalance → Metrics
//! 4. Discharge patients whose need stayed zero for the grace period
//! 5. Capture snapshot
//! 6. Advance time; after the last tick remove every remaining patient
//! ```
//!
//! A tick cannot fail. Every coordination problem (invalid bids, refused
//! allocations, requests nobody can serve) is absorbed, logged and counted.
//!
//! # Example
//!
//! ```rust
//! use care_allocation_core_rs::{Orchestrator, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     num_ticks: 10,
//!     num_hospitals: 3,
//!     num_patients: 12,
//!     ..Default::default()
//! };
//!
//! let mut orchestrator = Orchestrator::new(config).unwrap();
//! while !orchestrator.is_finished() {
//!     let result = orchestrator.tick();
//!     assert!((0.0..=1.0).contains(&result.efficiency));
//! }
//! assert_eq!(orchestrator.metrics().len(), 10);
//! assert_eq!(orchestrator.state().num_patients(), 0);
//! ```

use crate::arrivals::PatientGenerator;
use crate::coordinator::{CoordinationError, MetricsSeries, ResourceCoordinator};
use crate::core::time::TimeManager;
use crate::models::event::{Event, EventLog, RemovalReason};
use crate::models::hospital::{CareProvider, Hospital};
use crate::models::patient::Patient;
use crate::models::resource::ResourceType;
use crate::models::state::SimulationState;
use crate::orchestrator::config::SimulationConfig;
use crate::orchestrator::snapshot::{HospitalSnapshot, PatientSnapshot, TickSnapshot};
use crate::rng::RngManager;
use thiserror::Error;

/// Errors at the orchestrator boundary (construction and setup only)
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Hospital not found: {0}")]
    HospitalNotFound(String),

    #[error("Patient already exists: {0}")]
    DuplicatePatient(String),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    /// Tick number
    pub tick: usize,

    /// New patients this tick
    pub num_arrivals: usize,

    pub num_escalations: usize,

    /// Requests collected this tick
    pub num_requests: usize,

    /// Committed allocations this tick
    pub num_allocations: usize,

    /// Requests deferred to the next tick
    pub num_unmet: usize,

    pub num_transfers: usize,

    /// Patients discharged as recovered
    pub num_discharged: usize,

    pub efficiency: f64,

    pub unmet_need: i64,

    /// True once the horizon has been reached
    pub finished: bool,
}

/// Main orchestrator managing simulation state and tick loop
///
/// # Determinism
///
/// All randomness is via `rng_manager` with seeded xorshift64*.
/// Same seed + same config = identical results (deterministic replay).
pub struct Orchestrator {
    config: SimulationConfig,

    /// Active patients
    state: SimulationState,

    time_manager: TimeManager,

    rng_manager: RngManager,

    patient_generator: PatientGenerator,

    /// Hospital registry, pending requests and metrics
    coordinator: ResourceCoordinator,

    event_log: EventLog,

    snapshots: Vec<TickSnapshot>,
}

impl Orchestrator {
    /// Create a simulation with generated hospitals and an initial cohort
    ///
    /// Hospitals are named `H01`, `H02`, ..., each stocked at
    /// `initial_resources` with one random specialization and a random grid
    /// position. Hospitals are generated before patients, so changing
    /// `num_patients` does not move the hospitals.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut rng = RngManager::new(config.rng_seed);
        let mut hospitals: Vec<Box<dyn CareProvider>> = Vec::with_capacity(config.num_hospitals);
        for i in 0..config.num_hospitals {
            let specialization = ResourceType::ALL[rng.range(0, ResourceType::COUNT as i64) as usize];
            let position = config.grid.random_position(&mut rng);
            hospitals.push(Box::new(
                Hospital::new(format!("H{:02}", i + 1), config.initial_resources, [specialization])
                    .at(position),
            ));
        }

        let mut generator = PatientGenerator::new(config.arrivals.clone());
        let patients = generator.spawn_cohort(config.num_patients, &config.grid, &mut rng);

        Self::assemble(config, rng, generator, hospitals, patients)
    }

    /// Create a simulation from explicitly built hospitals and patients
    ///
    /// Used for hand-built scenarios; `num_hospitals`, `num_patients` and
    /// `initial_resources` are ignored.
    pub fn with_agents(
        config: SimulationConfig,
        hospitals: Vec<Box<dyn CareProvider>>,
        patients: Vec<Patient>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let rng = RngManager::new(config.rng_seed);
        let generator = PatientGenerator::new(config.arrivals.clone());
        Self::assemble(config, rng, generator, hospitals, patients)
    }

    fn assemble(
        config: SimulationConfig,
        rng_manager: RngManager,
        patient_generator: PatientGenerator,
        hospitals: Vec<Box<dyn CareProvider>>,
        patients: Vec<Patient>,
    ) -> Result<Self, SimulationError> {
        let mut orchestrator = Self {
            time_manager: TimeManager::new(config.num_ticks),
            coordinator: ResourceCoordinator::new(config.coordinator.clone()),
            state: SimulationState::default(),
            rng_manager,
            patient_generator,
            event_log: EventLog::new(),
            snapshots: Vec::new(),
            config,
        };

        for hospital in hospitals {
            orchestrator.register_hospital(hospital)?;
        }
        for patient in patients {
            orchestrator.admit_patient(patient)?;
        }

        tracing::info!(
            hospitals = orchestrator.coordinator.num_hospitals(),
            patients = orchestrator.state.num_patients(),
            ticks = orchestrator.config.num_ticks,
            seed = orchestrator.config.rng_seed,
            "simulation initialized"
        );
        Ok(orchestrator)
    }

    /// Add a hospital to the registry
    pub fn register_hospital(&mut self, hospital: Box<dyn CareProvider>) -> Result<(), SimulationError> {
        self.coordinator.register_hospital(hospital)?;
        Ok(())
    }

    /// Add a patient to the active set at the current tick
    pub fn admit_patient(&mut self, patient: Patient) -> Result<(), SimulationError> {
        if self.state.contains_patient(patient.id()) {
            return Err(SimulationError::DuplicatePatient(patient.id().to_string()));
        }
        self.event_log.log(Event::PatientArrived {
            tick: self.time_manager.current_tick(),
            patient_id: patient.id().to_string(),
            severity: patient.severity(),
        });
        self.state.add_patient(patient);
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn current_tick(&self) -> usize {
        self.time_manager.current_tick()
    }

    pub fn is_finished(&self) -> bool {
        self.time_manager.is_finished()
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn coordinator(&self) -> &ResourceCoordinator {
        &self.coordinator
    }

    pub fn hospital(&self, id: &str) -> Result<&dyn CareProvider, SimulationError> {
        self.coordinator
            .hospital(id)
            .ok_or_else(|| SimulationError::HospitalNotFound(id.to_string()))
    }

    pub fn metrics(&self) -> &MetricsSeries {
        self.coordinator.metrics()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn snapshots(&self) -> &[TickSnapshot] {
        &self.snapshots
    }

    pub fn latest_snapshot(&self) -> Option<&TickSnapshot> {
        self.snapshots.last()
    }

    /// RNG state, for replay checks
    pub fn rng_state(&self) -> u64 {
        self.rng_manager.get_state()
    }

    // ========================================================================
    // Tick loop
    // ========================================================================

    /// Execute one simulation tick
    ///
    /// Once the horizon is reached this does nothing and reports
    /// `finished: true`.
    pub fn tick(&mut self) -> TickResult {
        let tick = self.time_manager.current_tick();
        if self.time_manager.is_finished() {
            tracing::debug!(tick, "tick requested after simulation end");
            return TickResult {
                tick,
                num_arrivals: 0,
                num_escalations: 0,
                num_requests: 0,
                num_allocations: 0,
                num_unmet: 0,
                num_transfers: 0,
                num_discharged: 0,
                efficiency: 1.0,
                unmet_need: self.state.total_unmet_need(),
                finished: true,
            };
        }

        let events_start = self.event_log.len();

        // STEP 1: ARRIVALS
        let arrivals = self
            .patient_generator
            .generate_arrivals(&self.config.grid, &mut self.rng_manager);
        let num_arrivals = arrivals.len();
        for patient in arrivals {
            // Generator IDs are unique by construction
            if let Err(err) = self.admit_patient(patient) {
                tracing::warn!(tick, error = %err, "dropping arrival");
            }
        }

        // STEP 2: NEED GROWTH
        let mut num_escalations = 0;
        for patient in self.state.patients_mut() {
            let update = patient.generate_need(
                tick,
                &self.config.need_growth,
                self.config.severity_escalation_threshold,
                &mut self.rng_manager,
            );
            if let Some((from, to)) = update.escalated {
                num_escalations += 1;
                self.event_log.log(Event::SeverityEscalated {
                    tick,
                    patient_id: patient.id().to_string(),
                    from,
                    to,
                });
            }
        }

        // STEP 3: COORDINATOR STAGES
        let outcome = self
            .coordinator
            .run_tick(&mut self.state, tick, &mut self.rng_manager, &mut self.event_log);

        // STEP 4: DISCHARGE
        let recovered: Vec<String> = self
            .state
            .patients()
            .filter(|p| p.is_ready_for_discharge(self.config.discharge_grace_ticks))
            .map(|p| p.id().to_string())
            .collect();
        let num_discharged = recovered.len();
        for patient_id in recovered {
            self.remove_patient(&patient_id, tick, RemovalReason::Recovered);
        }

        let metrics = &outcome.metrics;
        tracing::info!(
            tick,
            arrivals = num_arrivals,
            requests = metrics.requests,
            allocations = metrics.allocations,
            unmet = metrics.unmet_requests,
            transfers = metrics.transfers,
            discharged = num_discharged,
            efficiency = metrics.efficiency,
            unmet_need = metrics.unmet_need,
            "tick complete"
        );

        // STEP 5: SNAPSHOT
        if self.config.collect_snapshots {
            let snapshot = self.capture_snapshot(tick, metrics.efficiency, metrics.unmet_need, events_start);
            self.snapshots.push(snapshot);
        }

        // STEP 6: ADVANCE TIME
        self.time_manager.advance_tick();
        if self.time_manager.is_finished() {
            self.end_simulation(tick);
        }

        TickResult {
            tick,
            num_arrivals,
            num_escalations,
            num_requests: metrics.requests,
            num_allocations: metrics.allocations,
            num_unmet: metrics.unmet_requests,
            num_transfers: metrics.transfers,
            num_discharged,
            efficiency: metrics.efficiency,
            unmet_need: metrics.unmet_need,
            finished: self.time_manager.is_finished(),
        }
    }

    /// Run up to `ticks` ticks, stopping early at the horizon
    pub fn run(&mut self, ticks: usize) -> Vec<TickResult> {
        let mut results = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            if self.is_finished() {
                break;
            }
            results.push(self.tick());
        }
        results
    }

    fn remove_patient(&mut self, patient_id: &str, tick: usize, reason: RemovalReason) {
        if self.state.remove_patient(patient_id).is_none() {
            return;
        }
        self.coordinator.discharge_patient(patient_id);
        self.event_log.log(Event::PatientRemoved {
            tick,
            patient_id: patient_id.to_string(),
            reason,
        });
    }

    fn end_simulation(&mut self, tick: usize) {
        let remaining = self.state.patient_ids();
        tracing::info!(
            tick,
            remaining = remaining.len(),
            overall_efficiency = self.coordinator.metrics().overall_efficiency(),
            "simulation finished"
        );
        for patient_id in remaining {
            self.remove_patient(&patient_id, tick, RemovalReason::SimulationEnd);
        }
    }

    fn capture_snapshot(
        &self,
        tick: usize,
        efficiency: f64,
        unmet_need: i64,
        events_start: usize,
    ) -> TickSnapshot {
        TickSnapshot {
            tick,
            hospitals: self
                .coordinator
                .hospitals()
                .iter()
                .map(|h| HospitalSnapshot::from(h.as_ref()))
                .collect(),
            patients: self.state.patients().map(PatientSnapshot::from).collect(),
            efficiency,
            unmet_need,
            events: self.event_log.since(events_start).to_vec(),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("current_tick", &self.current_tick())
            .field("num_patients", &self.state.num_patients())
            .field("coordinator", &self.coordinator)
            .field("event_count", &self.event_log.len())
            .finish()
    }
}

/// Build an orchestrator from `config` and run `ticks` ticks
///
/// ```rust
/// use care_allocation_core_rs::orchestrator::run_simulation;
/// use care_allocation_core_rs::SimulationConfig;
///
/// let orchestrator = run_simulation(SimulationConfig::default(), 5).unwrap();
/// assert_eq!(orchestrator.current_tick(), 5);
/// ```
pub fn run_simulation(config: SimulationConfig, ticks: usize) -> Result<Orchestrator, SimulationError> {
    let mut orchestrator = Orchestrator::new(config)?;
    orchestrator.run(ticks);
    Ok(orchestrator)
}
