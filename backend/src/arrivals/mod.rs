//! Patient arrival generation.
//!
//! Creates the initial cohort at simulation start and, optionally, new
//! patients on later ticks. All generation is deterministic given the RNG.
//!
//! # Key Principles
//!
//! 1. **Determinism**: Same seed + same config → same patients, same IDs
//! 2. **Poisson Arrivals**: New patients per tick follow a Poisson distribution
//! 3. **Weighted Severity**: Severity tier drawn from configurable weights
//!
//! # Example
//!
//! ```
//! use care_allocation_core_rs::arrivals::{ArrivalConfig, PatientGenerator, SeverityWeights};
//! use care_allocation_core_rs::models::Grid;
//! use care_allocation_core_rs::rng::RngManager;
//!
//! let mut rng = RngManager::new(42);
//! let mut generator = PatientGenerator::new(ArrivalConfig {
//!     rate_per_tick: 0.0,
//!     severity_weights: SeverityWeights::default(),
//! });
//!
//! let cohort = generator.spawn_cohort(3, &Grid::default(), &mut rng);
//! assert_eq!(cohort[0].id(), "P0001");
//! assert_eq!(cohort.len(), 3);
//! ```

use crate::models::grid::Grid;
use crate::models::patient::{Patient, Severity};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Relative likelihood of each severity tier for new patients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    #[serde(default = "default_weight")]
    pub low: f64,

    #[serde(default = "default_weight")]
    pub medium: f64,

    #[serde(default = "default_weight")]
    pub high: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            low: 1.0,
            medium: 1.0,
            high: 1.0,
        }
    }
}

impl SeverityWeights {
    fn as_slice(&self) -> [f64; 3] {
        [self.low, self.medium, self.high]
    }

    /// Draw a tier; degenerate weights fall back to Medium
    pub fn sample(&self, rng: &mut RngManager) -> Severity {
        match rng.weighted_index(&self.as_slice()) {
            Some(i) => Severity::ALL[i],
            None => Severity::Medium,
        }
    }
}

/// Arrival process for new patients after tick 0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrivalConfig {
    /// Expected number of new patients per tick (Poisson λ); 0 disables arrivals
    #[serde(default)]
    pub rate_per_tick: f64,

    #[serde(default)]
    pub severity_weights: SeverityWeights,
}

/// Creates patients with sequential IDs (`P0001`, `P0002`, ...)
#[derive(Debug, Clone)]
pub struct PatientGenerator {
    config: ArrivalConfig,
    next_patient_seq: usize,
}

impl PatientGenerator {
    pub fn new(config: ArrivalConfig) -> Self {
        Self {
            config,
            next_patient_seq: 1,
        }
    }

    pub fn config(&self) -> &ArrivalConfig {
        &self.config
    }

    fn next_id(&mut self) -> String {
        let id = format!("P{:04}", self.next_patient_seq);
        self.next_patient_seq += 1;
        id
    }

    /// Create one patient with a sampled severity and a random position
    pub fn spawn(&mut self, grid: &Grid, rng: &mut RngManager) -> Patient {
        let severity = self.config.severity_weights.sample(rng);
        let position = grid.random_position(rng);
        Patient::new(self.next_id(), severity).at(position)
    }

    /// Create the initial cohort
    pub fn spawn_cohort(&mut self, count: usize, grid: &Grid, rng: &mut RngManager) -> Vec<Patient> {
        (0..count).map(|_| self.spawn(grid, rng)).collect()
    }

    /// Sample this tick's arrivals
    pub fn generate_arrivals(&mut self, grid: &Grid, rng: &mut RngManager) -> Vec<Patient> {
        let count = rng.poisson(self.config.rate_per_tick) as usize;
        self.spawn_cohort(count, grid, rng)
    }
}
