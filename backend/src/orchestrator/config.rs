//! Simulation configuration
//!
//! Every field has a serde default, so `{}` is a complete configuration.
//! Nothing here changes the structure of a tick, only its numbers.
//!
//! # Example
//!
//! ```rust
//! use care_allocation_core_rs::SimulationConfig;
//!
//! let config = SimulationConfig::from_json_str(r#"{"num_hospitals": 3, "rng_seed": 7}"#).unwrap();
//! assert_eq!(config.num_hospitals, 3);
//! assert_eq!(config.num_patients, 50);
//! assert_eq!(config.coordinator.eligibility_threshold, 0.5);
//! ```

use crate::arrivals::ArrivalConfig;
use crate::coordinator::CoordinatorConfig;
use crate::models::grid::Grid;
use crate::models::patient::NeedGrowthConfig;
use crate::models::resource::{ResourceType, ResourceVector, MAX_QUANTITY};
use crate::orchestrator::SimulationError;
use serde::{Deserialize, Serialize};

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for all randomness
    #[serde(default = "default_rng_seed")]
    pub rng_seed: u64,

    /// Simulation horizon; every remaining patient is removed after the last tick
    #[serde(default = "default_num_ticks")]
    pub num_ticks: usize,

    #[serde(default = "default_num_hospitals")]
    pub num_hospitals: usize,

    /// Size of the initial cohort
    #[serde(default = "default_num_patients")]
    pub num_patients: usize,

    /// Capacity (and starting stock) of every generated hospital
    #[serde(default = "default_initial_resources")]
    pub initial_resources: ResourceVector,

    #[serde(default)]
    pub grid: Grid,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub need_growth: NeedGrowthConfig,

    /// Ticks of unmet waiting per severity step (0 disables escalation)
    #[serde(default = "default_severity_escalation_threshold")]
    pub severity_escalation_threshold: usize,

    /// Consecutive zero-need ticks before a patient is discharged
    #[serde(default = "default_discharge_grace_ticks")]
    pub discharge_grace_ticks: usize,

    #[serde(default)]
    pub arrivals: ArrivalConfig,

    /// Keep a rendering snapshot for every tick
    #[serde(default = "default_collect_snapshots")]
    pub collect_snapshots: bool,
}

fn default_rng_seed() -> u64 {
    42
}

fn default_num_ticks() -> usize {
    100
}

fn default_num_hospitals() -> usize {
    5
}

fn default_num_patients() -> usize {
    50
}

fn default_initial_resources() -> ResourceVector {
    ResourceVector::from_pairs(&[
        (ResourceType::Beds, 50),
        (ResourceType::Medication, 200),
        (ResourceType::Staff, 40),
        (ResourceType::Equipment, 30),
    ])
}

fn default_severity_escalation_threshold() -> usize {
    5
}

fn default_discharge_grace_ticks() -> usize {
    3
}

fn default_collect_snapshots() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rng_seed: default_rng_seed(),
            num_ticks: default_num_ticks(),
            num_hospitals: default_num_hospitals(),
            num_patients: default_num_patients(),
            initial_resources: default_initial_resources(),
            grid: Grid::default(),
            coordinator: CoordinatorConfig::default(),
            need_growth: NeedGrowthConfig::default(),
            severity_escalation_threshold: default_severity_escalation_threshold(),
            discharge_grace_ticks: default_discharge_grace_ticks(),
            arrivals: ArrivalConfig::default(),
            collect_snapshots: default_collect_snapshots(),
        }
    }
}

fn check_fraction(name: &str, value: f64) -> Result<(), SimulationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimulationError::InvalidConfig(format!(
            "{} must be in [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_quantity(name: &str, value: i64) -> Result<(), SimulationError> {
    if !(0..=MAX_QUANTITY).contains(&value) {
        return Err(SimulationError::InvalidConfig(format!(
            "{} must be in [0, {}], got {}",
            name, MAX_QUANTITY, value
        )));
    }
    Ok(())
}

fn check_weight(name: &str, value: f64) -> Result<(), SimulationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationError::InvalidConfig(format!(
            "{} must be a non-negative finite number, got {}",
            name, value
        )));
    }
    Ok(())
}

impl SimulationConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, SimulationError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.num_ticks == 0 {
            return Err(SimulationError::InvalidConfig(
                "num_ticks must be positive".to_string(),
            ));
        }
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(SimulationError::InvalidConfig(
                "grid dimensions must be positive".to_string(),
            ));
        }
        if self.discharge_grace_ticks == 0 {
            return Err(SimulationError::InvalidConfig(
                "discharge_grace_ticks must be at least 1".to_string(),
            ));
        }

        let coordinator = &self.coordinator;
        check_fraction("eligibility_threshold", coordinator.eligibility_threshold)?;
        check_fraction("reserve_floor_fraction", coordinator.rebalance.reserve_floor_fraction)?;
        check_fraction("transfer_fraction", coordinator.rebalance.transfer_fraction)?;
        check_fraction("replenish rate_fraction", coordinator.replenish.rate_fraction)?;
        check_quantity("replenish jitter", coordinator.replenish.jitter)?;

        let scoring = &coordinator.scoring;
        check_weight("specialization weight", scoring.specialization)?;
        check_weight("availability weight", scoring.availability)?;
        check_weight("efficiency weight", scoring.efficiency)?;
        check_fraction("non_specialist_match", scoring.non_specialist_match)?;
        if scoring.specialization + scoring.availability + scoring.efficiency <= 0.0 {
            return Err(SimulationError::InvalidConfig(
                "scoring weights must not all be zero".to_string(),
            ));
        }

        check_fraction("onset_probability", self.need_growth.onset_probability)?;
        check_quantity("max_draw_low", self.need_growth.max_draw_low)?;
        check_quantity("max_draw_medium", self.need_growth.max_draw_medium)?;
        check_quantity("max_draw_high", self.need_growth.max_draw_high)?;

        for (resource, quantity) in self.initial_resources.iter() {
            check_quantity(&format!("initial {}", resource), quantity)?;
        }

        check_weight("arrival rate_per_tick", self.arrivals.rate_per_tick)?;
        let weights = &self.arrivals.severity_weights;
        check_weight("low severity weight", weights.low)?;
        check_weight("medium severity weight", weights.medium)?;
        check_weight("high severity weight", weights.high)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_yields_defaults() {
        let config = SimulationConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.initial_resources.get(ResourceType::Medication), 200);
    }

    #[test]
    fn test_nested_override() {
        let config = SimulationConfig::from_json_str(
            r#"{"coordinator": {"rebalance": {"reserve_floor_fraction": 0.5}}}"#,
        )
        .unwrap();
        assert_eq!(config.coordinator.rebalance.reserve_floor_fraction, 0.5);
        assert_eq!(config.coordinator.rebalance.transfer_fraction, 0.1);
        assert_eq!(config.coordinator.eligibility_threshold, 0.5);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = SimulationConfig::from_json_str(r#"{"coordinator": {"eligibility_threshold": 1.5}}"#)
            .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = SimulationConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, SimulationError::ConfigParse(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = SimulationConfig::default();
        config.num_hospitals = 2;
        config.arrivals.rate_per_tick = 0.5;
        let json = config.to_json_string().unwrap();
        assert_eq!(SimulationConfig::from_json_str(&json).unwrap(), config);
    }
}
