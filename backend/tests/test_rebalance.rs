//! Rebalancing through the coordinator tick
//!
//! A specialist with little stock carries a backlog; a large generalist
//! with surplus sends it a bounded transfer after replenishment.

use care_allocation_core_rs::coordinator::{CoordinatorConfig, RebalanceConfig, ResourceCoordinator};
use care_allocation_core_rs::models::{EventLog, ReplenishConfig};
use care_allocation_core_rs::{
    CareProvider, Hospital, Patient, ResourceType, ResourceVector, RngManager, ScoringWeights,
    Severity, SimulationState,
};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness (`RUST_LOG` overrides the level)
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

fn beds(n: i64) -> ResourceVector {
    ResourceVector::from_pairs(&[(ResourceType::Beds, n)])
}

/// Score purely on specialization so the generalist never clears the threshold
fn specialist_only() -> CoordinatorConfig {
    CoordinatorConfig {
        scoring: ScoringWeights {
            specialization: 1.0,
            availability: 0.0,
            efficiency: 0.0,
            ..Default::default()
        },
        replenish: ReplenishConfig {
            rate_fraction: 0.0,
            jitter: 0,
        },
        ..Default::default()
    }
}

fn setup(config: CoordinatorConfig, generalist_stock: i64) -> (ResourceCoordinator, SimulationState) {
    let mut coordinator = ResourceCoordinator::new(config);
    coordinator
        .register_hospital(Box::new(
            Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]).with_available(beds(1)),
        ))
        .unwrap();
    coordinator
        .register_hospital(Box::new(
            Hospital::new("H02".to_string(), beds(100), []).with_available(beds(generalist_stock)),
        ))
        .unwrap();

    let state = SimulationState::new(vec![Patient::new("P0001".to_string(), Severity::High).with_need(beds(5))]);
    (coordinator, state)
}

fn total_available(coordinator: &ResourceCoordinator) -> i64 {
    coordinator.hospitals().iter().map(|h| h.available().total()).sum()
}

#[test]
fn test_backlogged_hospital_receives_transfer() {
    init_tracing();
    let (mut coordinator, mut state) = setup(specialist_only(), 100);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);

    // H01 grants its single bed, leaving a backlog of 4
    assert_eq!(outcome.commands[0].hospital_id, "H01");
    assert_eq!(outcome.commands[0].granted, beds(1));

    assert_eq!(outcome.transfers.len(), 1);
    let transfer = &outcome.transfers[0];
    assert_eq!(transfer.from_hospital, "H02");
    assert_eq!(transfer.to_hospital, "H01");
    assert_eq!(transfer.amount, 4);
    assert_eq!(outcome.metrics.transferred, 4);

    assert_eq!(coordinator.hospital("H01").unwrap().available(), &beds(4));
    assert_eq!(coordinator.hospital("H02").unwrap().available(), &beds(96));
    assert_eq!(log.events_of_type("ResourceTransfer").len(), 1);

    // Next tick the specialist can serve the rest
    let next = coordinator.run_tick(&mut state, 1, &mut rng, &mut log);
    assert_eq!(next.commands[0].granted, beds(4));
    assert!(state.get_patient("P0001").unwrap().need().is_zero());
}

#[test]
fn test_transfers_conserve_stock_and_respect_floor() {
    init_tracing();
    let config = CoordinatorConfig {
        rebalance: RebalanceConfig {
            reserve_floor_fraction: 0.5,
            transfer_fraction: 1.0,
            enabled: true,
        },
        ..specialist_only()
    };
    let (mut coordinator, mut state) = setup(config, 52);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let before = total_available(&coordinator);
    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);

    // One bed left with the patient; the rest only moved between hospitals
    assert_eq!(total_available(&coordinator), before - 1);
    // H02 keeps its 50-bed floor, so only 2 of the 4 backlog beds move
    assert_eq!(outcome.transfers[0].amount, 2);
    assert_eq!(coordinator.hospital("H02").unwrap().available(), &beds(50));
    assert_eq!(coordinator.hospital("H01").unwrap().available(), &beds(2));
}

#[test]
fn test_disabled_rebalancing_moves_nothing() {
    let config = CoordinatorConfig {
        rebalance: RebalanceConfig {
            enabled: false,
            ..Default::default()
        },
        ..specialist_only()
    };
    let (mut coordinator, mut state) = setup(config, 100);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
    assert!(outcome.transfers.is_empty());
    assert_eq!(coordinator.hospital("H01").unwrap().available(), &ResourceVector::zero());
}

#[test]
fn test_rebalancing_never_touches_admissions() {
    let (mut coordinator, mut state) = setup(specialist_only(), 100);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
    assert!(coordinator.hospital("H01").unwrap().admitted().contains("P0001"));
    assert!(coordinator.hospital("H02").unwrap().admitted().is_empty());
}
