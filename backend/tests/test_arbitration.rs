//! Arbitration scenarios
//!
//! Drives the coordinator directly with hand-built hospitals and patients
//! (no need growth), so every number here can be worked out by hand.

use care_allocation_core_rs::coordinator::{CoordinatorConfig, ResourceCoordinator};
use care_allocation_core_rs::models::{
    BidResponse, Event, EventLog, GridPosition, ReplenishConfig, Request, UnmetReason,
};
use care_allocation_core_rs::{
    AllocationError, CareProvider, Hospital, Patient, ResourceType, ResourceVector, RngManager,
    ScoringWeights, Severity, SimulationState,
};
use std::collections::BTreeSet;
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

fn no_restock() -> CoordinatorConfig {
    CoordinatorConfig {
        replenish: ReplenishConfig {
            rate_fraction: 0.0,
            jitter: 0,
        },
        ..Default::default()
    }
}

fn coordinator(config: CoordinatorConfig, hospitals: Vec<Box<dyn CareProvider>>) -> ResourceCoordinator {
    let mut coordinator = ResourceCoordinator::new(config);
    for hospital in hospitals {
        coordinator.register_hospital(hospital).unwrap();
    }
    coordinator
}

/// How a misbehaving provider breaks its contract
#[derive(Debug, Clone, Copy)]
enum Misbehavior {
    ScoreAboveOne,
    NanScore,
    OfferAboveNeed,
    WrongId,
    RefuseEveryAllocation,
}

/// Wraps a real hospital and corrupts one operation
#[derive(Debug)]
struct FaultyHospital {
    inner: Hospital,
    misbehavior: Misbehavior,
}

impl FaultyHospital {
    fn boxed(inner: Hospital, misbehavior: Misbehavior) -> Box<dyn CareProvider> {
        Box::new(Self { inner, misbehavior })
    }
}

impl CareProvider for FaultyHospital {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn position(&self) -> GridPosition {
        self.inner.position()
    }

    fn specializations(&self) -> &BTreeSet<ResourceType> {
        self.inner.specializations()
    }

    fn capacity(&self) -> &ResourceVector {
        self.inner.capacity()
    }

    fn available(&self) -> &ResourceVector {
        self.inner.available()
    }

    fn admitted(&self) -> &BTreeSet<String> {
        self.inner.admitted()
    }

    fn bid(&self, request: &Request, weights: &ScoringWeights) -> BidResponse {
        let mut bid = self.inner.bid(request, weights);
        match self.misbehavior {
            Misbehavior::ScoreAboveOne => bid.score = 1.5,
            Misbehavior::NanScore => bid.score = f64::NAN,
            Misbehavior::OfferAboveNeed => bid.offer = request.need.saturating_add(&beds(1)),
            Misbehavior::WrongId => bid.hospital_id = "H99".to_string(),
            Misbehavior::RefuseEveryAllocation => bid.score = 1.0,
        }
        bid
    }

    fn allocate(&mut self, patient_id: &str, quantity: &ResourceVector) -> Result<ResourceVector, AllocationError> {
        if let Misbehavior::RefuseEveryAllocation = self.misbehavior {
            return Err(AllocationError::InsufficientResource {
                resource: ResourceType::Beds,
                requested: quantity.get(ResourceType::Beds),
                available: 0,
            });
        }
        self.inner.allocate(patient_id, quantity)
    }

    fn replenish(&mut self, tick: usize, config: &ReplenishConfig, rng: &mut RngManager) -> ResourceVector {
        self.inner.replenish(tick, config, rng)
    }

    fn release_surplus(&mut self, resource: ResourceType, amount: i64, reserve_floor: i64) -> i64 {
        self.inner.release_surplus(resource, amount, reserve_floor)
    }

    fn accept_transfer(&mut self, resource: ResourceType, amount: i64) -> i64 {
        self.inner.accept_transfer(resource, amount)
    }

    fn discharge(&mut self, patient_id: &str) -> bool {
        self.inner.discharge(patient_id)
    }
}

#[test]
fn test_scarce_beds_scenario() {
    init_tracing();
    // One hospital, capacity {Beds: 10}, available {Beds: 2}
    let hospital = Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]).with_available(beds(2));
    let mut coordinator = coordinator(CoordinatorConfig::default(), vec![Box::new(hospital)]);
    let mut state = SimulationState::new(vec![
        Patient::new("P0001".to_string(), Severity::Medium).with_need(beds(3)),
        Patient::new("P0002".to_string(), Severity::High).with_need(beds(5)),
    ]);
    let mut rng = RngManager::new(42);
    let mut log = EventLog::new();

    let unmet_before = state.total_unmet_need();
    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);

    // High request is served first, offer capped at 2
    assert_eq!(outcome.commands.len(), 1);
    assert_eq!(outcome.commands[0].patient_id, "P0002");
    assert_eq!(outcome.commands[0].granted, beds(2));
    assert_eq!(state.get_patient("P0002").unwrap().need(), &beds(3));

    // Medium request is unmet this tick
    let unmet = log.events_of_type("RequestUnmet");
    assert_eq!(unmet.len(), 1);
    assert_eq!(unmet[0].patient_id(), Some("P0001"));
    assert_eq!(state.get_patient("P0001").unwrap().need(), &beds(3));

    assert_eq!(outcome.metrics.requested, 8);
    assert_eq!(outcome.metrics.allocated, 2);
    assert_eq!(outcome.metrics.efficiency, 0.25);
    assert_eq!(outcome.metrics.unmet_need, 6);
    assert!(outcome.metrics.unmet_need >= 3);
    assert_eq!(unmet_before - outcome.metrics.unmet_need, 2);
    assert_eq!(outcome.metrics.invalid_bids, 0);
}

#[test]
fn test_idle_tick_is_fully_efficient() {
    let capacity = ResourceVector::uniform(20);
    let hospital = Hospital::new("H01".to_string(), capacity, [ResourceType::Staff]);
    let mut coordinator = coordinator(CoordinatorConfig::default(), vec![Box::new(hospital)]);
    let mut state = SimulationState::new(vec![Patient::new("P0001".to_string(), Severity::Low)]);
    let mut rng = RngManager::new(42);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
    assert_eq!(outcome.metrics.efficiency, 1.0);
    assert_eq!(outcome.metrics.requests, 0);
    assert_eq!(outcome.metrics.unmet_need, 0);
    assert!(outcome.commands.is_empty());
    assert!(outcome.transfers.is_empty());
    assert!(outcome.replenished.is_zero());
    assert_eq!(coordinator.hospitals()[0].available(), &capacity);
    assert!(log.is_empty());
}

#[test]
fn test_high_severity_served_before_low() {
    let hospital = Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]).with_available(beds(5));
    let mut coordinator = coordinator(no_restock(), vec![Box::new(hospital)]);
    // "A-low" sorts first by ID; severity must still win
    let mut state = SimulationState::new(vec![
        Patient::new("A-low".to_string(), Severity::Low).with_need(beds(5)),
        Patient::new("B-high".to_string(), Severity::High).with_need(beds(5)),
    ]);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
    assert_eq!(outcome.commands.len(), 1);
    assert_eq!(outcome.commands[0].patient_id, "B-high");
    assert!(state.get_patient("B-high").unwrap().need().is_zero());
    assert_eq!(state.get_patient("A-low").unwrap().need(), &beds(5));
}

#[test]
fn test_aged_low_request_beats_new_high_request() {
    let hospital = Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]).with_available(beds(5));
    let mut coordinator = coordinator(no_restock(), vec![Box::new(hospital)]);
    let mut state = SimulationState::new(vec![
        Patient::new("P-old".to_string(), Severity::Low)
            .with_need(beds(5))
            .with_wait_ticks(9),
        Patient::new("P-new".to_string(), Severity::High).with_need(beds(5)),
    ]);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
    assert_eq!(outcome.commands[0].patient_id, "P-old");
    assert_eq!(state.get_patient("P-old").unwrap().wait_ticks(), 0);
    assert_eq!(state.get_patient("P-new").unwrap().wait_ticks(), 1);
}

#[test]
fn test_starvation_resolves_over_ticks() {
    // Capacity for one request per tick; a stream of High requests keeps arriving
    let hospital = Hospital::new("H01".to_string(), beds(4), [ResourceType::Beds]);
    let config = CoordinatorConfig {
        replenish: ReplenishConfig {
            rate_fraction: 1.0,
            jitter: 0,
        },
        ..Default::default()
    };
    let mut coordinator = coordinator(config, vec![Box::new(hospital)]);
    let mut state = SimulationState::new(vec![Patient::new("P-low".to_string(), Severity::Low).with_need(beds(4))]);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let mut served_at = None;
    for tick in 0..20 {
        state.add_patient(Patient::new(format!("P-high-{:02}", tick), Severity::High).with_need(beds(4)));
        let outcome = coordinator.run_tick(&mut state, tick, &mut rng, &mut log);
        if outcome.commands.iter().any(|c| c.patient_id == "P-low") {
            served_at = Some(tick);
            break;
        }
    }

    // Aged once wait exceeds 8, i.e. at its tenth request
    assert_eq!(served_at, Some(9));
}

#[test]
fn test_equal_scores_prefer_registration_order() {
    let first = Hospital::new("H02".to_string(), beds(10), [ResourceType::Beds]);
    let second = Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]);
    let mut coordinator = coordinator(no_restock(), vec![Box::new(first), Box::new(second)]);
    let mut state = SimulationState::new(vec![Patient::new("P0001".to_string(), Severity::Low).with_need(beds(1))]);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
    assert_eq!(outcome.commands[0].hospital_id, "H02");
}

#[test]
fn test_below_threshold_is_no_eligible_hospital() {
    let config = CoordinatorConfig {
        eligibility_threshold: 0.95,
        ..no_restock()
    };
    let hospital = Hospital::new("H01".to_string(), beds(10), []);
    let mut coordinator = coordinator(config, vec![Box::new(hospital)]);
    let mut state = SimulationState::new(vec![Patient::new("P0001".to_string(), Severity::High).with_need(beds(1))]);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
    assert!(outcome.commands.is_empty());
    assert_eq!(outcome.metrics.unmet_requests, 1);
    assert!(matches!(
        log.events_of_type("RequestUnmet")[0],
        Event::RequestUnmet {
            reason: UnmetReason::NoEligibleHospital,
            ..
        }
    ));
    assert_eq!(coordinator.deferred_requests()[0].patient_id, "P0001");
}

#[test]
fn test_score_equal_to_threshold_is_not_eligible() {
    // A specialist scores exactly 1.0 on specialization alone
    let weights = ScoringWeights {
        specialization: 1.0,
        availability: 0.0,
        efficiency: 0.0,
        ..Default::default()
    };
    let config = CoordinatorConfig {
        eligibility_threshold: 1.0,
        scoring: weights.clone(),
        ..no_restock()
    };
    let hospital = Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]);
    let request = Request {
        patient_id: "P0001".to_string(),
        severity: Severity::High,
        need: beds(1),
        wait_ticks: 0,
    };
    assert_eq!(hospital.bid(&request, &weights).score, 1.0);

    let mut coordinator = coordinator(config, vec![Box::new(hospital)]);
    let mut state = SimulationState::new(vec![Patient::new("P0001".to_string(), Severity::High).with_need(beds(1))]);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
    assert!(outcome.commands.is_empty());
    assert_eq!(outcome.metrics.unmet_requests, 1);
    assert_eq!(state.get_patient("P0001").unwrap().need(), &beds(1));
}

#[test]
fn test_invalid_bids_are_discarded_and_logged() {
    init_tracing();
    for misbehavior in [
        Misbehavior::ScoreAboveOne,
        Misbehavior::NanScore,
        Misbehavior::OfferAboveNeed,
        Misbehavior::WrongId,
    ] {
        let rogue = FaultyHospital::boxed(
            Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]),
            misbehavior,
        );
        let honest = Box::new(Hospital::new("H02".to_string(), beds(10), []));
        let mut coordinator = coordinator(no_restock(), vec![rogue, honest]);
        let mut state =
            SimulationState::new(vec![Patient::new("P0001".to_string(), Severity::High).with_need(beds(3))]);
        let mut rng = RngManager::new(1);
        let mut log = EventLog::new();

        let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);

        assert_eq!(outcome.metrics.invalid_bids, 1, "{:?}", misbehavior);
        assert_eq!(outcome.commands.len(), 1, "{:?}", misbehavior);
        assert_eq!(outcome.commands[0].hospital_id, "H02", "{:?}", misbehavior);
        assert_eq!(log.events_of_type("InvalidBid").len(), 1);
        assert!(log.events_for_hospital("H01").iter().all(|e| e.event_type() == "InvalidBid"));
        assert_eq!(coordinator.hospitals()[0].available(), &beds(10));
    }
}

#[test]
fn test_refused_allocation_falls_back_to_next_hospital() {
    init_tracing();
    let refuser = FaultyHospital::boxed(
        Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]),
        Misbehavior::RefuseEveryAllocation,
    );
    let fallback = Box::new(Hospital::new("H02".to_string(), beds(10), []));
    let mut coordinator = coordinator(no_restock(), vec![refuser, fallback]);
    let mut state = SimulationState::new(vec![Patient::new("P0001".to_string(), Severity::High).with_need(beds(3))]);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);

    assert_eq!(outcome.metrics.retries, 1);
    assert_eq!(outcome.commands[0].hospital_id, "H02");
    assert_eq!(log.events_of_type("AllocationRetry").len(), 1);
    assert_eq!(coordinator.hospitals()[1].available(), &beds(7));
    assert!(state.get_patient("P0001").unwrap().need().is_zero());
}

#[test]
fn test_all_refusals_leave_request_unmet() {
    init_tracing();
    let refuser = FaultyHospital::boxed(
        Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]),
        Misbehavior::RefuseEveryAllocation,
    );
    let mut coordinator = coordinator(no_restock(), vec![refuser]);
    let mut state = SimulationState::new(vec![Patient::new("P0001".to_string(), Severity::High).with_need(beds(3))]);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);

    assert!(outcome.commands.is_empty());
    assert_eq!(outcome.metrics.unmet_requests, 1);
    assert!(matches!(
        log.events_of_type("RequestUnmet")[0],
        Event::RequestUnmet {
            reason: UnmetReason::HospitalsExhausted,
            ..
        }
    ));
}

#[test]
fn test_later_request_cannot_double_book_stock() {
    // Both patients see the same 6 beds in their bids; only one commit fits
    let hospital = Hospital::new("H01".to_string(), beds(10), [ResourceType::Beds]).with_available(beds(6));
    let mut coordinator = coordinator(no_restock(), vec![Box::new(hospital)]);
    let mut state = SimulationState::new(vec![
        Patient::new("P0001".to_string(), Severity::High).with_need(beds(6)),
        Patient::new("P0002".to_string(), Severity::High).with_need(beds(6)),
    ]);
    let mut rng = RngManager::new(1);
    let mut log = EventLog::new();

    let outcome = coordinator.run_tick(&mut state, 0, &mut rng, &mut log);
    let granted: i64 = outcome.commands.iter().map(|c| c.granted.total()).sum();
    assert_eq!(granted, 6);
    assert!(coordinator.hospitals()[0].available().is_zero());
}
