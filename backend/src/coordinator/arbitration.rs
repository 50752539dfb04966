//! Request arbitration
//!
//! Serves one request at a time, in the order fixed by
//! [`order_requests`](crate::policy::order_requests):
//!
//! ```text
//! Request ──► bid() on every hospital
//!                 │
//!                 ├─ contract violated ──► InvalidBid (logged, discarded)
//!                 ▼
//!          valid bids, score > threshold, offer non-empty
//!                 │  (none) ──► NoEligibleHospital
//!                 ▼
//!          allocate() on best score
//!                 │  InsufficientResource ──► next best (AllocationRetry)
//!                 │  (all refused) ──► HospitalsExhausted
//!                 ▼
//!          receive_allocation() on patient, AllocationCommitted
//! ```
//!
//! # Critical Invariants
//!
//! - **No double allocation**: each commit goes through the hospital's own
//!   `allocate`, which re-checks availability at commit time
//! - **Offer bound**: a committed grant never exceeds the request's need
//! - **Failure isolation**: nothing here can abort the tick

use crate::coordinator::CoordinationError;
use crate::models::event::{Event, EventLog, UnmetReason};
use crate::models::hospital::CareProvider;
use crate::models::message::{AllocationCommand, BidResponse, Request};
use crate::models::patient::Patient;
use crate::models::resource::{ResourceType, ResourceVector};
use crate::models::state::SimulationState;
use crate::policy::ScoringWeights;
use std::collections::BTreeMap;
use thiserror::Error;

/// Ways a bid can break its contract
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BidRejection {
    #[error("score {score} outside [0, 1]")]
    ScoreOutOfRange { score: f64 },

    #[error("bid claims to come from {claimed}")]
    Misattributed { claimed: String },

    #[error("offer of {offered} {resource} exceeds available {available}")]
    OfferExceedsAvailable {
        resource: ResourceType,
        offered: i64,
        available: i64,
    },

    #[error("offer of {offered} {resource} exceeds need {needed}")]
    OfferExceedsNeed {
        resource: ResourceType,
        offered: i64,
        needed: i64,
    },
}

/// Check a bid against the provider that produced it and the request it answers.
///
/// Negative offers cannot occur: [`ResourceVector`] clamps at zero.
pub fn validate_bid(
    bid: &BidResponse,
    request: &Request,
    provider: &dyn CareProvider,
) -> Result<(), BidRejection> {
    if !(0.0..=1.0).contains(&bid.score) {
        return Err(BidRejection::ScoreOutOfRange { score: bid.score });
    }
    if bid.hospital_id != provider.id() {
        return Err(BidRejection::Misattributed {
            claimed: bid.hospital_id.clone(),
        });
    }
    if let Some((resource, offered, available)) = bid.offer.first_excess(provider.available()) {
        return Err(BidRejection::OfferExceedsAvailable {
            resource,
            offered,
            available,
        });
    }
    if let Some((resource, offered, needed)) = bid.offer.first_excess(&request.need) {
        return Err(BidRejection::OfferExceedsNeed {
            resource,
            offered,
            needed,
        });
    }
    Ok(())
}

/// A committed allocation plus how it was reached
#[derive(Debug, Clone, PartialEq)]
pub struct Commitment {
    pub command: AllocationCommand,
    pub score: f64,
    /// Hospitals that refused before this one accepted
    pub retries: usize,
}

/// Statistics from one arbitration pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArbitrationSummary {
    /// Committed allocations, in commit order
    pub commands: Vec<AllocationCommand>,

    /// Requests served this tick
    pub num_requests: usize,

    /// Total need magnitude over this tick's requests
    pub requested: i64,

    /// Total granted magnitude this tick
    pub allocated: i64,

    /// Requests deferred to the next tick
    pub unmet_requests: usize,

    pub invalid_bids: usize,

    /// Commit-time refusals that triggered a fallback
    pub retries: usize,

    /// Need left after this tick, attributed per hospital (drives rebalancing)
    pub backlog: BTreeMap<String, ResourceVector>,
}

impl ArbitrationSummary {
    fn add_backlog(&mut self, hospital_id: &str, remaining: &ResourceVector) {
        if remaining.is_zero() {
            return;
        }
        let entry = self
            .backlog
            .entry(hospital_id.to_string())
            .or_insert_with(ResourceVector::zero);
        *entry = entry.saturating_add(remaining);
    }
}

/// Arbitrate a single request against the registry and commit at most one allocation.
///
/// Returns the commitment, or `NoEligibleHospital` / `HospitalsExhausted`
/// when the request is deferred. Invalid bids and commit-time refusals are
/// logged and absorbed.
#[allow(clippy::too_many_arguments)]
pub fn arbitrate_request(
    registry: &mut [Box<dyn CareProvider>],
    patient: &mut Patient,
    request: &Request,
    weights: &ScoringWeights,
    eligibility_threshold: f64,
    tick: usize,
    log: &mut EventLog,
    summary: &mut ArbitrationSummary,
) -> Result<Commitment, CoordinationError> {
    // Collect valid bids as (registry index, bid)
    let mut valid: Vec<(usize, BidResponse)> = Vec::with_capacity(registry.len());
    for (index, provider) in registry.iter().enumerate() {
        let bid = provider.bid(request, weights);
        match validate_bid(&bid, request, provider.as_ref()) {
            Ok(()) => valid.push((index, bid)),
            Err(rejection) => {
                let err = CoordinationError::InvalidBid {
                    hospital_id: provider.id().to_string(),
                    rejection,
                };
                tracing::warn!(tick, patient = %request.patient_id, error = %err, "discarding bid");
                summary.invalid_bids += 1;
                log.log(Event::InvalidBid {
                    tick,
                    patient_id: request.patient_id.clone(),
                    hospital_id: provider.id().to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    // Stable sort keeps registry order among equal scores
    valid.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));
    let best_bidder = valid.first().map(|(i, _)| *i);

    let candidates: Vec<&(usize, BidResponse)> = valid
        .iter()
        .filter(|(_, bid)| bid.score > eligibility_threshold && !bid.offer.is_zero())
        .collect();

    if candidates.is_empty() {
        if let Some(index) = best_bidder {
            summary.add_backlog(registry[index].id(), &request.need);
        }
        return Err(CoordinationError::NoEligibleHospital {
            patient_id: request.patient_id.clone(),
        });
    }

    let mut retries = 0;
    for (index, bid) in candidates {
        let provider = &mut registry[*index];
        match provider.allocate(&request.patient_id, &bid.offer) {
            Ok(granted) => {
                patient.receive_allocation(&granted);
                summary.add_backlog(provider.id(), &request.need.saturating_sub(&granted));
                return Ok(Commitment {
                    command: AllocationCommand {
                        patient_id: request.patient_id.clone(),
                        hospital_id: provider.id().to_string(),
                        granted,
                    },
                    score: bid.score,
                    retries,
                });
            }
            Err(refusal) => {
                let err = CoordinationError::from(refusal);
                tracing::debug!(
                    tick,
                    patient = %request.patient_id,
                    hospital = %provider.id(),
                    error = %err,
                    "allocation refused, trying next hospital"
                );
                retries += 1;
                summary.retries += 1;
                log.log(Event::AllocationRetry {
                    tick,
                    patient_id: request.patient_id.clone(),
                    hospital_id: provider.id().to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    if let Some(index) = best_bidder {
        summary.add_backlog(registry[index].id(), &request.need);
    }
    Err(CoordinationError::HospitalsExhausted {
        patient_id: request.patient_id.clone(),
        attempts: retries,
    })
}

/// Serve every request in order, delivering grants to patients.
///
/// Requests whose patient is no longer active are skipped.
pub fn arbitrate_all(
    registry: &mut [Box<dyn CareProvider>],
    state: &mut SimulationState,
    requests: &[Request],
    weights: &ScoringWeights,
    eligibility_threshold: f64,
    tick: usize,
    log: &mut EventLog,
) -> (ArbitrationSummary, Vec<Request>) {
    let mut summary = ArbitrationSummary::default();
    let mut deferred = Vec::new();

    for request in requests {
        let Some(patient) = state.get_patient_mut(&request.patient_id) else {
            continue;
        };

        summary.num_requests += 1;
        summary.requested += request.need.total();

        match arbitrate_request(
            registry,
            patient,
            request,
            weights,
            eligibility_threshold,
            tick,
            log,
            &mut summary,
        ) {
            Ok(commitment) => {
                tracing::debug!(
                    tick,
                    patient = %commitment.command.patient_id,
                    hospital = %commitment.command.hospital_id,
                    granted = %commitment.command.granted,
                    score = commitment.score,
                    "allocation committed"
                );
                summary.allocated += commitment.command.granted.total();
                log.log(Event::AllocationCommitted {
                    tick,
                    patient_id: commitment.command.patient_id.clone(),
                    hospital_id: commitment.command.hospital_id.clone(),
                    granted: commitment.command.granted,
                    score: commitment.score,
                });
                summary.commands.push(commitment.command);
            }
            Err(err) => {
                let reason = err.unmet_reason().unwrap_or(UnmetReason::NoEligibleHospital);
                tracing::debug!(tick, patient = %request.patient_id, error = %err, "request deferred");
                summary.unmet_requests += 1;
                log.log(Event::RequestUnmet {
                    tick,
                    patient_id: request.patient_id.clone(),
                    reason,
                    remaining: *patient.need(),
                });
                deferred.push(request.clone());
            }
        }
    }

    (summary, deferred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::hospital::Hospital;
    use crate::models::patient::Severity;

    fn beds(n: i64) -> ResourceVector {
        ResourceVector::from_pairs(&[(ResourceType::Beds, n)])
    }

    fn request(need: ResourceVector) -> Request {
        Request {
            patient_id: "P1".to_string(),
            severity: Severity::Medium,
            need,
            wait_ticks: 0,
        }
    }

    #[test]
    fn test_validate_bid_accepts_own_bid() {
        let h = Hospital::new("H1".to_string(), beds(10), [ResourceType::Beds]);
        let req = request(beds(4));
        let bid = h.bid(&req, &ScoringWeights::default());
        assert_eq!(validate_bid(&bid, &req, &h), Ok(()));
    }

    #[test]
    fn test_validate_bid_rejections() {
        let h = Hospital::new("H1".to_string(), beds(10), []).with_available(beds(3));
        let req = request(beds(2));

        let nan = BidResponse {
            hospital_id: "H1".to_string(),
            score: f64::NAN,
            offer: beds(1),
        };
        assert!(matches!(
            validate_bid(&nan, &req, &h),
            Err(BidRejection::ScoreOutOfRange { .. })
        ));

        let forged = BidResponse {
            hospital_id: "H9".to_string(),
            score: 0.5,
            offer: beds(1),
        };
        assert!(matches!(
            validate_bid(&forged, &req, &h),
            Err(BidRejection::Misattributed { .. })
        ));

        let greedy = BidResponse {
            hospital_id: "H1".to_string(),
            score: 0.5,
            offer: beds(5),
        };
        assert_eq!(
            validate_bid(&greedy, &req, &h),
            Err(BidRejection::OfferExceedsAvailable {
                resource: ResourceType::Beds,
                offered: 5,
                available: 3,
            })
        );

        let generous = BidResponse {
            hospital_id: "H1".to_string(),
            score: 0.5,
            offer: beds(3),
        };
        assert!(matches!(
            validate_bid(&generous, &req, &h),
            Err(BidRejection::OfferExceedsNeed { .. })
        ));
    }

    #[test]
    fn test_zero_offer_is_not_eligible() {
        let mut registry: Vec<Box<dyn CareProvider>> = vec![Box::new(
            Hospital::new("H1".to_string(), beds(10), [ResourceType::Beds]).with_available(beds(0)),
        )];
        let mut patient = Patient::new("P1".to_string(), Severity::High).with_need(beds(2));
        let req = request(beds(2));
        let mut log = EventLog::new();
        let mut summary = ArbitrationSummary::default();

        let result = arbitrate_request(
            &mut registry,
            &mut patient,
            &req,
            &ScoringWeights::default(),
            0.0,
            0,
            &mut log,
            &mut summary,
        );
        assert!(matches!(result, Err(CoordinationError::NoEligibleHospital { .. })));
        assert_eq!(summary.backlog.get("H1"), Some(&beds(2)));
    }
}
