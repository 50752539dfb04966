//! Patient (demand agent) model
//!
//! A patient carries a severity tier and an outstanding need vector. Each
//! tick the patient:
//! 1. possibly escalates severity after prolonged unmet need,
//! 2. grows its need by a severity-scaled random draw,
//! 3. emits a [`Request`] if anything is outstanding.
//!
//! Need only shrinks through [`Patient::receive_allocation`], which the
//! coordinator calls when it commits an allocation. Hospitals never touch
//! patient state.

use crate::models::grid::GridPosition;
use crate::models::message::Request;
use crate::models::resource::{ResourceType, ResourceVector};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal urgency tier. `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// 0 for Low, 2 for High
    pub fn rank(self) -> u8 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
        }
    }

    /// One tier up, saturating at High
    pub fn escalated(self) -> Severity {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium | Severity::High => Severity::High,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

/// Stochastic need growth parameters
///
/// Each tick, for every resource type independently, the patient develops
/// new need with probability `onset_probability`; the amount is uniform in
/// `[0, max_draw(severity)]`. Expected growth per type is therefore
/// `onset_probability * max_draw / 2`, strictly increasing with severity
/// under the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeedGrowthConfig {
    #[serde(default = "default_onset_probability")]
    pub onset_probability: f64,

    #[serde(default = "default_max_draw_low")]
    pub max_draw_low: i64,

    #[serde(default = "default_max_draw_medium")]
    pub max_draw_medium: i64,

    #[serde(default = "default_max_draw_high")]
    pub max_draw_high: i64,
}

fn default_onset_probability() -> f64 {
    0.3
}

fn default_max_draw_low() -> i64 {
    2
}

fn default_max_draw_medium() -> i64 {
    5
}

fn default_max_draw_high() -> i64 {
    10
}

impl Default for NeedGrowthConfig {
    fn default() -> Self {
        Self {
            onset_probability: default_onset_probability(),
            max_draw_low: default_max_draw_low(),
            max_draw_medium: default_max_draw_medium(),
            max_draw_high: default_max_draw_high(),
        }
    }
}

impl NeedGrowthConfig {
    /// No growth at all; useful for hand-built scenarios
    pub fn disabled() -> Self {
        Self {
            onset_probability: 0.0,
            max_draw_low: 0,
            max_draw_medium: 0,
            max_draw_high: 0,
        }
    }

    /// Upper bound of a single draw for the given tier (never negative)
    pub fn max_draw(&self, severity: Severity) -> i64 {
        let raw = match severity {
            Severity::Low => self.max_draw_low,
            Severity::Medium => self.max_draw_medium,
            Severity::High => self.max_draw_high,
        };
        raw.max(0)
    }
}

/// What happened to a patient during [`Patient::generate_need`]
#[derive(Debug, Clone, PartialEq)]
pub struct NeedUpdate {
    /// Need added this tick
    pub grown: ResourceVector,
    /// `(from, to)` if severity escalated this tick
    pub escalated: Option<(Severity, Severity)>,
}

/// A patient in the simulation
///
/// # Example
/// ```
/// use care_allocation_core_rs::{Patient, ResourceType, ResourceVector, Severity};
///
/// let mut patient = Patient::new("P0001".to_string(), Severity::High)
///     .with_need(ResourceVector::from_pairs(&[(ResourceType::Beds, 5)]));
///
/// let request = patient.emit_request().unwrap();
/// assert_eq!(request.wait_ticks, 0);
/// assert_eq!(patient.wait_ticks(), 1);
///
/// patient.receive_allocation(&ResourceVector::from_pairs(&[(ResourceType::Beds, 2)]));
/// assert_eq!(patient.need().get(ResourceType::Beds), 3);
/// assert_eq!(patient.wait_ticks(), 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    id: String,
    severity: Severity,
    /// Outstanding, unfulfilled demand
    need: ResourceVector,
    /// Ticks since need last went unserved without any allocation
    wait_ticks: usize,
    /// Escalations since the last allocation; paces the escalation trigger
    escalations_while_waiting: usize,
    /// Consecutive ticks with zero need (discharge timer)
    zero_need_ticks: usize,
    /// Everything ever granted to this patient
    total_received: ResourceVector,
    position: GridPosition,
}

impl Patient {
    pub fn new(id: String, severity: Severity) -> Self {
        Self {
            id,
            severity,
            need: ResourceVector::zero(),
            wait_ticks: 0,
            escalations_while_waiting: 0,
            zero_need_ticks: 0,
            total_received: ResourceVector::zero(),
            position: GridPosition::default(),
        }
    }

    /// Builder: set the initial outstanding need
    pub fn with_need(mut self, need: ResourceVector) -> Self {
        self.need = need;
        self
    }

    /// Builder: set the initial wait (used to seed long-waiting patients)
    pub fn with_wait_ticks(mut self, wait_ticks: usize) -> Self {
        self.wait_ticks = wait_ticks;
        self
    }

    pub fn at(mut self, position: GridPosition) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn need(&self) -> &ResourceVector {
        &self.need
    }

    pub fn wait_ticks(&self) -> usize {
        self.wait_ticks
    }

    pub fn zero_need_ticks(&self) -> usize {
        self.zero_need_ticks
    }

    pub fn total_received(&self) -> &ResourceVector {
        &self.total_received
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    /// Escalate and grow need for this tick.
    ///
    /// Escalation fires when `wait_ticks` reaches the next multiple of
    /// `escalation_threshold` since the last allocation (Low→Medium at 1×,
    /// Medium→High at 2×). A threshold of 0 disables escalation. Severity
    /// never decreases.
    ///
    /// Growth consumes the same number of draws every tick regardless of
    /// severity, keeping the RNG stream aligned across runs.
    pub fn generate_need(
        &mut self,
        tick: usize,
        growth: &NeedGrowthConfig,
        escalation_threshold: usize,
        rng: &mut RngManager,
    ) -> NeedUpdate {
        let mut escalated = None;
        if escalation_threshold > 0
            && !self.need.is_zero()
            && self.severity < Severity::High
            && self.wait_ticks >= escalation_threshold * (self.escalations_while_waiting + 1)
        {
            let from = self.severity;
            self.severity = from.escalated();
            self.escalations_while_waiting += 1;
            escalated = Some((from, self.severity));
            tracing::debug!(
                tick,
                patient = %self.id,
                from = %from,
                to = %self.severity,
                wait_ticks = self.wait_ticks,
                "severity escalated"
            );
        }

        let max_draw = growth.max_draw(self.severity);
        let mut grown = ResourceVector::zero();
        for resource in ResourceType::ALL {
            if rng.chance(growth.onset_probability) {
                grown.set(resource, rng.range(0, max_draw.saturating_add(1)));
            }
        }
        self.need = self.need.saturating_add(&grown);

        if self.need.is_zero() {
            self.zero_need_ticks += 1;
        } else {
            self.zero_need_ticks = 0;
        }

        NeedUpdate { grown, escalated }
    }

    /// Snapshot the outstanding need as a request, then age the wait.
    ///
    /// Returns `None` (and leaves the wait untouched) when nothing is
    /// outstanding.
    pub fn emit_request(&mut self) -> Option<Request> {
        if self.need.is_zero() {
            return None;
        }

        let request = Request {
            patient_id: self.id.clone(),
            severity: self.severity,
            need: self.need,
            wait_ticks: self.wait_ticks,
        };
        self.wait_ticks += 1;
        Some(request)
    }

    /// Accept whatever the coordinator committed.
    ///
    /// Need is reduced componentwise and clamped at zero. Any non-empty
    /// grant resets the wait.
    pub fn receive_allocation(&mut self, granted: &ResourceVector) {
        if granted.is_zero() {
            return;
        }
        self.need = self.need.saturating_sub(granted);
        self.total_received = self.total_received.saturating_add(granted);
        self.wait_ticks = 0;
        self.escalations_while_waiting = 0;
    }

    /// True once need has stayed at zero for `grace_ticks` consecutive ticks
    pub fn is_ready_for_discharge(&self, grace_ticks: usize) -> bool {
        self.need.is_zero() && self.zero_need_ticks >= grace_ticks
    }
}
