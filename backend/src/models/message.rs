//! Messages exchanged between patients, hospitals and the coordinator
//!
//! These are transient in-process values: a patient emits a [`Request`],
//! hospitals answer with a [`BidResponse`], and the coordinator commits an
//! [`AllocationCommand`]. None of them is persisted across ticks.

use crate::models::patient::Severity;
use crate::models::resource::ResourceVector;
use serde::{Deserialize, Serialize};

/// Snapshot of a patient's outstanding need at emission time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub patient_id: String,
    pub severity: Severity,
    pub need: ResourceVector,
    /// Ticks the need has gone unserved, as of emission
    pub wait_ticks: usize,
}

/// A hospital's answer to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidResponse {
    pub hospital_id: String,
    /// Suitability in [0, 1]; higher is better
    pub score: f64,
    /// Quantity the hospital is willing to allocate right now
    pub offer: ResourceVector,
}

/// Committed allocation from one hospital to one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationCommand {
    pub patient_id: String,
    pub hospital_id: String,
    pub granted: ResourceVector,
}
