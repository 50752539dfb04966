//! Request ordering within a tick
//!
//! Requests are served in descending priority:
//!
//! 1. **Aged** requests first: a request whose `wait_ticks` exceeds the
//!    starvation bound outranks every non-aged request, whatever its
//!    severity.
//! 2. Severity, High before Low.
//! 3. Longer wait first.
//! 4. Patient id ascending, so equal keys still sort deterministically.
//!
//! A starvation bound of 0 disables aging.

use crate::models::message::Request;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};

/// Ordering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingConfig {
    #[serde(default = "default_starvation_bound")]
    pub starvation_bound: usize,
}

fn default_starvation_bound() -> usize {
    8
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            starvation_bound: default_starvation_bound(),
        }
    }
}

impl OrderingConfig {
    pub fn is_aged(&self, request: &Request) -> bool {
        self.starvation_bound > 0 && request.wait_ticks > self.starvation_bound
    }
}

/// Sort key; larger sorts first
pub fn priority_key(request: &Request, config: &OrderingConfig) -> (bool, u8, usize) {
    (
        config.is_aged(request),
        request.severity.rank(),
        request.wait_ticks,
    )
}

fn compare(a: &Request, b: &Request, config: &OrderingConfig) -> Ordering {
    Reverse(priority_key(a, config))
        .cmp(&Reverse(priority_key(b, config)))
        .then_with(|| a.patient_id.cmp(&b.patient_id))
}

/// Sort `requests` in service order (in place)
pub fn order_requests(requests: &mut [Request], config: &OrderingConfig) {
    requests.sort_by(|a, b| compare(a, b, config));
}
