//! Hospital bid scoring
//!
//! ```text
//! score = (w_s * match + w_a * availability + w_e * efficiency) / (w_s + w_a + w_e)
//! ```
//!
//! - `match`: 1.0 if the hospital specializes in any requested type, else
//!   `non_specialist_match`
//! - `availability`: `available / capacity` for the request's dominant type
//! - `efficiency`: `1 - min(1, admitted / admission_soft_cap)`
//!
//! Every input is clamped to [0, 1] and weights are non-negative, so the
//! score lies in [0, 1] and is non-decreasing in match and availability.

use serde::{Deserialize, Serialize};

/// Tunable scoring weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_specialization_weight")]
    pub specialization: f64,

    #[serde(default = "default_availability_weight")]
    pub availability: f64,

    #[serde(default = "default_efficiency_weight")]
    pub efficiency: f64,

    /// Match value for a hospital with no relevant specialization
    #[serde(default = "default_non_specialist_match")]
    pub non_specialist_match: f64,

    /// Admissions at which the efficiency term reaches zero (0 disables the penalty)
    #[serde(default = "default_admission_soft_cap")]
    pub admission_soft_cap: usize,
}

fn default_specialization_weight() -> f64 {
    0.4
}

fn default_availability_weight() -> f64 {
    0.4
}

fn default_efficiency_weight() -> f64 {
    0.2
}

fn default_non_specialist_match() -> f64 {
    0.3
}

fn default_admission_soft_cap() -> usize {
    25
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            specialization: default_specialization_weight(),
            availability: default_availability_weight(),
            efficiency: default_efficiency_weight(),
            non_specialist_match: default_non_specialist_match(),
            admission_soft_cap: default_admission_soft_cap(),
        }
    }
}

/// Raw inputs to a score, each expected in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreComponents {
    pub specialization_match: f64,
    pub availability_ratio: f64,
    pub efficiency: f64,
}

fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

fn weight(w: f64) -> f64 {
    if w.is_finite() {
        w.max(0.0)
    } else {
        0.0
    }
}

impl ScoringWeights {
    /// Match term for a hospital with or without a relevant specialization
    pub fn specialization_match(&self, matches: bool) -> f64 {
        if matches {
            1.0
        } else {
            unit(self.non_specialist_match)
        }
    }

    /// Efficiency term for a hospital currently holding `admitted` patients
    pub fn efficiency_term(&self, admitted: usize) -> f64 {
        if self.admission_soft_cap == 0 {
            return 1.0;
        }
        1.0 - (admitted as f64 / self.admission_soft_cap as f64).min(1.0)
    }

    /// Weighted, normalized combination. Zero total weight scores 0.
    pub fn combine(&self, components: ScoreComponents) -> f64 {
        let ws = weight(self.specialization);
        let wa = weight(self.availability);
        let we = weight(self.efficiency);
        let total = ws + wa + we;
        if total <= 0.0 {
            return 0.0;
        }

        let raw = ws * unit(components.specialization_match)
            + wa * unit(components.availability_ratio)
            + we * unit(components.efficiency);
        unit(raw / total)
    }
}
