//! Resource types and quantity vectors
//!
//! A [`ResourceVector`] maps every [`ResourceType`] to a non-negative
//! integer quantity. All arithmetic clamps at zero (and at a ceiling where
//! one is supplied), so a vector can never hold a negative component.
//!
//! CRITICAL: Quantities are i64 units; non-negativity is enforced here, not
//! by callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of resource kinds a hospital can hold and a patient can need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Beds,
    Medication,
    Staff,
    Equipment,
}

impl ResourceType {
    /// Number of resource kinds
    pub const COUNT: usize = 4;

    /// All resource kinds in canonical order
    pub const ALL: [ResourceType; ResourceType::COUNT] = [
        ResourceType::Beds,
        ResourceType::Medication,
        ResourceType::Staff,
        ResourceType::Equipment,
    ];

    fn index(self) -> usize {
        match self {
            ResourceType::Beds => 0,
            ResourceType::Medication => 1,
            ResourceType::Staff => 2,
            ResourceType::Equipment => 3,
        }
    }

    /// Short lowercase label used in log fields
    pub fn label(self) -> &'static str {
        match self {
            ResourceType::Beds => "beds",
            ResourceType::Medication => "medication",
            ResourceType::Staff => "staff",
            ResourceType::Equipment => "equipment",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Largest quantity a configured stock, draw or jitter may take
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Non-negative quantity per resource type.
///
/// Serializes as a map (`{"Beds": 10, ...}`) with zero components omitted.
///
/// # Example
/// ```
/// use care_allocation_core_rs::{ResourceType, ResourceVector};
///
/// let stock = ResourceVector::from_pairs(&[(ResourceType::Beds, 2)]);
/// let need = ResourceVector::from_pairs(&[(ResourceType::Beds, 5)]);
///
/// assert_eq!(need.min(&stock).get(ResourceType::Beds), 2);
/// assert_eq!(stock.saturating_sub(&need).get(ResourceType::Beds), 0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<ResourceType, i64>", into = "BTreeMap<ResourceType, i64>")]
pub struct ResourceVector {
    quantities: [i64; ResourceType::COUNT],
}

impl ResourceVector {
    /// All-zero vector
    pub fn zero() -> Self {
        Self::default()
    }

    /// Same quantity for every resource type (negative clamps to zero)
    pub fn uniform(quantity: i64) -> Self {
        Self {
            quantities: [quantity.max(0); ResourceType::COUNT],
        }
    }

    /// Build from explicit pairs; unspecified types are zero, negatives clamp
    /// to zero and repeated types accumulate.
    pub fn from_pairs(pairs: &[(ResourceType, i64)]) -> Self {
        let mut v = Self::zero();
        for (resource, quantity) in pairs {
            v.quantities[resource.index()] =
                v.quantities[resource.index()].saturating_add((*quantity).max(0));
        }
        v
    }

    /// Builder-style setter
    pub fn with(mut self, resource: ResourceType, quantity: i64) -> Self {
        self.set(resource, quantity);
        self
    }

    pub fn get(&self, resource: ResourceType) -> i64 {
        self.quantities[resource.index()]
    }

    /// Set one component (negative clamps to zero)
    pub fn set(&mut self, resource: ResourceType, quantity: i64) {
        self.quantities[resource.index()] = quantity.max(0);
    }

    /// Iterate `(type, quantity)` over every type, zeros included
    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, i64)> + '_ {
        ResourceType::ALL.iter().map(move |r| (*r, self.get(*r)))
    }

    /// Types with a strictly positive quantity
    pub fn types_present(&self) -> impl Iterator<Item = ResourceType> + '_ {
        self.iter().filter(|(_, q)| *q > 0).map(|(r, _)| r)
    }

    pub fn is_zero(&self) -> bool {
        self.quantities.iter().all(|q| *q == 0)
    }

    /// Sum of all components ("magnitude" in metrics)
    pub fn total(&self) -> i64 {
        self.quantities.iter().fold(0i64, |acc, q| acc.saturating_add(*q))
    }

    /// Elementwise add
    pub fn saturating_add(&self, other: &ResourceVector) -> ResourceVector {
        let mut out = *self;
        for i in 0..ResourceType::COUNT {
            out.quantities[i] = out.quantities[i].saturating_add(other.quantities[i]);
        }
        out
    }

    /// Elementwise add, each component clamped at `ceiling`
    pub fn add_clamped(&self, other: &ResourceVector, ceiling: &ResourceVector) -> ResourceVector {
        let mut out = self.saturating_add(other);
        for i in 0..ResourceType::COUNT {
            out.quantities[i] = out.quantities[i].min(ceiling.quantities[i]);
        }
        out
    }

    /// Elementwise subtract, clamped at zero
    pub fn saturating_sub(&self, other: &ResourceVector) -> ResourceVector {
        let mut out = *self;
        for i in 0..ResourceType::COUNT {
            out.quantities[i] = (out.quantities[i] - other.quantities[i]).max(0);
        }
        out
    }

    /// Elementwise minimum
    pub fn min(&self, other: &ResourceVector) -> ResourceVector {
        let mut out = *self;
        for i in 0..ResourceType::COUNT {
            out.quantities[i] = out.quantities[i].min(other.quantities[i]);
        }
        out
    }

    /// True when every component is ≤ the matching component of `other`
    pub fn fits_within(&self, other: &ResourceVector) -> bool {
        (0..ResourceType::COUNT).all(|i| self.quantities[i] <= other.quantities[i])
    }

    /// First type (canonical order) where `self` exceeds `other`, with both quantities
    pub fn first_excess(&self, other: &ResourceVector) -> Option<(ResourceType, i64, i64)> {
        ResourceType::ALL
            .iter()
            .find(|r| self.get(**r) > other.get(**r))
            .map(|r| (*r, self.get(*r), other.get(*r)))
    }

    /// Type with the largest positive quantity; ties go to canonical order.
    pub fn dominant_type(&self) -> Option<ResourceType> {
        let mut best: Option<(ResourceType, i64)> = None;
        for (resource, quantity) in self.iter() {
            if quantity <= 0 {
                continue;
            }
            match best {
                Some((_, q)) if q >= quantity => {}
                _ => best = Some((resource, quantity)),
            }
        }
        best.map(|(r, _)| r)
    }

    /// Each component scaled by `fraction` and rounded up (negatives → 0)
    pub fn scaled_ceil(&self, fraction: f64) -> ResourceVector {
        let fraction = if fraction.is_finite() { fraction.max(0.0) } else { 0.0 };
        let mut out = Self::zero();
        for i in 0..ResourceType::COUNT {
            out.quantities[i] = (self.quantities[i] as f64 * fraction).ceil() as i64;
        }
        out
    }

    /// Each component scaled by `fraction` and rounded down (negatives → 0)
    pub fn scaled_floor(&self, fraction: f64) -> ResourceVector {
        let fraction = if fraction.is_finite() { fraction.max(0.0) } else { 0.0 };
        let mut out = Self::zero();
        for i in 0..ResourceType::COUNT {
            out.quantities[i] = (self.quantities[i] as f64 * fraction).floor() as i64;
        }
        out
    }
}

impl From<BTreeMap<ResourceType, i64>> for ResourceVector {
    fn from(map: BTreeMap<ResourceType, i64>) -> Self {
        let pairs: Vec<(ResourceType, i64)> = map.into_iter().collect();
        ResourceVector::from_pairs(&pairs)
    }
}

impl From<ResourceVector> for BTreeMap<ResourceType, i64> {
    fn from(v: ResourceVector) -> Self {
        v.iter().filter(|(_, q)| *q > 0).collect()
    }
}

impl fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        for (resource, quantity) in self.iter().filter(|(_, q)| *q > 0) {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", resource, quantity)?;
            first = false;
        }
        f.write_str("}")
    }
}
