//! Grid placement for hospitals and patients
//!
//! Positions never influence allocation; they exist so the rendering
//! consumer can draw agents. Placement draws from the simulation RNG, so
//! positions are reproducible for a given seed.

use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Cell coordinate on the placement grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: u32,
    pub y: u32,
}

impl GridPosition {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Toroidal placement grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
        }
    }
}

impl Grid {
    /// Uniformly random cell
    pub fn random_position(&self, rng: &mut RngManager) -> GridPosition {
        let x = rng.range(0, self.width.max(1) as i64) as u32;
        let y = rng.range(0, self.height.max(1) as i64) as u32;
        GridPosition { x, y }
    }

    /// Wrap arbitrary coordinates onto the torus
    pub fn wrap(&self, x: i64, y: i64) -> GridPosition {
        let w = self.width.max(1) as i64;
        let h = self.height.max(1) as i64;
        GridPosition {
            x: x.rem_euclid(w) as u32,
            y: y.rem_euclid(h) as u32,
        }
    }
}
