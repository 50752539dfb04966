//! Time management for the simulation
//!
//! The simulation operates in discrete ticks up to a fixed horizon.
//! Reaching the horizon is the "simulation end" at which every remaining
//! patient leaves the active set.

use serde::{Deserialize, Serialize};

/// Manages simulation time in discrete ticks
///
/// # Example
/// ```
/// use care_allocation_core_rs::TimeManager;
///
/// let mut time = TimeManager::new(3);
/// assert_eq!(time.current_tick(), 0);
///
/// time.advance_tick();
/// time.advance_tick();
/// assert_eq!(time.remaining_ticks(), 1);
/// time.advance_tick();
/// assert!(time.is_finished());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeManager {
    /// Ticks elapsed since simulation start
    current_tick: usize,
    /// Simulation horizon (ticks)
    num_ticks: usize,
}

impl TimeManager {
    /// Create a new TimeManager with the given horizon.
    ///
    /// # Panics
    /// Panics if `num_ticks` is zero.
    pub fn new(num_ticks: usize) -> Self {
        assert!(num_ticks > 0, "num_ticks must be positive");
        Self {
            current_tick: 0,
            num_ticks,
        }
    }

    /// Advance time by one tick. Saturates at the horizon.
    pub fn advance_tick(&mut self) {
        if self.current_tick < self.num_ticks {
            self.current_tick += 1;
        }
    }

    /// Get the current tick (total ticks since start)
    pub fn current_tick(&self) -> usize {
        self.current_tick
    }

    /// Configured horizon
    pub fn num_ticks(&self) -> usize {
        self.num_ticks
    }

    /// Ticks left before the horizon
    pub fn remaining_ticks(&self) -> usize {
        self.num_ticks - self.current_tick
    }

    /// True once the horizon has been reached
    pub fn is_finished(&self) -> bool {
        self.current_tick >= self.num_ticks
    }

    /// True while executing the final tick before the horizon
    pub fn is_last_tick(&self) -> bool {
        self.current_tick + 1 == self.num_ticks
    }
}
