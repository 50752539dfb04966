//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm. Every stochastic draw in the engine
//! (need growth, arrivals, placement, replenishment jitter) goes through
//! this module so that a seed fully determines a run.

mod xorshift;

pub use xorshift::RngManager;
