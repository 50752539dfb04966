//! Allocation policy
//!
//! Two pure decision functions sit behind the coordinator:
//!
//! - **Scoring** ([`ScoringWeights`]): how a hospital rates its own fit for
//!   a request. Weights are configuration; only monotonicity and the [0, 1]
//!   bound are contractual.
//! - **Ordering** ([`order_requests`]): in which sequence the coordinator
//!   serves pending requests within a tick.
//!
//! Keeping both out of the agents lets tests sweep parameters without
//! building a full simulation.

pub mod ordering;
pub mod scoring;

pub use ordering::{order_requests, priority_key, OrderingConfig};
pub use scoring::{ScoreComponents, ScoringWeights};
