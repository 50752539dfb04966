//! Per-tick metrics time series
//!
//! `efficiency(t) = allocated(t) / requested(t)`, defined as 1.0 when
//! nothing was requested. `unmet_need(t)` is the outstanding need
//! magnitude over active patients at the end of the tick.

use serde::{Deserialize, Serialize};

/// Metrics recorded at the end of one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickMetrics {
    pub tick: usize,

    /// Requests collected this tick
    pub requests: usize,

    /// Total need magnitude requested this tick
    pub requested: i64,

    /// Total magnitude committed this tick
    pub allocated: i64,

    /// In [0, 1]
    pub efficiency: f64,

    /// Remaining need over active patients after arbitration
    pub unmet_need: i64,

    pub unmet_requests: usize,
    pub allocations: usize,
    pub invalid_bids: usize,
    pub retries: usize,
    pub transfers: usize,

    /// Total units moved by rebalancing
    pub transferred: i64,
}

/// Allocation efficiency for one tick, bounded to [0, 1]
pub fn efficiency(allocated: i64, requested: i64) -> f64 {
    if requested <= 0 {
        return 1.0;
    }
    (allocated.max(0) as f64 / requested as f64).clamp(0.0, 1.0)
}

/// Append-only metrics history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSeries {
    ticks: Vec<TickMetrics>,
    cumulative_requested: i64,
    cumulative_allocated: i64,
}

impl MetricsSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metrics: TickMetrics) {
        self.cumulative_requested += metrics.requested;
        self.cumulative_allocated += metrics.allocated;
        self.ticks.push(metrics);
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn ticks(&self) -> &[TickMetrics] {
        &self.ticks
    }

    pub fn latest(&self) -> Option<&TickMetrics> {
        self.ticks.last()
    }

    pub fn get(&self, tick: usize) -> Option<&TickMetrics> {
        self.ticks.iter().find(|m| m.tick == tick)
    }

    pub fn cumulative_requested(&self) -> i64 {
        self.cumulative_requested
    }

    pub fn cumulative_allocated(&self) -> i64 {
        self.cumulative_allocated
    }

    /// Efficiency over the whole run so far
    pub fn overall_efficiency(&self) -> f64 {
        efficiency(self.cumulative_allocated, self.cumulative_requested)
    }
}
