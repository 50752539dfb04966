//! Global rebalancing of unallocated stock
//!
//! Runs after replenishment. Hospitals that carried a backlog this tick
//! (need left unserved by requests attributed to them) pull stock from
//! hospitals holding more than their reserve floor.
//!
//! ```text
//! floor(h, t)   = ceil(capacity(h, t) * reserve_floor_fraction)
//! surplus(h, t) = available(h, t) - floor(h, t)
//! deficit(h, t) = min(backlog(h, t), capacity(h, t) - available(h, t))
//! transfer      = min(deficit, surplus, max(1, ceil(available(src, t) * transfer_fraction)))
//! ```
//!
//! A `transfer_fraction` of zero turns every transfer bound to zero.
//!
//! # Critical Invariants
//!
//! - A sender never drops below its reserve floor
//! - A receiver never exceeds its capacity
//! - Total stock across hospitals is unchanged by a transfer
//! - Admitted patients are never touched

use crate::models::event::{Event, EventLog};
use crate::models::hospital::CareProvider;
use crate::models::resource::{ResourceType, ResourceVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rebalancing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Fraction of capacity a hospital always keeps
    #[serde(default = "default_reserve_floor_fraction")]
    pub reserve_floor_fraction: f64,

    /// Largest single transfer, as a fraction of the sender's available stock.
    /// Any positive fraction moves at least one unit; zero moves nothing.
    #[serde(default = "default_transfer_fraction")]
    pub transfer_fraction: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_reserve_floor_fraction() -> f64 {
    0.2
}

fn default_transfer_fraction() -> f64 {
    0.1
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            reserve_floor_fraction: default_reserve_floor_fraction(),
            transfer_fraction: default_transfer_fraction(),
        }
    }
}

impl RebalanceConfig {
    /// Per-type floor for a hospital with the given capacity
    pub fn reserve_floor(&self, capacity: &ResourceVector) -> ResourceVector {
        capacity
            .scaled_ceil(self.reserve_floor_fraction.clamp(0.0, 1.0))
            .min(capacity)
    }

    fn transfer_bound(&self, sender_available: i64) -> i64 {
        let fraction = self.transfer_fraction.clamp(0.0, 1.0);
        if fraction <= 0.0 || sender_available <= 0 {
            return 0;
        }
        ((sender_available as f64 * fraction).ceil() as i64).max(1)
    }
}

/// One completed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub from_hospital: String,
    pub to_hospital: String,
    pub resource: ResourceType,
    pub amount: i64,
}

/// Move stock from surplus hospitals to backlogged ones.
///
/// Receivers are served largest backlog first (registry order on ties);
/// for each type, senders are drained largest surplus first. Hospitals
/// backlogged in a type never send that type.
pub fn rebalance(
    registry: &mut [Box<dyn CareProvider>],
    backlog: &BTreeMap<String, ResourceVector>,
    config: &RebalanceConfig,
    tick: usize,
    log: &mut EventLog,
) -> Vec<Transfer> {
    let mut transfers = Vec::new();
    if !config.enabled || registry.len() < 2 {
        return transfers;
    }

    let backlog_of = |id: &str| backlog.get(id).copied().unwrap_or_default();

    let mut receivers: Vec<usize> = (0..registry.len())
        .filter(|i| !backlog_of(registry[*i].id()).is_zero())
        .collect();
    receivers.sort_by_key(|i| std::cmp::Reverse(backlog_of(registry[*i].id()).total()));

    for target in receivers {
        let target_backlog = backlog_of(registry[target].id());

        for resource in target_backlog.types_present().collect::<Vec<_>>() {
            let headroom =
                registry[target].capacity().get(resource) - registry[target].available().get(resource);
            let mut deficit = target_backlog.get(resource).min(headroom.max(0));
            if deficit == 0 {
                continue;
            }

            // (index, surplus, floor) for eligible senders
            let mut senders: Vec<(usize, i64, i64)> = (0..registry.len())
                .filter(|i| *i != target)
                .filter(|i| backlog_of(registry[*i].id()).get(resource) == 0)
                .map(|i| {
                    let floor = config.reserve_floor(registry[i].capacity()).get(resource);
                    (i, registry[i].available().get(resource) - floor, floor)
                })
                .filter(|(_, surplus, _)| *surplus > 0)
                .collect();
            senders.sort_by_key(|(_, surplus, _)| std::cmp::Reverse(*surplus));

            for (source, surplus, floor) in senders {
                if deficit == 0 {
                    break;
                }
                let bound = config.transfer_bound(registry[source].available().get(resource));
                let amount = deficit.min(surplus).min(bound);

                let released = registry[source].release_surplus(resource, amount, floor);
                if released == 0 {
                    continue;
                }
                let accepted = registry[target].accept_transfer(resource, released);
                if accepted < released {
                    // Hand back what the receiver could not hold
                    registry[source].accept_transfer(resource, released - accepted);
                }
                if accepted == 0 {
                    continue;
                }

                deficit -= accepted;
                let transfer = Transfer {
                    from_hospital: registry[source].id().to_string(),
                    to_hospital: registry[target].id().to_string(),
                    resource,
                    amount: accepted,
                };
                tracing::debug!(
                    tick,
                    from = %transfer.from_hospital,
                    to = %transfer.to_hospital,
                    resource = %resource,
                    amount = accepted,
                    "resource transfer"
                );
                log.log(Event::ResourceTransfer {
                    tick,
                    from_hospital: transfer.from_hospital.clone(),
                    to_hospital: transfer.to_hospital.clone(),
                    resource,
                    amount: accepted,
                });
                transfers.push(transfer);
            }
        }
    }

    transfers
}
