//! Capacity model: tier table lookup and per-network aggregation.

use flowgate_types::{Tier, TransportNetwork};

use crate::config::CapacityConfig;

/// Capacity contribution of one node of the given tier.
///
/// Pure table lookup into the configured per-tier values.
pub fn capacity_of(config: &CapacityConfig, tier: Tier) -> u64 {
    config.units_for(tier)
}

/// Total virtual capacity of a network: `max(1, Σ capacity_of(tier))`.
///
/// The floor of 1 matters: a network whose computed capacity were 0 would sit
/// at `transit >= capacity` forever and permanently starve. An empty network
/// therefore still reports capacity 1.
pub fn aggregate_capacity<N>(config: &CapacityConfig, network: &N) -> u64
where
    N: TransportNetwork + ?Sized,
{
    let mut total = 0u64;
    network.for_each_member(&mut |member| {
        total = total.saturating_add(capacity_of(config, member.tier));
    });
    total.max(1)
}
