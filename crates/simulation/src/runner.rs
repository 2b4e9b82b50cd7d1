//! Sequential per-tick runner replaying the host contract around the
//! controller's pre/post hooks.

use std::sync::{Arc, Mutex};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use flowgate_controller::{ConfigError, ControllerConfig, FlowController};
use flowgate_types::{Tier, TransportNode};

use crate::host::{SimNetwork, SimNode, EMPTY_BACKOFF, SUCCESS_COOLDOWN};

/// Simulation setup.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// One node per entry, in update order.
    pub tiers: Vec<Tier>,
    /// Items initially available at the shared source.
    pub source_items: u64,
    /// Ride duration for a pulled item, in ticks.
    pub transit_ticks: u32,
    /// Probability of one new source item arriving per tick (seeded RNG).
    pub refill_per_tick: f64,
    /// RNG seed. Same seed, same run.
    pub seed: u64,
    /// Controller configuration for the session.
    pub controller: ControllerConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tiers: vec![Tier::Basic; 4],
            source_items: 0,
            transit_ticks: 8,
            refill_per_tick: 0.0,
            seed: 42,
            controller: ControllerConfig::default(),
        }
    }
}

/// Aggregate counters across a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimStats {
    /// Ticks stepped.
    pub ticks: u64,
    /// Pull attempts across all nodes (delay was <= 0 at host update).
    pub pulls_attempted: u64,
    /// Pulls that extracted an item.
    pub pulls_succeeded: u64,
    /// Items that completed their ride.
    pub items_delivered: u64,
}

/// Deterministic single-network transport simulation.
///
/// Each tick refreshes the controller's sampling window once, before any
/// node is locked, then updates every node in fixed order:
/// 1. `controller.before_update` (pre-phase: freshness + capacity block)
/// 2. host update: decrement a positive delay, or attempt a pull and apply
///    the host's own backoff ([`SUCCESS_COOLDOWN`] / [`EMPTY_BACKOFF`])
/// 3. advance the node's in-flight items (delivery)
/// 4. `controller.after_update` (post-phase: idle stretch)
pub struct TransportSim {
    controller: FlowController<SimNetwork>,
    network: Arc<SimNetwork>,
    nodes: Vec<Arc<Mutex<SimNode>>>,
    source_items: u64,
    transit_ticks: u32,
    refill_per_tick: f64,
    rng: ChaCha8Rng,
    tick: u64,
    stats: SimStats,
}

impl TransportSim {
    /// Build a simulation. Fails only on invalid controller configuration.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let controller = FlowController::with_config(config.controller)?;
        // Session start: begin from an empty cache.
        controller.clear();

        let network = Arc::new(SimNetwork::new(1));
        let nodes: Vec<_> = config
            .tiers
            .iter()
            .map(|&tier| Arc::new(Mutex::new(SimNode::new(tier))))
            .collect();
        for node in &nodes {
            network.add_member(Arc::clone(node));
        }

        Ok(Self {
            controller,
            network,
            nodes,
            source_items: config.source_items,
            transit_ticks: config.transit_ticks,
            refill_per_tick: config.refill_per_tick,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            tick: 0,
            stats: SimStats::default(),
        })
    }

    /// Advance one tick.
    pub fn step(&mut self) {
        if self.refill_per_tick > 0.0 && self.rng.gen_bool(self.refill_per_tick.min(1.0)) {
            self.source_items += 1;
        }

        let tick = self.tick;

        // Refresh the sampling window before any node lock is taken: sampling
        // enumerates members under their locks, and the loop below holds one
        // member's lock while invoking the hooks. Within the window the
        // hooks' own reconcile calls are O(1) no-ops.
        self.controller.reconcile_if_needed(&self.network, tick);

        let nodes: Vec<_> = self.nodes.iter().map(Arc::clone).collect();
        for (index, node_ref) in nodes.iter().enumerate() {
            let mut node = node_ref.lock().unwrap();

            let phase = self
                .controller
                .before_update(Some(&self.network), &mut *node, tick);

            // Host update: Mekanism-style delay guard around the pull section.
            let delay = node.pull_delay();
            if delay > 0 {
                node.set_delay(delay - 1);
            } else {
                node.pulls_attempted += 1;
                self.stats.pulls_attempted += 1;
                if self.source_items > 0 {
                    self.source_items -= 1;
                    node.accept_pull(self.transit_ticks);
                    node.pulls_succeeded += 1;
                    self.stats.pulls_succeeded += 1;
                    node.set_delay(SUCCESS_COOLDOWN);
                } else {
                    node.set_delay(EMPTY_BACKOFF);
                }
                trace!(node = index, tick, "pull attempted");
            }

            // Items already moving are never throttled.
            self.stats.items_delivered += node.advance_transit();

            self.controller
                .after_update(Some(&self.network), &mut *node, tick, phase);
        }

        self.tick += 1;
        self.stats.ticks += 1;
    }

    /// Advance `ticks` ticks.
    pub fn run_for(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// End the session: reset the controller as the host would on stop.
    pub fn shutdown(&self) {
        self.controller.clear();
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn source_items(&self) -> u64 {
        self.source_items
    }

    pub fn set_source_items(&mut self, items: u64) {
        self.source_items = items;
    }

    pub fn controller(&self) -> &FlowController<SimNetwork> {
        &self.controller
    }

    pub fn network(&self) -> &Arc<SimNetwork> {
        &self.network
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Inspect a node under its lock.
    pub fn with_node<R>(&self, index: usize, f: impl FnOnce(&SimNode) -> R) -> R {
        f(&self.nodes[index].lock().unwrap())
    }

    /// Mutate a node under its lock (scenario setup).
    pub fn with_node_mut<R>(&self, index: usize, f: impl FnOnce(&mut SimNode) -> R) -> R {
        f(&mut self.nodes[index].lock().unwrap())
    }

    /// Spread `count` in-flight items across the nodes round-robin, each with
    /// `ride_ticks` remaining.
    pub fn inject_transit(&self, count: usize, ride_ticks: u32) {
        for i in 0..count {
            self.with_node_mut(i % self.nodes.len(), |node| {
                node.inject_transit(1, ride_ticks);
            });
        }
    }
}
