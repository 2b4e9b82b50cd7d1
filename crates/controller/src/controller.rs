//! The flow controller: reconciliation scheduling, gating decisions, and the
//! two-phase tick hooks.
//!
//! One controller instance is the single control authority for a session. The
//! host integration constructs it explicitly, passes it by reference to the
//! per-tick hook, and calls [`FlowController::clear`] at session boundaries.
//! Multiple independent instances coexist fine, which is what the tests rely
//! on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, trace};

use flowgate_types::{TransportNetwork, TransportNode};

use crate::cache::{CacheEntry, NetworkStateCache};
use crate::capacity::aggregate_capacity;
use crate::config::{ConfigError, ControllerConfig};
use crate::load::sample_transit;

/// Phase token carried from the pre-update hook to the post-update hook.
///
/// Records what the controller decided before the host's own pull logic ran,
/// which is what makes the idle stretch safe to apply afterwards: the stretch
/// only ever lands on a node that really did get its pull attempt this tick.
#[derive(Debug, Clone, Copy)]
pub struct PullPhase {
    attempted: bool,
    blocked: bool,
}

impl PullPhase {
    /// Whether the host's pull logic will actually run this tick: the delay
    /// was already `<= 0` at the pre-phase and the capacity gate did not
    /// suspend it.
    pub fn attempted(&self) -> bool {
        self.attempted
    }

    /// Whether the capacity gate forced the delay floor this tick.
    pub fn blocked(&self) -> bool {
        self.blocked
    }
}

/// Cumulative controller counters. Snapshot via [`FlowController::stats`].
#[derive(Debug, Default)]
struct ControllerCounters {
    reconciles: AtomicU64,
    pulls_blocked: AtomicU64,
    idle_stretches: AtomicU64,
}

/// Point-in-time copy of the controller counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Reconciliation passes that actually resampled a network.
    pub reconciles: u64,
    /// Pre-phase capacity blocks applied (delay floor forced).
    pub pulls_blocked: u64,
    /// Post-phase idle stretches applied.
    pub idle_stretches: u64,
}

/// Network-state cache plus backpressure/idle-scheduling decisions.
pub struct FlowController<N> {
    cache: NetworkStateCache<N>,
    config: RwLock<ControllerConfig>,
    counters: ControllerCounters,
}

impl<N> std::fmt::Debug for FlowController<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Reads the atomics directly: `stats()` lives on the bounded impl and
        // this impl is intentionally unbounded in `N`.
        f.debug_struct("FlowController")
            .field("cache", &self.cache)
            .field("reconciles", &self.counters.reconciles.load(Ordering::Relaxed))
            .field(
                "pulls_blocked",
                &self.counters.pulls_blocked.load(Ordering::Relaxed),
            )
            .field(
                "idle_stretches",
                &self.counters.idle_stretches.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl<N> Default for FlowController<N>
where
    N: TransportNetwork + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N> FlowController<N>
where
    N: TransportNetwork + Send + Sync,
{
    /// Create a controller with default configuration.
    pub fn new() -> Self {
        Self {
            cache: NetworkStateCache::new(),
            config: RwLock::new(ControllerConfig::default()),
            counters: ControllerCounters::default(),
        }
    }

    /// Create a controller with the given configuration.
    pub fn with_config(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            cache: NetworkStateCache::new(),
            config: RwLock::new(config),
            counters: ControllerCounters::default(),
        })
    }

    /// Current configuration (cloned).
    pub fn config(&self) -> ControllerConfig {
        self.config.read().clone()
    }

    /// Hot-swap the configuration. Validates before applying; on error the
    /// previous configuration stays in effect.
    pub fn apply_config(&self, config: ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.config.write() = config;
        debug!("controller configuration updated");
        Ok(())
    }

    /// Drop all cached network state. Session start/stop reset.
    pub fn clear(&self) {
        self.cache.clear();
        info!("controller reset, network cache cleared");
    }

    /// Cumulative counters since construction. `clear` does not reset them.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            reconciles: self.counters.reconciles.load(Ordering::Relaxed),
            pulls_blocked: self.counters.pulls_blocked.load(Ordering::Relaxed),
            idle_stretches: self.counters.idle_stretches.load(Ordering::Relaxed),
        }
    }

    /// Number of cache entries currently held.
    pub fn cached_networks(&self) -> usize {
        self.cache.len()
    }

    /// Force a cache refresh if the reconcile interval has elapsed.
    ///
    /// Only the first caller in each interval window triggers the resample;
    /// subsequent calls in the same window are O(1) no-ops, which bounds the
    /// amortized cost to O(network size / interval) per tick regardless of
    /// how many members ask.
    pub fn reconcile_if_needed(&self, network: &Arc<N>, tick: u64) {
        self.reconciled_entry(network, tick);
    }

    /// Whether the network's cached transit count has reached its capacity.
    ///
    /// Gating requires both `capacity.enabled` (master switch) and
    /// `backpressure.enabled` (transit tracking); with either off this always
    /// reports false. The cached value may be up to one interval stale by
    /// design.
    pub fn is_at_capacity(&self, network: &Arc<N>, tick: u64) -> bool {
        {
            let config = self.config.read();
            if !config.capacity.enabled || !config.backpressure.enabled {
                return false;
            }
        }
        let entry = self.reconciled_entry(network, tick);
        entry.transit_count >= entry.capacity
    }

    /// Whether the network has zero items in transit (cached).
    pub fn is_idle(&self, network: &Arc<N>, tick: u64) -> bool {
        self.reconciled_entry(network, tick).transit_count == 0
    }

    /// Pre-update hook: call at the start of a node's tick, before the host's
    /// own pull logic runs.
    ///
    /// Ensures cache freshness, then applies the capacity block: if the node
    /// was about to pull (`delay <= 0`) into a saturated network, its delay
    /// is raised to at least `idle_balancer.max_cooldown` so the host's pull
    /// guard skips extraction this tick. Nodes mid-cooldown are left alone;
    /// the floor is `max`, never plain assignment. A node with no network
    /// passes through ungated.
    pub fn before_update(
        &self,
        network: Option<&Arc<N>>,
        node: &mut dyn TransportNode,
        tick: u64,
    ) -> PullPhase {
        let about_to_pull = node.pull_delay() <= 0;

        let Some(network) = network else {
            return PullPhase {
                attempted: about_to_pull,
                blocked: false,
            };
        };

        self.reconcile_if_needed(network, tick);

        let mut blocked = false;
        if about_to_pull {
            let (apply_floor, floor) = {
                let config = self.config.read();
                (config.idle_balancer.enabled, config.idle_balancer.max_cooldown)
            };
            if apply_floor && self.is_at_capacity(network, tick) {
                node.set_pull_delay(node.pull_delay().max(floor));
                blocked = true;
                self.counters.pulls_blocked.fetch_add(1, Ordering::Relaxed);
                trace!(network = %network.id(), floor, "capacity block applied");
            }
        }

        PullPhase {
            attempted: about_to_pull && !blocked,
            blocked,
        }
    }

    /// Post-update hook: call at the end of a node's tick, after the host's
    /// own pull logic ran.
    ///
    /// Applies the idle stretch only when a pull was actually attempted this
    /// tick, the node's local buffer is still empty, and the network is still
    /// idle. Stretching only after a real attempt is what prevents the
    /// starvation deadlock: an idle network's nodes always get one pull
    /// attempt per throttled cycle, so new transit can still appear and end
    /// the idleness.
    pub fn after_update(
        &self,
        network: Option<&Arc<N>>,
        node: &mut dyn TransportNode,
        tick: u64,
        phase: PullPhase,
    ) {
        let Some(network) = network else {
            return;
        };
        if !phase.attempted {
            return;
        }

        let (enabled, stretch) = {
            let config = self.config.read();
            (config.smart_ticks.enabled, config.smart_ticks.idle_stretch())
        };
        if !enabled || node.in_transit() != 0 {
            return;
        }
        if !self.is_idle(network, tick) {
            return;
        }

        node.set_pull_delay(node.pull_delay().max(stretch));
        self.counters.idle_stretches.fetch_add(1, Ordering::Relaxed);
        trace!(network = %network.id(), stretch, "idle stretch applied");
    }

    /// Read the entry for `network`, resampling first if the window elapsed.
    ///
    /// The refresh stamps `last_refresh` and then updates transit and
    /// capacity in the same pass, under the entry lock, so callers always see
    /// a matched pair and at most one pass runs per window.
    fn reconciled_entry(&self, network: &Arc<N>, tick: u64) -> CacheEntry {
        let (interval, capacity_table) = {
            let config = self.config.read();
            (
                config.backpressure.reconcile_interval,
                config.capacity.clone(),
            )
        };

        self.cache.with_entry(network, |entry| {
            if refresh_due(entry.last_refresh, tick, interval) {
                entry.last_refresh = Some(tick);
                entry.transit_count = sample_transit(network.as_ref());
                entry.capacity = aggregate_capacity(&capacity_table, network.as_ref());
                self.counters.reconciles.fetch_add(1, Ordering::Relaxed);
                debug!(
                    network = %network.id(),
                    transit = entry.transit_count,
                    capacity = entry.capacity,
                    tick,
                    "reconciled network state"
                );
            }
            *entry
        })
    }
}

/// Whether a refresh is due: never refreshed, or the window elapsed.
fn refresh_due(last_refresh: Option<u64>, tick: u64, interval: u64) -> bool {
    match last_refresh {
        None => true,
        Some(last) => tick.saturating_sub(last) >= interval,
    }
}
