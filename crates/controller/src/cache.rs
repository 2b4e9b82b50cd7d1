//! Per-network state cache with weak, automatic eviction.
//!
//! One entry per known network, keyed by [`NetworkId`] and created lazily on
//! first access. Each slot holds a [`Weak`] handle to the host's network so
//! an entry can never keep an abandoned network alive: once the host drops
//! its last `Arc` (merge/split/destruction), the entry is dead weight and is
//! removed by the next sweep without any explicit deletion call. Networks are
//! created and destroyed continuously during normal operation, so a
//! strong-reference cache would leak unboundedly over a long session.
//!
//! The map is sharded ([`DashMap`]) and each entry sits behind its own lock,
//! so refreshing one network never serializes against another. That safety is
//! a net for rare off-loop access; the primary host loop is sequential.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;

use flowgate_types::{NetworkId, TransportNetwork};

/// Sweep dead entries every this many cache accesses.
const SWEEP_PERIOD: u64 = 64;

/// Cached per-network state.
///
/// `transit_count` and `capacity` are only ever written together, inside one
/// reconciliation pass; readers always observe a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    /// Last sampled total items in transit across all members.
    pub transit_count: u64,
    /// Last computed total capacity. Always >= 1.
    pub capacity: u64,
    /// Tick of the last reconciliation pass; `None` means never refreshed,
    /// so the first access always recomputes.
    pub last_refresh: Option<u64>,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            transit_count: 0,
            capacity: 1,
            last_refresh: None,
        }
    }
}

struct CacheSlot<N> {
    /// Liveness handle. Dead (`strong_count == 0`) means the host abandoned
    /// the network and this slot is eligible for sweeping.
    network: Weak<N>,
    data: Mutex<CacheEntry>,
}

impl<N> CacheSlot<N> {
    fn fresh(network: &Arc<N>) -> Self {
        Self {
            network: Arc::downgrade(network),
            data: Mutex::new(CacheEntry::default()),
        }
    }
}

/// Weak, auto-evicting cache of per-network controller state.
pub struct NetworkStateCache<N> {
    slots: DashMap<NetworkId, Arc<CacheSlot<N>>>,
    /// Access counter driving the amortized sweep.
    accesses: AtomicU64,
}

impl<N> std::fmt::Debug for NetworkStateCache<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkStateCache")
            .field("entries", &self.slots.len())
            .finish()
    }
}

impl<N> Default for NetworkStateCache<N>
where
    N: TransportNetwork + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N> NetworkStateCache<N>
where
    N: TransportNetwork + Send + Sync,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            accesses: AtomicU64::new(0),
        }
    }

    /// Number of entries currently held (live and not-yet-swept dead ones).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop all entries immediately. Session start/stop reset.
    ///
    /// The next access for any network recomputes from the zero state
    /// (`last_refresh = None`), never returning a pre-reset value.
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Remove entries whose network the host has abandoned.
    ///
    /// Returns the number of entries removed. Runs automatically every
    /// [`SWEEP_PERIOD`] accesses; callable directly for deterministic tests.
    pub fn sweep(&self) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| slot.network.strong_count() > 0);
        before - self.slots.len()
    }

    /// Read the entry for `network`, creating a zero-initialized one on first
    /// access.
    pub fn snapshot(&self, network: &Arc<N>) -> CacheEntry {
        self.with_entry(network, |entry| *entry)
    }

    /// Run `f` on the entry for `network` under its per-entry lock.
    ///
    /// The lock bounds the read-compute-write of one reconciliation pass to
    /// this network only; no lock is held across networks.
    pub(crate) fn with_entry<R>(&self, network: &Arc<N>, f: impl FnOnce(&mut CacheEntry) -> R) -> R {
        if self.accesses.fetch_add(1, Ordering::Relaxed) % SWEEP_PERIOD == SWEEP_PERIOD - 1 {
            self.sweep();
        }
        let slot = self.slot_for(network);
        let mut entry = slot.data.lock();
        f(&mut entry)
    }

    /// Fetch the slot for `network`, creating it on first access.
    ///
    /// If an id is reused after the original network died, the stale slot is
    /// reinitialized in place so a new network can never observe the old
    /// network's sample.
    fn slot_for(&self, network: &Arc<N>) -> Arc<CacheSlot<N>> {
        let id = network.id();

        // Fast path: existing slot for this exact network object.
        if let Some(slot) = self.slots.get(&id) {
            if Weak::as_ptr(&slot.network) == Arc::as_ptr(network) {
                return Arc::clone(&slot);
            }
        }

        let slot = self
            .slots
            .entry(id)
            .and_modify(|slot| {
                if Weak::as_ptr(&slot.network) != Arc::as_ptr(network) {
                    *slot = Arc::new(CacheSlot::fresh(network));
                }
            })
            .or_insert_with(|| Arc::new(CacheSlot::fresh(network)));
        Arc::clone(&slot)
    }
}
