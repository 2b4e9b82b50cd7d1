//! Host-side model: nodes with local transit buffers, and the network view.
//!
//! Mirrors the host contract the controller assumes: the host owns nodes and
//! networks outright, decrements each node's delay or attempts a pull when it
//! reaches zero, and applies its own backoff after a pull. The controller only
//! ever sees these through the collaborator traits.

use std::sync::{Arc, Mutex, RwLock};

use flowgate_types::{MemberSample, NetworkId, Tier, TransportNetwork, TransportNode};

/// Host cooldown after a successful pull.
pub const SUCCESS_COOLDOWN: i32 = 5;

/// Host backoff after a pull that found the source empty.
pub const EMPTY_BACKOFF: i32 = 10;

/// One transport node: a tier, a delay counter, and a local buffer of items
/// in transit (each tracked as remaining ride ticks).
#[derive(Debug)]
pub struct SimNode {
    tier: Tier,
    delay: i32,
    transit: Vec<u32>,
    /// Pulls this node actually attempted (delay was <= 0 at its update).
    pub pulls_attempted: u64,
    /// Pulls that extracted an item from the source.
    pub pulls_succeeded: u64,
    /// Items that finished their ride and left the buffer.
    pub items_delivered: u64,
}

impl SimNode {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            delay: 0,
            transit: Vec::new(),
            pulls_attempted: 0,
            pulls_succeeded: 0,
            items_delivered: 0,
        }
    }

    pub fn delay(&self) -> i32 {
        self.delay
    }

    pub fn set_delay(&mut self, ticks: i32) {
        self.delay = ticks;
    }

    /// Put `count` items into the buffer with `ride_ticks` remaining each.
    /// Scenario setup helper; normal items arrive through pulls.
    pub fn inject_transit(&mut self, count: usize, ride_ticks: u32) {
        self.transit
            .extend(std::iter::repeat(ride_ticks.max(1)).take(count));
    }

    pub(crate) fn accept_pull(&mut self, ride_ticks: u32) {
        self.transit.push(ride_ticks.max(1));
    }

    /// Advance every in-flight item one tick; items reaching zero deliver.
    /// Runs regardless of the delay counter: throttling only affects when
    /// extraction is attempted, never items already moving.
    pub(crate) fn advance_transit(&mut self) -> u64 {
        for remaining in &mut self.transit {
            *remaining -= 1;
        }
        let before = self.transit.len();
        self.transit.retain(|remaining| *remaining > 0);
        let delivered = (before - self.transit.len()) as u64;
        self.items_delivered += delivered;
        delivered
    }
}

impl TransportNode for SimNode {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn in_transit(&self) -> usize {
        self.transit.len()
    }

    fn pull_delay(&self) -> i32 {
        self.delay
    }

    fn set_pull_delay(&mut self, ticks: i32) {
        self.delay = ticks;
    }
}

/// A host network: an id plus a membership list that the host may grow or
/// shrink between ticks.
pub struct SimNetwork {
    id: NetworkId,
    members: RwLock<Vec<Arc<Mutex<SimNode>>>>,
}

impl std::fmt::Debug for SimNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimNetwork")
            .field("id", &self.id)
            .field("members", &self.members.read().unwrap().len())
            .finish()
    }
}

impl SimNetwork {
    pub fn new(id: u64) -> Self {
        Self {
            id: NetworkId(id),
            members: RwLock::new(Vec::new()),
        }
    }

    pub fn add_member(&self, node: Arc<Mutex<SimNode>>) {
        self.members.write().unwrap().push(node);
    }

    pub fn member_count(&self) -> usize {
        self.members.read().unwrap().len()
    }
}

impl TransportNetwork for SimNetwork {
    fn id(&self) -> NetworkId {
        self.id
    }

    fn for_each_member(&self, visit: &mut dyn FnMut(MemberSample)) {
        for member in self.members.read().unwrap().iter() {
            let node = member.lock().unwrap();
            visit(MemberSample {
                tier: node.tier,
                in_transit: node.transit.len(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transit_advances_and_delivers() {
        let mut node = SimNode::new(Tier::Basic);
        node.inject_transit(2, 2);
        assert_eq!(node.in_transit(), 2);
        assert_eq!(node.advance_transit(), 0);
        assert_eq!(node.advance_transit(), 2);
        assert_eq!(node.in_transit(), 0);
        assert_eq!(node.items_delivered, 2);
    }

    #[test]
    fn test_network_samples_current_membership() {
        let network = SimNetwork::new(1);
        let node = Arc::new(Mutex::new(SimNode::new(Tier::Elite)));
        node.lock().unwrap().inject_transit(3, 5);
        network.add_member(node);

        let mut samples = Vec::new();
        network.for_each_member(&mut |sample| samples.push(sample));
        assert_eq!(
            samples,
            vec![MemberSample {
                tier: Tier::Elite,
                in_transit: 3
            }]
        );
    }
}
