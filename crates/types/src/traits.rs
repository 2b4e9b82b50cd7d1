//! Collaborator traits: the controller's view into host-owned state.
//!
//! The host simulation owns networks and nodes outright. The controller only
//! ever enumerates membership (read-only) and reads/raises a node's pull
//! delay; these traits are the entire surface it is allowed to touch.

use crate::{NetworkId, Tier};

/// One member's contribution to a network sample.
///
/// Produced by [`TransportNetwork::for_each_member`] so the sampler and the
/// capacity model can traverse membership without borrowing host internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberSample {
    /// Capacity class of the member.
    pub tier: Tier,
    /// Items currently riding in the member's local buffer.
    pub in_transit: usize,
}

/// Enumerable membership view of a transport network.
///
/// Implementations are host-owned and may change membership between calls
/// (merge/split); the controller treats every traversal as a fresh snapshot.
/// The controller never mutates membership through this trait.
pub trait TransportNetwork {
    /// Opaque identity of this network. Stable for the network's lifetime.
    fn id(&self) -> NetworkId;

    /// Visit every current member once.
    ///
    /// O(member count). The visitor receives a copied [`MemberSample`] per
    /// member, so the host is free to keep members behind its own locks.
    fn for_each_member(&self, visit: &mut dyn FnMut(MemberSample));
}

/// Accessors for a single transport node, as seen from the tick hooks.
///
/// The delay counter is the only thing the controller writes, and only ever
/// upward (`max`, never plain assignment), so it composes with the host's own
/// backoff instead of fighting it.
pub trait TransportNode {
    /// Capacity class of this node.
    fn tier(&self) -> Tier;

    /// Items currently riding in this node's local buffer.
    fn in_transit(&self) -> usize;

    /// Current outbound pull delay in ticks. `<= 0` means the node will
    /// attempt a pull on its next update.
    fn pull_delay(&self) -> i32;

    /// Overwrite the pull delay. Callers that raise the delay must use
    /// `set_pull_delay(pull_delay().max(new))` to preserve longer cooldowns.
    fn set_pull_delay(&mut self, ticks: i32);
}
