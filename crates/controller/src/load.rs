//! Load sampler: total items in transit across a network.

use flowgate_types::TransportNetwork;

/// Sum of items currently riding in every member's local buffer.
///
/// Pure, read-only, O(member count). A member with a transiently empty buffer
/// contributes 0. Callers must go through the reconciliation scheduler rather
/// than calling this every tick; the traversal is what the cache exists to
/// amortize.
pub fn sample_transit<N>(network: &N) -> u64
where
    N: TransportNetwork + ?Sized,
{
    let mut total = 0u64;
    network.for_each_member(&mut |member| {
        total = total.saturating_add(member.in_transit as u64);
    });
    total
}
