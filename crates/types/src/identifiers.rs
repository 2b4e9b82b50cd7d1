//! Identifier newtypes.

use serde::{Deserialize, Serialize};

/// Opaque identity of a transport network.
///
/// Networks are externally managed and change membership continuously as the
/// host merges and splits them; the id is the only thing the controller keys
/// on. Ids are host-assigned and never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkId(pub u64);

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "network-{}", self.0)
    }
}
