//! Node capacity classes.

use serde::{Deserialize, Serialize};

/// Ordinal capacity class of a transport node.
///
/// Each tier maps to a configured capacity contribution (see the controller's
/// capacity config). The set of tiers is closed: an unknown tier is
/// unrepresentable, which discharges the fail-fast requirement for invalid
/// tiers at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Basic,
    Advanced,
    Elite,
    Ultimate,
}

impl Tier {
    /// All tiers in ascending capacity order.
    pub const ALL: [Tier; 4] = [Tier::Basic, Tier::Advanced, Tier::Elite, Tier::Ultimate];
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tier::Basic => "basic",
            Tier::Advanced => "advanced",
            Tier::Elite => "elite",
            Tier::Ultimate => "ultimate",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_ordered() {
        assert!(Tier::Basic < Tier::Advanced);
        assert!(Tier::Advanced < Tier::Elite);
        assert!(Tier::Elite < Tier::Ultimate);
    }

    #[test]
    fn test_all_covers_every_tier() {
        assert_eq!(Tier::ALL.len(), 4);
        let mut sorted = Tier::ALL;
        sorted.sort();
        assert_eq!(sorted, Tier::ALL);
    }
}
