//! Controller configuration.
//!
//! Four independently toggleable sections, hot-reloadable at session scope
//! via [`FlowController::apply_config`](crate::FlowController::apply_config).
//! Range validation happens in [`ControllerConfig::validate`]; the decision
//! core assumes validated values.

use serde::Deserialize;
use thiserror::Error;

use flowgate_types::Tier;

/// Default capacity units per Basic node.
pub const DEFAULT_CAPACITY_BASIC: u16 = 8;
/// Default capacity units per Advanced node.
pub const DEFAULT_CAPACITY_ADVANCED: u16 = 16;
/// Default capacity units per Elite node.
pub const DEFAULT_CAPACITY_ELITE: u16 = 32;
/// Default capacity units per Ultimate node.
pub const DEFAULT_CAPACITY_ULTIMATE: u16 = 64;

/// Default ticks between transit resamples.
///
/// Sampling is O(network size); coalescing to once per window bounds the
/// amortized per-tick cost regardless of how many members ask. Lower is more
/// accurate, higher is cheaper.
pub const DEFAULT_RECONCILE_INTERVAL: u64 = 20;

/// Default forced delay floor (ticks) when a network is at capacity.
pub const DEFAULT_MAX_COOLDOWN: i32 = 40;

/// Default idle-stretch multiplier. The applied delay is
/// [`IDLE_STRETCH_BASE`]` * multiplier`.
pub const DEFAULT_IDLE_MULTIPLIER: i32 = 4;

/// Base delay (ticks) the idle multiplier scales.
pub const IDLE_STRETCH_BASE: i32 = 10;

/// A configuration value outside its documented range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{option} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        option: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

fn check_range(
    option: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            option,
            value,
            min,
            max,
        })
    }
}

/// Per-tier capacity table and the master gating switch.
#[derive(Debug, Clone, Deserialize)]
pub struct CapacityConfig {
    /// Master switch for capacity gating. When false,
    /// `is_at_capacity` always reports false.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Capacity units contributed per Basic node.
    #[serde(default = "default_capacity_basic")]
    pub basic: u16,

    /// Capacity units contributed per Advanced node.
    #[serde(default = "default_capacity_advanced")]
    pub advanced: u16,

    /// Capacity units contributed per Elite node.
    #[serde(default = "default_capacity_elite")]
    pub elite: u16,

    /// Capacity units contributed per Ultimate node.
    #[serde(default = "default_capacity_ultimate")]
    pub ultimate: u16,
}

impl CapacityConfig {
    /// Capacity contribution of one node of the given tier.
    pub fn units_for(&self, tier: Tier) -> u64 {
        let units = match tier {
            Tier::Basic => self.basic,
            Tier::Advanced => self.advanced,
            Tier::Elite => self.elite,
            Tier::Ultimate => self.ultimate,
        };
        u64::from(units)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for tier in Tier::ALL {
            let option = match tier {
                Tier::Basic => "capacity.basic",
                Tier::Advanced => "capacity.advanced",
                Tier::Elite => "capacity.elite",
                Tier::Ultimate => "capacity.ultimate",
            };
            check_range(option, self.units_for(tier) as i64, 1, 256)?;
        }
        Ok(())
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            basic: DEFAULT_CAPACITY_BASIC,
            advanced: DEFAULT_CAPACITY_ADVANCED,
            elite: DEFAULT_CAPACITY_ELITE,
            ultimate: DEFAULT_CAPACITY_ULTIMATE,
        }
    }
}

/// Transit-count tracking and reconciliation cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct BackpressureConfig {
    /// Enables transit-count based gating. When false,
    /// `is_at_capacity` always reports false.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Ticks between transit/capacity resamples per network.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval: u64,
}

impl BackpressureConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "backpressure.reconcile_interval",
            self.reconcile_interval as i64,
            1,
            200,
        )
    }
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
        }
    }
}

/// Application of the capacity block: forcing a cooldown on nodes that were
/// about to pull into a saturated network.
#[derive(Debug, Clone, Deserialize)]
pub struct IdleBalancerConfig {
    /// Enables applying the capacity-block delay floor in the pre-phase.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Forced delay floor (ticks) when the network is at capacity. Applied
    /// as `delay = max(delay, max_cooldown)`, never a plain assignment.
    #[serde(default = "default_max_cooldown")]
    pub max_cooldown: i32,
}

impl IdleBalancerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "idle_balancer.max_cooldown",
            i64::from(self.max_cooldown),
            5,
            200,
        )
    }
}

impl Default for IdleBalancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_cooldown: DEFAULT_MAX_COOLDOWN,
        }
    }
}

/// Idle stretch: lengthening the pull delay on networks with nothing in
/// transit.
#[derive(Debug, Clone, Deserialize)]
pub struct SmartTicksConfig {
    /// Enables the post-phase idle stretch.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Stretch multiplier: the applied delay is `10 * idle_multiplier`.
    #[serde(default = "default_idle_multiplier")]
    pub idle_multiplier: i32,
}

impl SmartTicksConfig {
    /// The delay applied to members of an idle network.
    pub fn idle_stretch(&self) -> i32 {
        IDLE_STRETCH_BASE * self.idle_multiplier
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "smart_ticks.idle_multiplier",
            i64::from(self.idle_multiplier),
            1,
            20,
        )
    }
}

impl Default for SmartTicksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_multiplier: DEFAULT_IDLE_MULTIPLIER,
        }
    }
}

/// Full controller configuration.
///
/// Bundles all sections so integrations can pass a single value. Every field
/// has a serde default, so partial config files deserialize cleanly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub capacity: CapacityConfig,
    #[serde(default)]
    pub backpressure: BackpressureConfig,
    #[serde(default)]
    pub idle_balancer: IdleBalancerConfig,
    #[serde(default)]
    pub smart_ticks: SmartTicksConfig,
}

impl ControllerConfig {
    /// Check every value against its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capacity.validate()?;
        self.backpressure.validate()?;
        self.idle_balancer.validate()?;
        self.smart_ticks.validate()?;
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_capacity_basic() -> u16 {
    DEFAULT_CAPACITY_BASIC
}

fn default_capacity_advanced() -> u16 {
    DEFAULT_CAPACITY_ADVANCED
}

fn default_capacity_elite() -> u16 {
    DEFAULT_CAPACITY_ELITE
}

fn default_capacity_ultimate() -> u16 {
    DEFAULT_CAPACITY_ULTIMATE
}

fn default_reconcile_interval() -> u64 {
    DEFAULT_RECONCILE_INTERVAL
}

fn default_max_cooldown() -> i32 {
    DEFAULT_MAX_COOLDOWN
}

fn default_idle_multiplier() -> i32 {
    DEFAULT_IDLE_MULTIPLIER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ControllerConfig::default();
        assert!(config.capacity.enabled);
        assert_eq!(config.capacity.basic, 8);
        assert_eq!(config.capacity.advanced, 16);
        assert_eq!(config.capacity.elite, 32);
        assert_eq!(config.capacity.ultimate, 64);
        assert!(config.backpressure.enabled);
        assert_eq!(config.backpressure.reconcile_interval, 20);
        assert!(config.idle_balancer.enabled);
        assert_eq!(config.idle_balancer.max_cooldown, 40);
        assert!(config.smart_ticks.enabled);
        assert_eq!(config.smart_ticks.idle_multiplier, 4);
        config.validate().expect("defaults must validate");
    }

    #[test]
    fn test_idle_stretch_is_base_times_multiplier() {
        let section = SmartTicksConfig {
            enabled: true,
            idle_multiplier: 4,
        };
        assert_eq!(section.idle_stretch(), 40);
    }

    #[test]
    fn test_units_for_each_tier() {
        let capacity = CapacityConfig::default();
        assert_eq!(capacity.units_for(Tier::Basic), 8);
        assert_eq!(capacity.units_for(Tier::Advanced), 16);
        assert_eq!(capacity.units_for(Tier::Elite), 32);
        assert_eq!(capacity.units_for(Tier::Ultimate), 64);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = ControllerConfig::default();
        config.capacity.basic = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                option: "capacity.basic",
                value: 0,
                min: 1,
                max: 256,
            })
        );
    }

    #[test]
    fn test_every_tier_is_range_checked() {
        for tier in Tier::ALL {
            let mut capacity = CapacityConfig::default();
            match tier {
                Tier::Basic => capacity.basic = 0,
                Tier::Advanced => capacity.advanced = 0,
                Tier::Elite => capacity.elite = 0,
                Tier::Ultimate => capacity.ultimate = 0,
            }
            let err = capacity.validate().expect_err("zero capacity must fail");
            let ConfigError::OutOfRange { option, value, .. } = err;
            assert!(option.ends_with(&tier.to_string()), "wrong option for {tier}");
            assert_eq!(value, 0);
        }
    }

    #[test]
    fn test_interval_and_cooldown_bounds() {
        let mut config = ControllerConfig::default();
        config.backpressure.reconcile_interval = 0;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.backpressure.reconcile_interval = 201;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.idle_balancer.max_cooldown = 4;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.smart_ticks.idle_multiplier = 21;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: ControllerConfig = serde_json::from_str(
            r#"{"backpressure": {"reconcile_interval": 5}, "capacity": {"basic": 2}}"#,
        )
        .expect("partial config must deserialize");
        assert_eq!(config.backpressure.reconcile_interval, 5);
        assert!(config.backpressure.enabled);
        assert_eq!(config.capacity.basic, 2);
        assert_eq!(config.capacity.ultimate, 64);
        assert_eq!(config.idle_balancer.max_cooldown, 40);
    }
}
