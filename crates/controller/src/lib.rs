//! Network-state cache and backpressure/idle-scheduling controller.
//!
//! This crate throttles extraction activity on shared transport networks so
//! aggregate in-flight load stays under a configured capacity, without
//! touching items already in transit. It owns:
//!
//! - a lazily-refreshed, automatically-expiring cache of per-network load and
//!   capacity ([`NetworkStateCache`]),
//! - a per-tick backpressure decision ([`FlowController::is_at_capacity`]),
//! - adaptive idle throttling for networks with nothing in transit
//!   ([`FlowController::is_idle`] plus the two-phase tick hooks).
//!
//! # Tick-hook contract
//!
//! The host integration calls [`FlowController::before_update`] at the start
//! of a node's update and [`FlowController::after_update`] at the end, passing
//! the [`PullPhase`] token between them. The split is what keeps idle networks
//! from starving: the capacity floor is applied *before* the host's pull
//! attempt (only when the node was about to pull), while the idle stretch is
//! applied *after* it (only when a pull was actually attempted). An idle
//! network therefore still gets exactly one pull attempt per throttled cycle.
//!
//! # Concurrency
//!
//! All operations are synchronous and expected from one sequential per-tick
//! host loop. The cache tolerates incidental off-loop access (sharded map,
//! per-entry lock); reconciling one network never serializes against another.

mod cache;
mod capacity;
mod config;
mod controller;
mod load;

pub use cache::{CacheEntry, NetworkStateCache};
pub use capacity::{aggregate_capacity, capacity_of};
pub use config::{
    BackpressureConfig, CapacityConfig, ConfigError, ControllerConfig, IdleBalancerConfig,
    SmartTicksConfig, IDLE_STRETCH_BASE,
};
pub use controller::{FlowController, PullPhase, StatsSnapshot};
pub use load::sample_transit;
