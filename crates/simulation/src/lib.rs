//! Deterministic host simulation for the flowgate controller.
//!
//! Models the collaborating host the controller is specified against: a
//! sequential per-tick loop that, for each node, invokes the controller's
//! pre-update hook, runs the host's own decrement-or-pull logic with its
//! native backoff, advances items already in transit, and invokes the
//! post-update hook. Given the same seed and configuration, a run produces
//! identical results every time.
//!
//! This crate exists for integration testing (the scenario tests live in
//! `tests/`); it is not a production host.

mod host;
mod runner;

pub use host::{SimNetwork, SimNode, EMPTY_BACKOFF, SUCCESS_COOLDOWN};
pub use runner::{SimConfig, SimStats, TransportSim};
