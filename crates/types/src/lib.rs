//! Core types for the flowgate transport throttling controller.
//!
//! This crate provides the foundational types shared across the workspace:
//!
//! - **Identifiers**: [`NetworkId`], the opaque identity of a transport network
//! - **Capacity classes**: [`Tier`], the ordinal capacity class of a node
//! - **Collaborator traits**: [`TransportNetwork`] and [`TransportNode`], the
//!   read-mostly views the controller is given into host-owned state
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer. The
//! controller never creates, destroys, or re-parents hosts' networks or nodes;
//! everything it can observe or touch is expressed through the traits here.

mod identifiers;
mod tier;
mod traits;

pub use identifiers::NetworkId;
pub use tier::Tier;
pub use traits::{MemberSample, TransportNetwork, TransportNode};
