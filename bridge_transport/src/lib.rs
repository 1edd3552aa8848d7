//! # Bridge Transport
//!
//! This crate defines everything the protocol engine needs from the outside
//! world: how it is configured, which side of the channel it plays, and the
//! physical primitive it posts through.
//!
//! ## Philosophy
//!
//! - **Explicit roles**: the caller says whether it is the initiator or the
//!   responder; nothing is inferred from the environment
//! - **Configuration parameterizes, never alters**: origin settings only shape
//!   what the physical post receives, protocol semantics stay the same
//! - **Simulation first**: [`SimHost`] replays the embedding host in-process so
//!   both sides of a bridge can be tested deterministically
//!
//! ## Key Types
//!
//! - [`Channel`]: the physical post primitive
//! - [`Role`]: initiator or responder
//! - [`InitiationOptions`] / [`BridgeConfig`]: one-time configuration
//! - [`PostOptions`]: what each physical post is parameterized with
//! - [`MemoryChannel`] / [`SimHost`]: in-process channel and host

pub mod channel;
pub mod endpoint;
pub mod memory;
pub mod options;
pub mod sim;

pub use channel::{Channel, TransportError};
pub use endpoint::EndpointId;
pub use memory::{MemoryChannel, Posted};
pub use options::{
    BridgeConfig, ConfigError, InitiationOptions, OriginType, PostOptions, Role,
    DEFAULT_TARGET_ORIGIN, WILDCARD_ORIGIN,
};
pub use sim::SimHost;
