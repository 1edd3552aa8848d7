//! # Bridge Wire Format
//!
//! This crate defines the messages exchanged between the two sides of a
//! plugin bridge.
//!
//! ## Philosophy
//!
//! - **Four kinds, no more**: `call`, `response`, `error` and `connect`
//! - **Validated at the edge**: inbound data is parsed once; anything that
//!   does not match a known kind is discarded before it reaches the engine
//! - **Values, not `any`**: arguments and results are [`Value`]s, the tagged
//!   union of null, booleans, numbers, strings, sequences and maps
//!
//! ## Layout
//!
//! - [`Message`]: the discriminated union carried on the channel
//! - [`CallId`]: per-engine correlation id for a call and its terminal reply
//! - [`ErrorPayload`]: the serialized description of a failed call
//! - [`PluginEnvelope`]: the wrapper used on the initiator side of the channel

pub mod envelope;
pub mod message;
pub mod payload;

pub use envelope::PluginEnvelope;
pub use message::{CallId, Message, MessageKind};
pub use payload::ErrorPayload;

/// Serializable value carried as call arguments, results and error fields.
pub use serde_json::{Map, Value};
