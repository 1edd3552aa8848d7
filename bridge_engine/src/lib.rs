//! # Bridge Engine
//!
//! Bidirectional RPC between two isolated contexts over a single
//! point-to-point channel.
//!
//! ## Philosophy
//!
//! - **One engine per channel**: all protocol state lives in a [`Bridge`]
//!   instance, never in globals
//! - **Nothing is lost before it can be handled**: calls for names without a
//!   handler are buffered, and a responder holds its outbound traffic until
//!   the peer's `connect` proves someone is listening
//! - **Failures travel as messages**: a failing handler becomes an `error`
//!   reply, malformed peer traffic is dropped or turned into a failure for the
//!   waiting caller, and neither ever takes the engine down
//! - **No hidden timeouts**: a call whose reply never arrives stays pending;
//!   callers that need a bound add their own
//!
//! ## Example
//!
//! ```no_run
//! use bridge_engine::{Bridge, HandlerError};
//! use bridge_transport::{BridgeConfig, InitiationOptions, MemoryChannel};
//! use serde_json::json;
//!
//! let bridge = Bridge::new();
//! bridge
//!     .initiate(
//!         BridgeConfig::responder(InitiationOptions::unrestricted()),
//!         MemoryChannel::new(),
//!     )
//!     .unwrap();
//!
//! bridge.receive("ping", |_args| async { Ok::<_, HandlerError>(json!("pong")) });
//! let reply = bridge.call("ready", vec![]).unwrap();
//! # drop(reply);
//! ```

mod adapter;
mod bridge;
mod buffer;
mod error;
mod registry;
mod runtime;

pub use bridge::Bridge;
pub use error::{BridgeError, CallError, HandlerError};
pub use registry::HandlerFuture;

pub use bridge_transport::{BridgeConfig, InitiationOptions, Role};
pub use bridge_wire::{CallId, Value};
pub use deferred::{Deferred, Settlement};
