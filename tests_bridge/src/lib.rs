//! Bridge Test Utilities
//!
//! Shared helpers for the end-to-end bridge tests.
//!
//! ## Test Philosophy
//!
//! - **Both sides are real**: every test runs an initiator and a responder
//!   engine, connected through a simulated host
//! - **Deterministic delivery**: traffic only moves when the test pumps it,
//!   so the state in between is observable
//! - **Local executor**: engines are single-threaded, so tests run inside a
//!   `LocalSet`

use bridge_engine::{Bridge, BridgeConfig, BridgeError, HandlerError, InitiationOptions, Value};
use bridge_transport::SimHost;
use serde_json::json;
use std::future::Future;
use tokio::task::LocalSet;

/// Scheduler turns given to spawned tasks between pump rounds
const SETTLE_TURNS: usize = 8;

/// Initiator and responder engines joined by a simulated host
pub struct BridgePair {
    pub host: SimHost,
    pub initiator: Bridge,
    pub responder: Bridge,
}

impl BridgePair {
    /// Moves traffic both ways until nothing is left in flight
    ///
    /// Returns the number of messages delivered.
    pub async fn pump(&self) -> Result<usize, BridgeError> {
        let mut delivered = 0;
        loop {
            settle().await;
            if self.host.is_idle() {
                return Ok(delivered);
            }
            for data in self.host.deliveries_to_responder() {
                self.responder.deliver(data)?;
                delivered += 1;
            }
            for data in self.host.deliveries_to_initiator() {
                self.initiator.deliver(data)?;
                delivered += 1;
            }
        }
    }
}

/// Enables test logging once per process
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bootstrap helper for tests
///
/// Creates an initiated, unrestricted pair. The initiator's `connect` sits in
/// the host until the first [`BridgePair::pump`].
pub fn test_bridge_pair() -> BridgePair {
    bridge_pair(SimHost::new(), InitiationOptions::unrestricted())
}

/// Creates a pair restricted to `plugin_id`
pub fn restricted_bridge_pair(plugin_id: &str, main_host: &str) -> BridgePair {
    bridge_pair(
        SimHost::restricted(plugin_id),
        InitiationOptions::restricted(plugin_id, main_host),
    )
}

fn bridge_pair(host: SimHost, options: InitiationOptions) -> BridgePair {
    init_logging();

    let initiator = Bridge::new();
    let responder = Bridge::new();
    initiator
        .initiate(BridgeConfig::initiator(options.clone()), host.initiator_channel())
        .expect("Failed to initiate initiator");
    responder
        .initiate(BridgeConfig::responder(options), host.responder_channel())
        .expect("Failed to initiate responder");

    BridgePair {
        host,
        initiator,
        responder,
    }
}

/// Runs a test body on a local task set
pub async fn run_local<F: Future>(future: F) -> F::Output {
    LocalSet::new().run_until(future).await
}

/// Gives spawned local tasks a chance to run
pub async fn settle() {
    for _ in 0..SETTLE_TURNS {
        tokio::task::yield_now().await;
    }
}

/// Handler adding two integer arguments
pub async fn add(args: Vec<Value>) -> Result<Value, HandlerError> {
    let a = integer_arg(&args, 0)?;
    let b = integer_arg(&args, 1)?;
    Ok(json!(a + b))
}

/// Handler dividing two integer arguments
pub async fn divide(args: Vec<Value>) -> Result<Value, HandlerError> {
    let a = integer_arg(&args, 0)?;
    let b = integer_arg(&args, 1)?;
    if b == 0 {
        return Err(HandlerError::new("division by zero").with_field("name", "RangeError"));
    }
    Ok(json!(a / b))
}

fn integer_arg(args: &[Value], index: usize) -> Result<i64, HandlerError> {
    args.get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| HandlerError::new(format!("argument {} must be an integer", index)))
}
