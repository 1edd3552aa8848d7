//! Dispatch Tests
//!
//! Validates correlation, buffering and defensive handling of inbound
//! traffic.

use bridge_engine::{Bridge, BridgeConfig, CallError, HandlerError, InitiationOptions, Settlement};
use bridge_transport::MemoryChannel;
use serde_json::{json, Value};
use tests_bridge::{add, init_logging, run_local, settle, test_bridge_pair};

fn initiator() -> (Bridge, MemoryChannel) {
    init_logging();
    let channel = MemoryChannel::new();
    let bridge = Bridge::new();
    bridge
        .initiate(
            BridgeConfig::initiator(InitiationOptions::unrestricted()),
            channel.clone(),
        )
        .unwrap();
    channel.drain();
    (bridge, channel)
}

fn wrapped(message: Value) -> Value {
    json!({ "pluginMessage": message })
}

/// Test: Replies settle only the call with the matching id, whatever the order
#[test]
fn test_no_cross_talk() {
    let (bridge, channel) = initiator();

    let calls: Vec<_> = (0..5)
        .map(|n| bridge.call("echo", vec![json!(n)]).unwrap())
        .collect();

    let ids: Vec<u64> = channel
        .drain()
        .into_iter()
        .map(|posted| posted.data["pluginMessage"]["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);

    for id in ids.iter().rev() {
        bridge
            .deliver(wrapped(json!({
                "type": "response",
                "id": id,
                "name": "echo",
                "data": id * 10
            })))
            .unwrap();
    }

    for (n, call) in calls.iter().enumerate() {
        assert_eq!(call.settlement(), Settlement::Fulfilled(json!(n * 10)));
    }
    assert_eq!(bridge.outstanding_calls(), 0);
}

/// Test: A second terminal message for the same call has no effect
#[test]
fn test_settles_once() {
    let (bridge, _channel) = initiator();
    let call = bridge.call("f", vec![]).unwrap();

    bridge
        .deliver(wrapped(json!({"type": "error", "id": 0, "name": "f", "errorJSON": "{\"message\":\"first\"}"})))
        .unwrap();
    bridge
        .deliver(wrapped(json!({"type": "response", "id": 0, "name": "f", "data": 1})))
        .unwrap();

    match call.settlement() {
        Settlement::Rejected(err) => assert_eq!(err.message(), "first"),
        other => panic!("unexpected settlement: {:?}", other),
    }
}

/// Test: An undecodable error payload still rejects the waiting call
#[test]
fn test_malformed_error_payload() {
    let (bridge, _channel) = initiator();
    let call = bridge.call("f", vec![]).unwrap();

    bridge
        .deliver(wrapped(json!({"type": "error", "id": 0, "name": "f", "errorJSON": "]["})))
        .unwrap();

    assert!(matches!(
        call.settlement(),
        Settlement::Rejected(CallError::MalformedPayload(_))
    ));
    assert_eq!(bridge.outstanding_calls(), 0);
}

/// Test: Unrecognized traffic on the channel is dropped without side effects
#[test]
fn test_unknown_traffic_dropped() {
    let (bridge, channel) = initiator();
    let call = bridge.call("f", vec![]).unwrap();
    channel.drain();

    for data in [
        Value::Null,
        json!([1, 2, 3]),
        json!({"source": "devtools"}),
        wrapped(json!({"type": "hello"})),
        wrapped(json!({"type": "response", "name": "f"})),
        wrapped(json!("connect")),
    ] {
        bridge.deliver(data).unwrap();
    }

    assert!(call.is_pending());
    assert_eq!(bridge.outstanding_calls(), 1);
    assert_eq!(bridge.total_buffered_calls(), 0);
    assert!(channel.is_empty());
}

/// Test: `ignore` stops dispatch but keeps calls that are already buffered
#[tokio::test]
async fn test_ignore_keeps_buffered_calls() {
    run_local(async {
        let pair = test_bridge_pair();
        pair.responder.receive("add", add);
        pair.responder.ignore("add");

        let first = pair.initiator.call("add", vec![json!(1), json!(1)]).unwrap();
        let second = pair.initiator.call("add", vec![json!(2), json!(2)]).unwrap();
        pair.pump().await.unwrap();

        assert_eq!(pair.responder.buffered_calls("add"), 2);
        assert!(first.is_pending());
        assert!(second.is_pending());

        pair.responder.receive("add", add);
        pair.pump().await.unwrap();

        assert_eq!(first.await, Ok(json!(2)));
        assert_eq!(second.await, Ok(json!(4)));
        assert_eq!(pair.responder.buffered_calls("add"), 0);
    })
    .await;
}

/// Test: Buffered calls for other names are left alone by a drain
#[tokio::test]
async fn test_drain_is_per_name() {
    run_local(async {
        let pair = test_bridge_pair();

        let sum = pair.initiator.call("add", vec![json!(3), json!(4)]).unwrap();
        let other = pair.initiator.call("other", vec![]).unwrap();
        pair.pump().await.unwrap();
        assert_eq!(pair.responder.total_buffered_calls(), 2);

        pair.responder.receive("add", add);
        pair.pump().await.unwrap();

        assert_eq!(sum.await, Ok(json!(7)));
        assert!(other.is_pending());
        assert_eq!(pair.responder.buffered_calls("other"), 1);
    })
    .await;
}

/// Test: Re-registering a handler replaces the previous one
#[tokio::test]
async fn test_receive_replaces_handler() {
    run_local(async {
        let pair = test_bridge_pair();
        pair.responder
            .receive("who", |_args| async { Ok::<_, HandlerError>(json!("old")) });
        pair.responder
            .receive("who", |_args| async { Ok::<_, HandlerError>(json!("new")) });

        let who = pair.initiator.call("who", vec![]).unwrap();
        pair.pump().await.unwrap();
        settle().await;

        assert_eq!(who.await, Ok(json!("new")));
    })
    .await;
}
