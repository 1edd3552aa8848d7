//! Round Trip Tests
//!
//! Validates calls travelling from one side to the other and their replies
//! coming back to the right future.

use bridge_engine::{CallError, Settlement};
use serde_json::json;
use tests_bridge::{add, divide, restricted_bridge_pair, run_local, test_bridge_pair};

/// Test: A call answered by a handler that was registered up front
#[tokio::test]
async fn test_add_with_receiver_registered_first() {
    run_local(async {
        let pair = test_bridge_pair();
        pair.responder.receive("add", add);

        let sum = pair.initiator.call("add", vec![json!(2), json!(3)]).unwrap();
        pair.pump().await.unwrap();

        assert_eq!(sum.await, Ok(json!(5)));
        assert_eq!(pair.initiator.outstanding_calls(), 0);
    })
    .await;
}

/// Test: A call that arrives before its handler is registered
///
/// The call is buffered, replayed once the handler shows up, and answered
/// exactly once.
#[tokio::test]
async fn test_add_with_late_receiver() {
    run_local(async {
        let pair = test_bridge_pair();

        let sum = pair.initiator.call("add", vec![json!(2), json!(3)]).unwrap();
        pair.pump().await.unwrap();

        assert_eq!(pair.responder.buffered_calls("add"), 1);
        assert!(sum.is_pending());

        pair.responder.receive("add", add);
        let delivered = pair.pump().await.unwrap();

        // Only the single response crossed the host
        assert_eq!(delivered, 1);
        assert_eq!(pair.responder.buffered_calls("add"), 0);
        assert_eq!(sum.await, Ok(json!(5)));
        assert!(pair.host.is_idle());
    })
    .await;
}

/// Test: A failing handler rejects the caller's future with its message
#[tokio::test]
async fn test_divide_by_zero_rejects() {
    run_local(async {
        let pair = test_bridge_pair();
        pair.responder.receive("divide", divide);

        let quotient = pair.initiator.call("divide", vec![json!(1), json!(0)]).unwrap();
        pair.pump().await.unwrap();

        let err = quotient.await.unwrap_err();
        assert_eq!(err.message(), "division by zero");
        assert_eq!(err.to_string(), "division by zero");
        assert_eq!(err.cause().unwrap()["name"], json!("RangeError"));
    })
    .await;
}

/// Test: The responder can call the initiator too
#[tokio::test]
async fn test_responder_calls_initiator() {
    run_local(async {
        let pair = test_bridge_pair();
        pair.initiator.receive("add", add);

        let sum = pair.responder.call("add", vec![json!(40), json!(2)]).unwrap();
        assert_eq!(pair.responder.queued_outbound(), 1);

        pair.pump().await.unwrap();

        assert!(pair.responder.is_connected());
        assert_eq!(sum.await, Ok(json!(42)));
    })
    .await;
}

/// Test: Typed calls decode the result
#[tokio::test]
async fn test_typed_call() {
    run_local(async {
        let pair = test_bridge_pair();
        pair.responder.receive("add", add);

        let sum = pair
            .initiator
            .call_as::<u32>("add", vec![json!(7), json!(8)])
            .unwrap();
        let wrong = pair
            .initiator
            .call_as::<String>("add", vec![json!(1), json!(1)])
            .unwrap();
        pair.pump().await.unwrap();

        assert_eq!(sum.await, Ok(15));
        assert!(matches!(wrong.await, Err(CallError::Decode(_))));
    })
    .await;
}

/// Test: Restricted origins only parameterize the posts
#[tokio::test]
async fn test_restricted_pair_round_trip() {
    run_local(async {
        let pair = restricted_bridge_pair("plugin-7", "https://main.example");
        pair.responder.receive("add", add);

        let outgoing = pair.host.initiator_channel();
        let sum = pair.initiator.call("add", vec![json!(1), json!(2)]).unwrap();

        let posts = outgoing.peek_data();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1]["pluginId"], json!("plugin-7"));
        assert_eq!(posts[1]["pluginMessage"]["type"], json!("call"));

        pair.pump().await.unwrap();
        assert_eq!(sum.settlement(), Settlement::Fulfilled(json!(3)));
    })
    .await;
}

/// Test: A handler rejecting bad arguments still produces a reply
#[tokio::test]
async fn test_bad_arguments_reject() {
    run_local(async {
        let pair = test_bridge_pair();
        pair.responder.receive("add", add);

        let sum = pair.initiator.call("add", vec![json!("two")]).unwrap();
        pair.pump().await.unwrap();

        assert_eq!(
            sum.await.unwrap_err().message(),
            "argument 0 must be an integer"
        );
    })
    .await;
}

/// Test: A panicking handler answers with an error instead of leaving the caller waiting
#[tokio::test]
async fn test_panicking_handler_rejects() {
    run_local(async {
        let pair = test_bridge_pair();
        pair.responder.receive("explode", |_args| async {
            let missing: Option<serde_json::Value> = None;
            Ok::<_, bridge_engine::HandlerError>(missing.expect("value present"))
        });

        let result = pair.initiator.call("explode", vec![]).unwrap();
        pair.pump().await.unwrap();

        let err = result.await.unwrap_err();
        assert_eq!(err.message(), "handler panicked: value present");
        assert_eq!(err.cause().unwrap()["name"], json!("Panic"));

        // The responder is still serving
        pair.responder.receive("add", add);
        let sum = pair.initiator.call("add", vec![json!(1), json!(2)]).unwrap();
        pair.pump().await.unwrap();
        assert_eq!(sum.await, Ok(json!(3)));
    })
    .await;
}
