//! Gateway end-to-end tests
//!
//! Each test boots its own gateway on an ephemeral port with the
//! in-process message store; no external services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::{assert_json, fixtures::*, Closed, TestGateway};
use relay_core::UserId;
use reqwest::StatusCode;
use serde_json::Value;

const QUIET: Duration = Duration::from_millis(200);

// ============================================================================
// Rooms
// ============================================================================

#[tokio::test]
async fn test_room_message_fans_out_to_members() {
    let gateway = TestGateway::start().await.unwrap();
    let mut alice = gateway.connect("alice").await.unwrap();
    let mut bob = gateway.connect("bob").await.unwrap();

    alice.send(join_room("r1")).await.unwrap();
    let ack = alice.recv_event("system_message").await.unwrap();
    assert_eq!(ack["message"], "You have joined room: r1");
    bob.send(join_room("r1")).await.unwrap();
    bob.recv_event("system_message").await.unwrap();

    alice.send(send_room_message("r1", "hi")).await.unwrap();

    let own = alice.recv_event("new_message").await.unwrap();
    let sent = alice.recv_event("message_sent").await.unwrap();
    assert_eq!(sent["recipients"], 2);
    assert_eq!(sent["message"], own);

    let received = bob.recv_event("new_message").await.unwrap();
    assert_eq!(received["content"], "hi");
    assert_eq!(received["sender_id"], "alice");
    assert_eq!(received["room_id"], "r1");
    assert_eq!(received["id"], own["id"]);
    assert!(received["id"].is_string());
}

#[tokio::test]
async fn test_claimed_sender_is_ignored() {
    let gateway = TestGateway::start().await.unwrap();
    let mut alice = gateway.connect("alice").await.unwrap();
    let mut bob = gateway.connect("bob").await.unwrap();
    bob.send(join_room("r1")).await.unwrap();
    bob.recv_event("system_message").await.unwrap();

    alice
        .send(send_room_message_as("r1", "trust me", "mallory"))
        .await
        .unwrap();

    let received = bob.recv_event("new_message").await.unwrap();
    assert_eq!(received["sender_id"], "alice");

    // alice is not a member, so nothing comes back to her but the ack
    let sent = alice.recv_event("message_sent").await.unwrap();
    assert_eq!(sent["recipients"], 1);
}

#[tokio::test]
async fn test_join_and_leave_are_idempotent() {
    let gateway = TestGateway::start().await.unwrap();
    let mut alice = gateway.connect("alice").await.unwrap();

    for _ in 0..2 {
        alice.send(join_room("r1")).await.unwrap();
        alice.recv_event("system_message").await.unwrap();
    }
    alice.send(send_room_message("r1", "once")).await.unwrap();
    alice.recv_event("new_message").await.unwrap();
    let sent = alice.recv_event("message_sent").await.unwrap();
    assert_eq!(sent["recipients"], 1);

    for _ in 0..2 {
        alice.send(leave_room("r1")).await.unwrap();
        let ack = alice.recv_event("system_message").await.unwrap();
        assert_eq!(ack["message"], "You have left room: r1");
    }
    alice.send(send_room_message("r1", "gone")).await.unwrap();
    let sent = alice.recv_event("message_sent").await.unwrap();
    assert_eq!(sent["recipients"], 0);
    assert_eq!(gateway.stats().rooms, 0);
}

#[tokio::test]
async fn test_disconnect_leaves_every_room() {
    let gateway = TestGateway::start().await.unwrap();
    let mut alice = gateway.connect("alice").await.unwrap();
    let mut carol = gateway.connect("carol").await.unwrap();

    for room in ["r1", "r2"] {
        alice.send(join_room(room)).await.unwrap();
        alice.recv_event("system_message").await.unwrap();
        carol.send(join_room(room)).await.unwrap();
        carol.recv_event("system_message").await.unwrap();
    }

    alice.close().await.unwrap();
    gateway
        .wait_until(|engine| engine.stats().connections == 1)
        .await
        .unwrap();
    assert!(!gateway.engine().presence().is_online(&UserId::new("alice")));

    for room in ["r1", "r2"] {
        carol.send(send_room_message(room, "still here?")).await.unwrap();
        carol.recv_event("new_message").await.unwrap();
        let sent = carol.recv_event("message_sent").await.unwrap();
        assert_eq!(sent["recipients"], 1, "alice still a member of {room}");
    }
}

// ============================================================================
// Direct messages
// ============================================================================

#[tokio::test]
async fn test_direct_message_to_offline_user() {
    let gateway = TestGateway::start().await.unwrap();
    let mut bob = gateway.connect("bob").await.unwrap();

    bob.send(send_direct_message("alice", "are you there?"))
        .await
        .unwrap();

    let status = bob.recv_event("message_status").await.unwrap();
    assert_eq!(status["status"], "recipient_offline");
    assert_eq!(status["receiver_id"], "alice");
    assert_eq!(
        status["info"],
        "User alice is currently offline. Message will be delivered when they next connect."
    );
    bob.expect_silence(QUIET).await.unwrap();

    // persisted exactly once, visible to alice once she connects
    let mut alice = gateway.connect("alice").await.unwrap();
    alice.send(fetch_direct_history("bob")).await.unwrap();
    let history = alice.recv_event("history").await.unwrap();
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["sender_id"], "bob");
    assert_eq!(messages[0]["receiver_id"], "alice");
    assert_eq!(messages[0]["id"], status["message_id"]);
}

#[tokio::test]
async fn test_direct_message_to_online_user() {
    let gateway = TestGateway::start().await.unwrap();
    let mut alice = gateway.connect("alice").await.unwrap();
    let mut bob = gateway.connect("bob").await.unwrap();

    bob.send(send_direct_message("alice", "hello")).await.unwrap();

    let dm = alice.recv_event("new_dm").await.unwrap();
    assert_eq!(dm["sender_id"], "bob");
    assert_eq!(dm["receiver_id"], "alice");
    assert_eq!(dm["content"], "hello");

    let status = bob.recv_event("message_status").await.unwrap();
    assert_eq!(status["status"], "delivered");
    assert_eq!(status["message_id"], dm["id"]);
    assert_eq!(status["info"], "Message delivered to alice.");
}

#[tokio::test]
async fn test_reconnect_supersedes_presence() {
    let gateway = TestGateway::start().await.unwrap();
    let mut first = gateway.connect("alice").await.unwrap();
    let mut second = gateway.connect_with_header("alice").await.unwrap();
    let mut bob = gateway.connect("bob").await.unwrap();

    bob.send(send_direct_message("alice", "which one?")).await.unwrap();

    second.recv_event("new_dm").await.unwrap();
    first.expect_silence(QUIET).await.unwrap();

    first.send(send_room_message("r1", "me?")).await.unwrap();
    let err = first.recv_event("error").await.unwrap();
    assert_eq!(err["kind"], "unauthenticated");
}

// ============================================================================
// Validation and errors
// ============================================================================

#[tokio::test]
async fn test_invalid_payloads_report_errors_without_closing() {
    let gateway = TestGateway::start().await.unwrap();
    let mut alice = gateway.connect("alice").await.unwrap();

    alice.send_text("{not json").await.unwrap();
    let err = alice.recv_event("error").await.unwrap();
    assert_eq!(err["kind"], "validation_error");

    alice
        .send(serde_json::json!({ "event": "subscribe", "data": {} }))
        .await
        .unwrap();
    let err = alice.recv_event("error").await.unwrap();
    assert_eq!(err["kind"], "validation_error");

    alice.send(send_room_message("r1", "   ")).await.unwrap();
    let err = alice.recv_event("error").await.unwrap();
    assert_eq!(err["kind"], "validation_error");

    alice
        .send(send_room_message("r1", &"x".repeat(2001)))
        .await
        .unwrap();
    let err = alice.recv_event("error").await.unwrap();
    assert_eq!(err["kind"], "validation_error");

    alice.send(join_room("")).await.unwrap();
    let err = alice.recv_event("error").await.unwrap();
    assert_eq!(err["kind"], "validation_error");

    alice.send(ping()).await.unwrap();
    let pong: Value = alice.recv().await.unwrap();
    assert_eq!(pong["event"], "pong");
}

#[tokio::test]
async fn test_binary_frame_closes_connection() {
    let gateway = TestGateway::start().await.unwrap();
    let mut alice = gateway.connect("alice").await.unwrap();

    alice.send_binary(vec![0xde, 0xad]).await.unwrap();

    assert_eq!(alice.expect_close().await.unwrap(), Closed::Code(4002));
    gateway
        .wait_until(|engine| engine.stats().connections == 0)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.connect_raw("not-a-jwt").await.unwrap();

    let err = client.recv_event("error").await.unwrap();
    assert_eq!(err["kind"], "auth_failure");
    assert_eq!(client.expect_close().await.unwrap(), Closed::Code(4004));
    assert_eq!(gateway.stats().connections, 0);
}

#[tokio::test]
async fn test_idle_connection_times_out() {
    let gateway = TestGateway::start_with(&[("RELAY_HEARTBEAT_TIMEOUT_MS", "200")])
        .await
        .unwrap();
    let mut alice = gateway.connect("alice").await.unwrap();
    alice.send(join_room("r1")).await.unwrap();
    alice.recv_event("system_message").await.unwrap();

    assert_eq!(alice.expect_close().await.unwrap(), Closed::Code(4009));
    gateway
        .wait_until(|engine| engine.stats().connections == 0 && engine.stats().rooms == 0)
        .await
        .unwrap();
}

// ============================================================================
// Anonymous connections
// ============================================================================

#[tokio::test]
async fn test_anonymous_room_send_denied_by_default() {
    let gateway = TestGateway::start().await.unwrap();
    let mut anon = gateway.connect_anonymous().await.unwrap();

    anon.send(join_room("lobby")).await.unwrap();
    anon.recv_event("system_message").await.unwrap();
    anon.send(send_room_message("lobby", "hello?")).await.unwrap();

    let err = anon.recv_event("error").await.unwrap();
    assert_eq!(err["kind"], "unauthenticated");
    assert_eq!(gateway.stats().online_users, 0);
}

#[tokio::test]
async fn test_anonymous_room_send_when_allowed() {
    let gateway = TestGateway::start_with(&[("RELAY_ALLOW_ANONYMOUS_ROOM_MESSAGES", "true")])
        .await
        .unwrap();
    let mut anon = gateway.connect_anonymous().await.unwrap();
    anon.send(join_room("lobby")).await.unwrap();
    anon.recv_event("system_message").await.unwrap();

    anon.send(send_room_message("lobby", "hello")).await.unwrap();

    let message = anon.recv_event("new_message").await.unwrap();
    assert_eq!(message["sender_id"], "anonymous");
}

#[tokio::test]
async fn test_anonymous_connect_refused_when_disabled() {
    let gateway = TestGateway::start_with(&[("RELAY_ALLOW_ANONYMOUS_CONNECTIONS", "false")])
        .await
        .unwrap();
    let mut client = integration_tests::WsClient::connect(&gateway.ws_url())
        .await
        .unwrap();

    let err = client.recv_event("error").await.unwrap();
    assert_eq!(err["kind"], "unauthenticated");
    assert_eq!(client.expect_close().await.unwrap(), Closed::Code(4004));
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn test_room_history_over_socket_and_http() {
    let gateway = TestGateway::start().await.unwrap();
    let mut alice = gateway.connect("alice").await.unwrap();
    for content in ["one", "two", "three"] {
        alice.send(send_room_message("r1", content)).await.unwrap();
        alice.recv_event("message_sent").await.unwrap();
    }

    alice.send(fetch_room_history("r1", Some(2))).await.unwrap();
    let history = alice.recv_event("history").await.unwrap();
    assert_eq!(history["scope"]["kind"], "room");
    let contents: Vec<_> = history["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].clone())
        .collect();
    assert_eq!(contents, ["three", "two"]);

    let response = gateway
        .get_auth("/rooms/r1/messages?offset=1", &gateway.token("bob"))
        .await
        .unwrap();
    let page: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(page["messages"].as_array().unwrap().len(), 2);
    assert_eq!(page["messages"][0]["content"], "two");

    let response = gateway.get("/rooms/r1/messages").await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_and_stats() {
    let gateway = TestGateway::start().await.unwrap();
    let response = gateway.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");

    let _alice = gateway.connect("alice").await.unwrap();
    let _anon = gateway.connect_anonymous().await.unwrap();

    let response = gateway.get("/stats").await.unwrap();
    let stats: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(stats["online_users"], 1);
    assert_eq!(stats["connections"], 2);
}
