//! Client event builders
//!
//! JSON shapes exactly as a browser client would send them.

use serde_json::{json, Value};

pub fn join_room(room_id: &str) -> Value {
    json!({ "event": "join_room", "data": { "room_id": room_id } })
}

pub fn leave_room(room_id: &str) -> Value {
    json!({ "event": "leave_room", "data": { "room_id": room_id } })
}

pub fn send_room_message(room_id: &str, content: &str) -> Value {
    json!({
        "event": "send_room_message",
        "data": { "room_id": room_id, "content": content }
    })
}

/// Room send that also claims a sender id
pub fn send_room_message_as(room_id: &str, content: &str, sender_id: &str) -> Value {
    json!({
        "event": "send_room_message",
        "data": { "room_id": room_id, "content": content, "sender_id": sender_id }
    })
}

pub fn send_direct_message(receiver_id: &str, content: &str) -> Value {
    json!({
        "event": "send_direct_message",
        "data": { "receiver_id": receiver_id, "content": content }
    })
}

pub fn fetch_room_history(room_id: &str, limit: Option<i64>) -> Value {
    json!({
        "event": "fetch_room_history",
        "data": { "room_id": room_id, "limit": limit }
    })
}

pub fn fetch_direct_history(user_id: &str) -> Value {
    json!({ "event": "fetch_direct_history", "data": { "user_id": user_id } })
}

pub fn ping() -> Value {
    json!({ "event": "ping" })
}
