//! Integration test utilities for the chat relay
//!
//! Boots the gateway on an ephemeral port with the in-process message
//! store and drives it with real WebSocket and HTTP clients.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
