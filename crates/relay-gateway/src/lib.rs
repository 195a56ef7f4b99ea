//! # relay-gateway
//!
//! Presence and routing engine for the chat relay, plus the WebSocket
//! gateway and HTTP history endpoints that expose it.
//!
//! ## Overview
//!
//! - [`registry`]: who is online (`PresenceRegistry`) and who is in which room (`RoomRegistry`)
//! - [`connection`]: connection state machine and connect/disconnect orchestration
//! - [`routing`]: validate, persist, then deliver room and direct messages
//! - [`delivery`]: per-connection outbound queues
//! - [`engine`]: the facade the transport talks to
//! - [`server`]: axum WebSocket and HTTP surface

pub mod connection;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod routing;
pub mod server;

#[cfg(test)]
mod testing;

pub use engine::{RelayEngine, RelayStats};
pub use error::{ErrorKind, RelayError, RelayResult};
pub use server::{create_app, create_gateway_state, run, serve, GatewayState};
