//! Event delivery to connections

mod outbound;

pub use outbound::OutboundHub;

use crate::connection::ConnectionId;
use crate::protocol::ServerEvent;

/// Pushes server events to connections
///
/// Delivery is best-effort and fire-and-forget: `emit` returns without
/// waiting for any target, and a slow or closed target never affects the
/// others.
pub trait DeliveryTransport: Send + Sync {
    fn emit(&self, event: &ServerEvent, targets: &[ConnectionId]);
}
