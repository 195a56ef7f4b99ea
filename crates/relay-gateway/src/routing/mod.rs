//! Message routing

mod outcome;
mod router;

pub use outcome::{DirectDelivery, RoomDelivery};
pub use router::{MessageRouter, RoutingPolicy};
