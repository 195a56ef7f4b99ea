//! Value objects - immutable identifiers

mod identity;
mod message_id;

pub use identity::{RoomId, UserId};
pub use message_id::{IdParseError, MessageId, MessageIdGenerator};
