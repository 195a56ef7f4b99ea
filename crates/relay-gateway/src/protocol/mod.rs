//! Relay protocol definitions
//!
//! Defines the WebSocket event format, payloads, and close codes.

mod close_codes;
mod messages;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::{ClientEvent, ServerEvent};
pub use payloads::{
    DeliveryStatus, DirectHistoryRequest, ErrorPayload, HistoryPayload, HistoryScope,
    MessagePayload, MessageSentPayload, MessageStatusPayload, RoomHistoryRequest, RoomRequest,
    SendDirectMessage, SendRoomMessage, SystemNotice,
};
