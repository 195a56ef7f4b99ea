//! Results of a routed send

use relay_core::ChatMessage;

/// A room message that was persisted and fanned out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDelivery {
    pub message: ChatMessage,
    /// Size of the membership snapshot the message was emitted to
    pub recipients: usize,
}

/// A direct message that was persisted
///
/// Both variants mean success; an offline receiver is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectDelivery {
    /// The receiver had a live connection and `new_dm` was emitted to it
    Delivered { message: ChatMessage },
    /// Stored for later retrieval through history
    RecipientOffline { message: ChatMessage },
}

impl DirectDelivery {
    pub fn message(&self) -> &ChatMessage {
        match self {
            Self::Delivered { message } | Self::RecipientOffline { message } => message,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}
