//! Handler error types

use crate::error::RelayError;
use crate::protocol::{CloseCode, ServerEvent};
use std::time::Duration;
use thiserror::Error;

/// Failures raised by the socket adapter itself
///
/// Event-level failures inside the engine are [`RelayError`]s and never
/// close the connection. These decide whether the client gets an `error`
/// event, a close frame, or both.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Text frame that is not a known client event
    #[error("Malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Binary frames are never accepted
    #[error("Binary frames are not supported")]
    BinaryFrame,

    /// Connect refused by the authenticator or the anonymous policy
    #[error("Connect rejected: {0}")]
    Rejected(#[source] RelayError),

    /// No inbound traffic within the heartbeat timeout
    #[error("Connection idle for {}ms", .0.as_millis())]
    IdleTimeout(Duration),

    /// Socket read failed
    #[error("Transport error: {0}")]
    Transport(#[from] axum::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Convert to a close code (if applicable)
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Malformed(_) => None,
            Self::BinaryFrame => Some(CloseCode::DecodeError),
            Self::Rejected(_) => Some(CloseCode::AuthenticationFailed),
            Self::IdleTimeout(_) => Some(CloseCode::SessionTimeout),
            Self::Transport(_) | Self::Internal(_) => Some(CloseCode::UnknownError),
        }
    }

    /// Error event owed to the client before any close frame
    pub fn to_event(&self) -> Option<ServerEvent> {
        match self {
            Self::Malformed(_) => Some(ServerEvent::error(&RelayError::validation(
                self.to_string(),
            ))),
            Self::Rejected(e) => Some(ServerEvent::error(e)),
            Self::BinaryFrame | Self::IdleTimeout(_) | Self::Transport(_) | Self::Internal(_) => {
                None
            }
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
