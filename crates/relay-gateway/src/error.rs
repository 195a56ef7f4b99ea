//! Relay error types
//!
//! Every failed relay operation maps to exactly one [`ErrorKind`], which is
//! what clients see on the wire.

use crate::connection::ConnectionState;
use relay_core::{AuthError, DomainError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Client-visible error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    Unauthenticated,
    InvalidState,
    PersistenceError,
    AuthFailure,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidState => "invalid_state",
            Self::PersistenceError => "persistence_error",
            Self::AuthFailure => "auth_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a message could not be persisted
#[derive(Debug, Error)]
pub enum PersistFailure {
    #[error(transparent)]
    Store(#[from] DomainError),

    #[error("store did not answer within {0:?}")]
    TimedOut(Duration),

    #[error("persistence task aborted")]
    Aborted,
}

/// Relay operation error
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed or missing request fields
    #[error("{0}")]
    Validation(String),

    /// The operation needs an identity the connection does not have
    #[error("This action requires an authenticated user")]
    Unauthenticated,

    /// The connection is not in a state that accepts the request
    #[error("Connection is {0}")]
    InvalidState(ConnectionState),

    /// The message store failed or timed out; nothing was delivered
    #[error("{message}")]
    Persistence {
        message: &'static str,
        #[source]
        source: PersistFailure,
    },

    /// The authenticator rejected the connect credentials
    #[error("Authentication failed: {0}")]
    AuthFailure(#[from] AuthError),
}

impl RelayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Persistence { .. } => ErrorKind::PersistenceError,
            Self::AuthFailure(_) => ErrorKind::AuthFailure,
        }
    }

    /// Errors the client can fix by changing its request
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Unauthenticated)
    }
}

/// Relay result type
pub type RelayResult<T> = Result<T, RelayError>;
