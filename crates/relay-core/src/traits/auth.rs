//! Authenticator port

use async_trait::async_trait;
use thiserror::Error;

use crate::value_objects::UserId;

/// What the transport knows about a connection at connect time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectContext {
    /// Bearer credential, if the client presented one
    pub token: Option<String>,
    /// Peer address as reported by the transport
    pub remote_addr: Option<String>,
}

impl ConnectContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            remote_addr: None,
        }
    }
}

/// Authentication failures; any of these rejects the connection
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve the identity behind a connection
    ///
    /// `Ok(None)` means the connection is anonymous.
    async fn resolve(&self, ctx: &ConnectContext) -> Result<Option<UserId>, AuthError>;
}
