//! # relay-core
//!
//! Domain layer for the chat relay: message records, user and room identities,
//! and the collaborator traits (message store, authenticator) the relay consumes.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{ChatMessage, MessageTarget, NewMessage};
pub use error::DomainError;
pub use traits::{
    AuthError, Authenticator, ConnectContext, HistoryQuery, MessageStore, StoreResult,
};
pub use value_objects::{IdParseError, MessageId, MessageIdGenerator, RoomId, UserId};
