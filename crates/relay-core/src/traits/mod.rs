//! Collaborator traits (ports)
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

mod auth;
mod store;

pub use auth::{AuthError, Authenticator, ConnectContext};
pub use store::{HistoryQuery, MessageStore, StoreResult};
