//! # relay-store
//!
//! `MessageStore` implementations for the chat relay.
//!
//! ## Overview
//!
//! - [`PgMessageStore`]: durable storage in PostgreSQL via SQLx
//! - [`InMemoryMessageStore`]: process-local storage for development and tests
//!
//! Both assign time-ordered message ids and return history newest first.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_core::{MessageIdGenerator, MessageStore};
//! use relay_store::{create_pool, ensure_schema, DatabaseConfig, PgMessageStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::from_env()).await?;
//!     ensure_schema(&pool).await?;
//!     let store = PgMessageStore::new(pool, MessageIdGenerator::new(0));
//!
//!     // Use the store...
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;
pub mod schema;

// Re-export commonly used types
pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use repositories::{InMemoryMessageStore, PgMessageStore};
pub use schema::ensure_schema;
