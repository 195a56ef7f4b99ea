//! Individual relay connection
//!
//! A connection moves `Connecting -> Active -> Closed` (or straight from
//! `Connecting` to `Closed` when authentication is rejected). Transitions
//! and the registry mutations that must agree with them run under the
//! connection's own state lock.

use parking_lot::Mutex;
use relay_core::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Opaque handle for one live transport-level connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh random id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Transport open, authentication pending
    Connecting,
    /// Authenticated (or anonymous) and accepting requests
    Active,
    /// Terminal
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Lifecycle {
    state: ConnectionState,
    identity: Option<UserId>,
}

/// A single relay connection
pub struct Connection {
    id: ConnectionId,
    lifecycle: Mutex<Lifecycle>,
    last_activity: Mutex<Instant>,
    created_at: Instant,
}

impl Connection {
    /// Create a new connection in the `Connecting` state
    pub fn new() -> Arc<Self> {
        Self::with_id(ConnectionId::new())
    }

    pub fn with_id(id: ConnectionId) -> Arc<Self> {
        let now = Instant::now();
        Arc::new(Self {
            id,
            lifecycle: Mutex::new(Lifecycle {
                state: ConnectionState::Connecting,
                identity: None,
            }),
            last_activity: Mutex::new(now),
            created_at: now,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Identity resolved at connect time, `None` for anonymous connections
    pub fn identity(&self) -> Option<UserId> {
        self.lifecycle.lock().identity.clone()
    }

    /// Move `Connecting -> Active`, running `on_activate` while the state lock is held
    ///
    /// Returns `false` (and skips `on_activate`) if the connection already left
    /// `Connecting`, e.g. because it was closed while authentication was pending.
    pub(crate) fn activate<F>(&self, identity: Option<UserId>, on_activate: F) -> bool
    where
        F: FnOnce(),
    {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != ConnectionState::Connecting {
            return false;
        }
        on_activate();
        lifecycle.state = ConnectionState::Active;
        lifecycle.identity = identity;
        true
    }

    /// Run `f` only if the connection is `Active`, holding the state lock throughout
    pub(crate) fn while_active<T, F>(&self, f: F) -> Result<T, ConnectionState>
    where
        F: FnOnce() -> T,
    {
        let lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            ConnectionState::Active => Ok(f()),
            other => Err(other),
        }
    }

    /// Move to `Closed`. Returns `true` only for the call that performed the transition.
    pub(crate) fn close(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state == ConnectionState::Closed {
            return false;
        }
        lifecycle.state = ConnectionState::Closed;
        true
    }

    /// Record inbound traffic for the idle timer
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last inbound frame
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.lifecycle.lock();
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &lifecycle.state)
            .field("identity", &lifecycle.identity)
            .field("created_at", &self.created_at)
            .finish()
    }
}
