//! Identity to connection mapping
//!
//! One live connection per identity. Both directions are kept so that
//! disconnect cleanup can find the identity from the connection alone.

use crate::connection::ConnectionId;
use parking_lot::RwLock;
use relay_core::UserId;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct PresenceMaps {
    by_user: HashMap<UserId, ConnectionId>,
    by_connection: HashMap<ConnectionId, UserId>,
}

/// Which connection currently represents which identity
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    inner: RwLock<PresenceMaps>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `identity` to `connection`, replacing any previous mapping
    ///
    /// Returns the connection that was superseded, if any. The superseded
    /// connection loses its reverse mapping, so a later `unregister` for it
    /// leaves the new mapping untouched.
    pub fn register(&self, identity: UserId, connection: ConnectionId) -> Option<ConnectionId> {
        let mut maps = self.inner.write();

        // A connection represents at most one identity
        if let Some(previous) = maps.by_connection.remove(&connection) {
            if previous != identity && maps.by_user.get(&previous) == Some(&connection) {
                maps.by_user.remove(&previous);
            }
        }

        let superseded = maps
            .by_user
            .insert(identity.clone(), connection)
            .filter(|old| *old != connection);
        if let Some(old) = superseded {
            maps.by_connection.remove(&old);
        }
        maps.by_connection.insert(connection, identity.clone());

        if let Some(old) = superseded {
            tracing::debug!(
                user_id = %identity,
                connection_id = %connection,
                superseded = %old,
                "Presence superseded"
            );
        } else {
            tracing::trace!(user_id = %identity, connection_id = %connection, "Presence registered");
        }

        superseded
    }

    /// Remove the mapping owned by `connection`; no-op if it has none
    pub fn unregister(&self, connection: ConnectionId) -> Option<UserId> {
        let mut maps = self.inner.write();
        let identity = maps.by_connection.remove(&connection)?;

        if maps.by_user.get(&identity) == Some(&connection) {
            maps.by_user.remove(&identity);
        } else {
            tracing::warn!(
                user_id = %identity,
                connection_id = %connection,
                "Presence maps disagreed during unregister"
            );
        }

        Some(identity)
    }

    /// Connection currently mapped to `identity`
    pub fn lookup(&self, identity: &UserId) -> Option<ConnectionId> {
        self.inner.read().by_user.get(identity).copied()
    }

    /// Identity currently mapped to `connection`
    pub fn identity_of(&self, connection: ConnectionId) -> Option<UserId> {
        self.inner.read().by_connection.get(&connection).cloned()
    }

    pub fn is_online(&self, identity: &UserId) -> bool {
        self.inner.read().by_user.contains_key(identity)
    }

    /// Number of identities with a live connection
    pub fn online_count(&self) -> usize {
        self.inner.read().by_user.len()
    }
}
