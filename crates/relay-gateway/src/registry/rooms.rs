//! Room membership
//!
//! Rooms exist only while they have members; the last `leave` prunes the
//! entry. A reverse index per connection makes `leave_all` proportional to
//! the rooms that connection joined.

use crate::connection::ConnectionId;
use parking_lot::RwLock;
use relay_core::RoomId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct Memberships {
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
    joined: HashMap<ConnectionId, HashSet<RoomId>>,
}

/// Which connections are members of which rooms
#[derive(Debug, Default)]
pub struct RoomRegistry {
    inner: RwLock<Memberships>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection` to `room`, creating the room on first join
    ///
    /// Returns `false` if the connection was already a member.
    pub fn join(&self, room: &RoomId, connection: ConnectionId) -> bool {
        let mut memberships = self.inner.write();
        let added = memberships
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(connection);
        if added {
            memberships
                .joined
                .entry(connection)
                .or_default()
                .insert(room.clone());
        }
        added
    }

    /// Remove `connection` from `room`. No-op if it was not a member.
    pub fn leave(&self, room: &RoomId, connection: ConnectionId) -> bool {
        let mut memberships = self.inner.write();

        let removed = match memberships.rooms.get_mut(room) {
            Some(members) => {
                let removed = members.remove(&connection);
                if members.is_empty() {
                    memberships.rooms.remove(room);
                    tracing::trace!(room_id = %room, "Room pruned");
                }
                removed
            }
            None => false,
        };

        if removed {
            if let Some(rooms) = memberships.joined.get_mut(&connection) {
                rooms.remove(room);
                if rooms.is_empty() {
                    memberships.joined.remove(&connection);
                }
            }
        }
        removed
    }

    /// Remove `connection` from every room it joined, returning those rooms
    pub fn leave_all(&self, connection: ConnectionId) -> Vec<RoomId> {
        let mut memberships = self.inner.write();
        let Some(rooms) = memberships.joined.remove(&connection) else {
            return Vec::new();
        };

        for room in &rooms {
            if let Some(members) = memberships.rooms.get_mut(room) {
                members.remove(&connection);
                if members.is_empty() {
                    memberships.rooms.remove(room);
                }
            }
        }
        rooms.into_iter().collect()
    }

    /// Snapshot of the room's members at call time
    pub fn members(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.inner
            .read()
            .rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, room: &RoomId, connection: ConnectionId) -> bool {
        self.inner
            .read()
            .rooms
            .get(room)
            .is_some_and(|members| members.contains(&connection))
    }

    /// Rooms `connection` is currently a member of
    pub fn rooms_of(&self, connection: ConnectionId) -> Vec<RoomId> {
        self.inner
            .read()
            .joined
            .get(&connection)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of non-empty rooms
    pub fn room_count(&self) -> usize {
        self.inner.read().rooms.len()
    }
}
