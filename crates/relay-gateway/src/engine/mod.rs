//! Relay engine
//!
//! Single entry point the transport layer talks to. Owns the registries,
//! the outbound hub, the lifecycle and the router, and wires them to the
//! injected message store and authenticator.


use crate::connection::{Connection, ConnectionLifecycle};
use crate::delivery::{DeliveryTransport, OutboundHub};
use crate::error::{PersistFailure, RelayError, RelayResult};
use crate::protocol::ServerEvent;
use crate::registry::{PresenceRegistry, RoomRegistry};
use crate::routing::{DirectDelivery, MessageRouter, RoomDelivery, RoutingPolicy};
use relay_common::RelayConfig;
use relay_core::{
    Authenticator, ChatMessage, ConnectContext, HistoryQuery, MessageStore, RoomId, UserId,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const HISTORY_FAILED: &str = "Could not load message history.";

/// Point-in-time counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Identities with a live connection
    pub online_users: usize,
    /// Attached connections, anonymous ones included
    pub connections: usize,
    /// Rooms with at least one member
    pub rooms: usize,
}

/// Presence and routing engine
pub struct RelayEngine {
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomRegistry>,
    outbound: Arc<OutboundHub>,
    store: Arc<dyn MessageStore>,
    lifecycle: ConnectionLifecycle,
    router: MessageRouter,
    outbound_buffer: usize,
    persist_timeout: Duration,
}

impl RelayEngine {
    pub fn new(
        store: Arc<dyn MessageStore>,
        authenticator: Arc<dyn Authenticator>,
        config: &RelayConfig,
    ) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let rooms = Arc::new(RoomRegistry::new());
        let outbound = OutboundHub::new_shared(config.delivery_timeout());

        let lifecycle = ConnectionLifecycle::new(
            presence.clone(),
            rooms.clone(),
            outbound.clone(),
            authenticator,
            config.allow_anonymous_connections,
        );
        let router = MessageRouter::new(
            presence.clone(),
            rooms.clone(),
            store.clone(),
            outbound.clone(),
            RoutingPolicy::from(config),
        );

        Self {
            presence,
            rooms,
            outbound,
            store,
            lifecycle,
            router,
            outbound_buffer: config.outbound_buffer.max(1),
            persist_timeout: config.persist_timeout(),
        }
    }

    /// Create a new engine wrapped in Arc
    pub fn new_shared(
        store: Arc<dyn MessageStore>,
        authenticator: Arc<dyn Authenticator>,
        config: &RelayConfig,
    ) -> Arc<Self> {
        Arc::new(Self::new(store, authenticator, config))
    }

    /// Bounded outbound queue sized for this engine
    pub fn outbound_channel(&self) -> (mpsc::Sender<ServerEvent>, mpsc::Receiver<ServerEvent>) {
        mpsc::channel(self.outbound_buffer)
    }

    // === Lifecycle ===

    pub async fn connect(
        &self,
        context: &ConnectContext,
        sender: mpsc::Sender<ServerEvent>,
    ) -> RelayResult<Arc<Connection>> {
        self.lifecycle.connect(context, sender).await
    }

    pub fn disconnect(&self, connection: &Connection) -> bool {
        self.lifecycle.disconnect(connection)
    }

    pub fn join_room(&self, connection: &Connection, room: &RoomId) -> RelayResult<bool> {
        self.lifecycle.join_room(connection, room)
    }

    pub fn leave_room(&self, connection: &Connection, room: &RoomId) -> RelayResult<bool> {
        self.lifecycle.leave_room(connection, room)
    }

    // === Routing ===

    pub async fn send_room_message(
        &self,
        connection: &Connection,
        room: RoomId,
        content: String,
        claimed_sender: Option<String>,
    ) -> RelayResult<RoomDelivery> {
        self.router
            .send_room_message(connection, room, content, claimed_sender)
            .await
    }

    pub async fn send_direct_message(
        &self,
        connection: &Connection,
        receiver: UserId,
        content: String,
    ) -> RelayResult<DirectDelivery> {
        self.router
            .send_direct_message(connection, receiver, content)
            .await
    }

    /// Push an event to a single connection
    pub fn reply(&self, connection: &Connection, event: ServerEvent) {
        self.outbound.emit(&event, &[connection.id()]);
    }

    // === History ===

    /// Room history, newest first
    pub async fn room_history(
        &self,
        room: &RoomId,
        query: HistoryQuery,
    ) -> RelayResult<Vec<ChatMessage>> {
        if room.is_blank() {
            return Err(RelayError::validation("room_id is required"));
        }
        self.bounded(self.store.query_by_room(room, query)).await
    }

    /// Direct messages between `a` and `b` in either direction, newest first
    pub async fn direct_history(
        &self,
        a: &UserId,
        b: &UserId,
        query: HistoryQuery,
    ) -> RelayResult<Vec<ChatMessage>> {
        if b.is_blank() {
            return Err(RelayError::validation("user_id is required"));
        }
        self.bounded(self.store.query_by_participants(a, b, query))
            .await
    }

    async fn bounded<F>(&self, query: F) -> RelayResult<Vec<ChatMessage>>
    where
        F: std::future::Future<Output = relay_core::StoreResult<Vec<ChatMessage>>>,
    {
        let source = match tokio::time::timeout(self.persist_timeout, query).await {
            Ok(Ok(messages)) => return Ok(messages),
            Ok(Err(e)) => PersistFailure::Store(e),
            Err(_elapsed) => PersistFailure::TimedOut(self.persist_timeout),
        };

        tracing::warn!(error = %source, "History query failed");
        Err(RelayError::Persistence {
            message: HISTORY_FAILED,
            source,
        })
    }

    // === Introspection ===

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            online_users: self.presence.online_count(),
            connections: self.outbound.connection_count(),
            rooms: self.rooms.room_count(),
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }
}

impl std::fmt::Debug for RelayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayEngine")
            .field("stats", &self.stats())
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
