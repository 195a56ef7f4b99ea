//! Test doubles for relay collaborators

use crate::connection::ConnectionId;
use crate::delivery::DeliveryTransport;
use crate::protocol::ServerEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{
    AuthError, Authenticator, ChatMessage, ConnectContext, DomainError, HistoryQuery,
    MessageStore, NewMessage, RoomId, StoreResult, UserId,
};
use relay_store::InMemoryMessageStore;
use std::time::Duration;

/// Remembers every emit instead of delivering it
#[derive(Debug, Default)]
pub struct RecordingTransport {
    emitted: Mutex<Vec<(ServerEvent, Vec<ConnectionId>)>>,
}

impl RecordingTransport {
    pub fn events(&self) -> Vec<(ServerEvent, Vec<ConnectionId>)> {
        self.emitted.lock().clone()
    }
}

impl DeliveryTransport for RecordingTransport {
    fn emit(&self, event: &ServerEvent, targets: &[ConnectionId]) {
        self.emitted.lock().push((event.clone(), targets.to_vec()));
    }
}

/// Store whose every call fails
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn append(&self, _message: NewMessage) -> StoreResult<ChatMessage> {
        Err(DomainError::StoreUnavailable("store is down".into()))
    }

    async fn query_by_room(
        &self,
        _room_id: &RoomId,
        _query: HistoryQuery,
    ) -> StoreResult<Vec<ChatMessage>> {
        Err(DomainError::StoreUnavailable("store is down".into()))
    }

    async fn query_by_participants(
        &self,
        _a: &UserId,
        _b: &UserId,
        _query: HistoryQuery,
    ) -> StoreResult<Vec<ChatMessage>> {
        Err(DomainError::StoreUnavailable("store is down".into()))
    }
}

/// In-memory store that sleeps before every append
#[derive(Debug)]
pub struct SlowStore {
    delay: Duration,
    inner: InMemoryMessageStore,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: InMemoryMessageStore::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl MessageStore for SlowStore {
    async fn append(&self, message: NewMessage) -> StoreResult<ChatMessage> {
        tokio::time::sleep(self.delay).await;
        self.inner.append(message).await
    }

    async fn query_by_room(
        &self,
        room_id: &RoomId,
        query: HistoryQuery,
    ) -> StoreResult<Vec<ChatMessage>> {
        self.inner.query_by_room(room_id, query).await
    }

    async fn query_by_participants(
        &self,
        a: &UserId,
        b: &UserId,
        query: HistoryQuery,
    ) -> StoreResult<Vec<ChatMessage>> {
        self.inner.query_by_participants(a, b, query).await
    }
}

/// Token is the user id; `"bad"` is rejected and no token is anonymous
#[derive(Debug, Default)]
pub struct StaticAuthenticator;

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn resolve(&self, context: &ConnectContext) -> Result<Option<UserId>, AuthError> {
        match context.token.as_deref() {
            None => Ok(None),
            Some("bad") => Err(AuthError::InvalidToken),
            Some(token) => Ok(Some(UserId::new(token))),
        }
    }
}
