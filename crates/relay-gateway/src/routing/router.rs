//! Message router
//!
//! Every send is validated, attributed to the identity the presence registry
//! holds for the sending connection, persisted, and only then delivered.
//! No registry lock is held while the store or the transport is called.

use super::{DirectDelivery, RoomDelivery};
use crate::connection::Connection;
use crate::delivery::DeliveryTransport;
use crate::error::{PersistFailure, RelayError, RelayResult};
use crate::protocol::ServerEvent;
use crate::registry::{PresenceRegistry, RoomRegistry};
use relay_common::RelayConfig;
use relay_core::{ChatMessage, DomainError, MessageStore, NewMessage, RoomId, UserId};
use std::sync::Arc;
use std::time::Duration;

const ROOM_PERSIST_FAILED: &str = "Could not save message to room.";
const DIRECT_PERSIST_FAILED: &str = "Could not save direct message.";
/// Content bytes shown in routing logs
const LOG_PREVIEW_LEN: usize = 32;

/// Knobs that shape how sends are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
    /// Accept room sends from connections without an identity
    pub allow_anonymous_room_messages: bool,
    /// Maximum content length in characters
    pub max_content_length: usize,
    /// Upper bound on a single store write
    pub persist_timeout: Duration,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for RoutingPolicy {
    fn from(config: &RelayConfig) -> Self {
        Self {
            allow_anonymous_room_messages: config.allow_anonymous_room_messages,
            max_content_length: config.max_content_length,
            persist_timeout: config.persist_timeout(),
        }
    }
}

/// Persists and delivers room and direct messages
pub struct MessageRouter {
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomRegistry>,
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn DeliveryTransport>,
    policy: RoutingPolicy,
}

impl MessageRouter {
    pub fn new(
        presence: Arc<PresenceRegistry>,
        rooms: Arc<RoomRegistry>,
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn DeliveryTransport>,
        policy: RoutingPolicy,
    ) -> Self {
        Self {
            presence,
            rooms,
            store,
            transport,
            policy,
        }
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Persist a room message and fan it out to the room's current members
    ///
    /// `claimed_sender` is whatever the client put in the request. It never
    /// decides attribution.
    pub async fn send_room_message(
        &self,
        connection: &Connection,
        room: RoomId,
        content: String,
        claimed_sender: Option<String>,
    ) -> RelayResult<RoomDelivery> {
        if room.is_blank() {
            return Err(RelayError::validation("room_id is required"));
        }
        self.validate_content(&content)?;
        Self::ensure_active(connection)?;

        let sender = match self.presence.identity_of(connection.id()) {
            Some(identity) => identity,
            // Only connections that never had an identity count as anonymous
            None if self.policy.allow_anonymous_room_messages && connection.identity().is_none() => {
                UserId::anonymous()
            }
            None => return Err(RelayError::Unauthenticated),
        };

        if let Some(claimed) = claimed_sender.filter(|c| c != sender.as_str()) {
            tracing::debug!(
                connection_id = %connection.id(),
                sender = %sender,
                claimed = %claimed,
                "Ignoring client-claimed sender"
            );
        }

        let message = self
            .persist(NewMessage::room(sender, room.clone(), content), ROOM_PERSIST_FAILED)
            .await?;

        let members = self.rooms.members(&room);
        self.transport
            .emit(&ServerEvent::new_message(&message), &members);

        tracing::debug!(
            message_id = %message.id,
            room_id = %room,
            recipients = members.len(),
            preview = message.preview(LOG_PREVIEW_LEN),
            "Room message routed"
        );

        Ok(RoomDelivery {
            message,
            recipients: members.len(),
        })
    }

    /// Persist a direct message and push it to the receiver if they are online
    pub async fn send_direct_message(
        &self,
        connection: &Connection,
        receiver: UserId,
        content: String,
    ) -> RelayResult<DirectDelivery> {
        if receiver.is_blank() {
            return Err(RelayError::validation("receiver_id is required"));
        }
        if receiver.is_anonymous() {
            return Err(RelayError::validation(
                "Anonymous users cannot receive direct messages",
            ));
        }
        self.validate_content(&content)?;
        Self::ensure_active(connection)?;

        let sender = self
            .presence
            .identity_of(connection.id())
            .ok_or(RelayError::Unauthenticated)?;

        let message = self
            .persist(
                NewMessage::direct(sender, receiver.clone(), content),
                DIRECT_PERSIST_FAILED,
            )
            .await?;

        // Presence is read after the write completes
        match self.presence.lookup(&receiver) {
            Some(target) => {
                self.transport.emit(&ServerEvent::new_dm(&message), &[target]);
                tracing::debug!(
                    message_id = %message.id,
                    receiver = %receiver,
                    preview = message.preview(LOG_PREVIEW_LEN),
                    "Direct message delivered"
                );
                Ok(DirectDelivery::Delivered { message })
            }
            None => {
                tracing::debug!(
                    message_id = %message.id,
                    receiver = %receiver,
                    preview = message.preview(LOG_PREVIEW_LEN),
                    "Receiver offline, message stored"
                );
                Ok(DirectDelivery::RecipientOffline { message })
            }
        }
    }

    fn validate_content(&self, content: &str) -> RelayResult<()> {
        if content.trim().is_empty() {
            return Err(RelayError::validation("content is required"));
        }
        let max = self.policy.max_content_length;
        if content.chars().count() > max {
            return Err(RelayError::validation(
                DomainError::ContentTooLong { max }.to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_active(connection: &Connection) -> RelayResult<()> {
        if connection.is_active() {
            Ok(())
        } else {
            Err(RelayError::validation(format!(
                "Connection is {}",
                connection.state()
            )))
        }
    }

    /// Write through the store on a detached task bounded by the persist timeout
    ///
    /// Dropping the caller (its connection closed mid-send) does not abort the write.
    async fn persist(
        &self,
        message: NewMessage,
        failure: &'static str,
    ) -> RelayResult<ChatMessage> {
        let store = Arc::clone(&self.store);
        let timeout = self.policy.persist_timeout;
        let task =
            tokio::spawn(async move { tokio::time::timeout(timeout, store.append(message)).await });

        let source = match task.await {
            Ok(Ok(Ok(persisted))) => return Ok(persisted),
            Ok(Ok(Err(e))) => PersistFailure::Store(e),
            Ok(Err(_elapsed)) => PersistFailure::TimedOut(timeout),
            Err(e) => {
                tracing::error!(error = %e, "Persistence task failed");
                PersistFailure::Aborted
            }
        };

        tracing::warn!(error = %source, "Message not persisted");
        Err(RelayError::Persistence {
            message: failure,
            source,
        })
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
