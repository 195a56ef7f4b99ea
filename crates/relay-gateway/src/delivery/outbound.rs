//! Outbound hub
//!
//! Owns the sending half of every connection's outbound queue, using
//! `DashMap` for concurrent access. Emits never wait on a slow peer: a
//! full queue parks the event in a per-connection backlog drained by one
//! background task, so events for a connection keep their emit order. The
//! drain stops when the connection detaches.

use super::DeliveryTransport;
use crate::connection::ConnectionId;
use crate::protocol::ServerEvent;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{mpsc, watch};

/// Events waiting for room in a full queue
#[derive(Default)]
struct Backlog {
    events: VecDeque<ServerEvent>,
    /// A drain task owns delivery while this is set
    draining: bool,
}

struct Outbound {
    sender: mpsc::Sender<ServerEvent>,
    backlog: Arc<Mutex<Backlog>>,
    /// Dropped on detach, which stops the drain task for this connection
    cancel: watch::Sender<()>,
}

/// Routes server events onto per-connection outbound queues
pub struct OutboundHub {
    connections: DashMap<ConnectionId, Outbound>,
    delivery_timeout: Duration,
}

impl OutboundHub {
    /// Create a new hub
    #[must_use]
    pub fn new(delivery_timeout: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            delivery_timeout,
        }
    }

    /// Create a new hub wrapped in Arc
    #[must_use]
    pub fn new_shared(delivery_timeout: Duration) -> Arc<Self> {
        Arc::new(Self::new(delivery_timeout))
    }

    /// Register the outbound queue for a connection
    pub fn attach(&self, connection: ConnectionId, sender: mpsc::Sender<ServerEvent>) {
        let (cancel, _) = watch::channel(());
        self.connections.insert(
            connection,
            Outbound {
                sender,
                backlog: Arc::default(),
                cancel,
            },
        );

        tracing::debug!(connection_id = %connection, "Outbound queue attached");
    }

    /// Drop the outbound queue, discarding any backlog still waiting on it
    pub fn detach(&self, connection: ConnectionId) -> bool {
        let removed = self.connections.remove(&connection).is_some();
        if removed {
            tracing::debug!(connection_id = %connection, "Outbound queue detached");
        }
        removed
    }

    pub fn is_attached(&self, connection: ConnectionId) -> bool {
        self.connections.contains_key(&connection)
    }

    /// Number of attached connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Events parked behind a full queue for `connection`
    pub fn backlog_len(&self, connection: ConnectionId) -> usize {
        self.connections
            .get(&connection)
            .map_or(0, |outbound| outbound.backlog.lock().events.len())
    }

    fn emit_one(&self, event: &ServerEvent, connection: ConnectionId) {
        let Some(outbound) = self.connections.get(&connection) else {
            tracing::trace!(connection_id = %connection, event = event.name(), "Target not attached, skipping");
            return;
        };

        let mut backlog = outbound.backlog.lock();
        if backlog.draining {
            backlog.events.push_back(event.clone());
            return;
        }

        match outbound.sender.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {
                tracing::trace!(connection_id = %connection, "Outbound queue closed, skipping");
            }
            Err(TrySendError::Full(event)) => {
                backlog.events.push_back(event);
                backlog.draining = true;
                drop(backlog);

                tokio::spawn(drain_backlog(
                    connection,
                    outbound.sender.clone(),
                    outbound.backlog.clone(),
                    outbound.cancel.subscribe(),
                    self.delivery_timeout,
                ));
            }
        }
    }
}

/// Deliver parked events in order, each bounded by `timeout`
async fn drain_backlog(
    connection: ConnectionId,
    sender: mpsc::Sender<ServerEvent>,
    backlog: Arc<Mutex<Backlog>>,
    mut cancelled: watch::Receiver<()>,
    timeout: Duration,
) {
    loop {
        let event = {
            let mut backlog = backlog.lock();
            match backlog.events.pop_front() {
                Some(event) => event,
                None => {
                    backlog.draining = false;
                    return;
                }
            }
        };

        let name = event.name();
        tokio::select! {
            biased;
            _ = cancelled.changed() => {
                let dropped = {
                    let mut backlog = backlog.lock();
                    backlog.draining = false;
                    std::mem::take(&mut backlog.events).len() + 1
                };
                tracing::debug!(connection_id = %connection, dropped, "Delivery cancelled by disconnect");
                return;
            }
            result = sender.send_timeout(event, timeout) => match result {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(_)) => {
                    tracing::warn!(
                        connection_id = %connection,
                        event = name,
                        timeout_ms = timeout.as_millis(),
                        "Delivery timed out, event dropped"
                    );
                }
                Err(SendTimeoutError::Closed(_)) => {
                    let mut backlog = backlog.lock();
                    backlog.events.clear();
                    backlog.draining = false;
                    drop(backlog);
                    tracing::trace!(connection_id = %connection, "Outbound queue closed mid-delivery");
                    return;
                }
            },
        }
    }
}

impl DeliveryTransport for OutboundHub {
    fn emit(&self, event: &ServerEvent, targets: &[ConnectionId]) {
        for connection in targets {
            self.emit_one(event, *connection);
        }
    }
}

impl std::fmt::Debug for OutboundHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundHub")
            .field("connections", &self.connections.len())
            .field("delivery_timeout", &self.delivery_timeout)
            .finish()
    }
}
