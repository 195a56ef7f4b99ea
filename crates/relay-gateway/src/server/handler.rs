//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::connection::Connection;
use crate::engine::RelayEngine;
use crate::handlers::{EventDispatcher, HandlerError, HandlerResult};
use crate::protocol::{ClientEvent, CloseCode, ServerEvent};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        ConnectInfo, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use relay_core::ConnectContext;
use serde::Deserialize;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

const WELCOME: &str = "Welcome to the chat! You are connected.";

/// How long the writer gets to flush and send the close frame
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Shortest idle check period
const MIN_IDLE_CHECK: Duration = Duration::from_millis(10);

type WsSink = SplitSink<WebSocket, Message>;

/// Query parameters accepted on `/gateway`
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // query string wins over the header
    let token = params
        .token
        .filter(|token| !token.is_empty())
        .or_else(|| bearer.map(|TypedHeader(Authorization(bearer))| bearer.token().to_string()));

    let context = ConnectContext {
        token,
        remote_addr: peer.map(|ConnectInfo(addr)| addr.to_string()),
    };

    ws.on_upgrade(move |socket| handle_socket(state, socket, context))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, context: ConnectContext) {
    let engine = state.engine().clone();
    let heartbeat_timeout = state.config().relay.heartbeat_timeout();

    let (mut ws_sink, ws_stream) = socket.split();
    let (tx, rx) = engine.outbound_channel();

    let connection = match engine.connect(&context, tx).await {
        Ok(connection) => connection,
        Err(e) => {
            reject(&mut ws_sink, HandlerError::Rejected(e)).await;
            return;
        }
    };

    let connection_id = connection.id();
    tracing::info!(
        connection_id = %connection_id,
        user_id = ?connection.identity(),
        remote_addr = ?context.remote_addr,
        "WebSocket connection established"
    );

    engine.reply(&connection, ServerEvent::system(WELCOME));

    let (close_tx, close_rx) = oneshot::channel::<CloseCode>();
    let mut send_task = tokio::spawn(send_loop(ws_sink, rx, close_rx));
    let mut recv_task = tokio::spawn(receive_loop(
        engine.clone(),
        connection.clone(),
        ws_stream,
    ));

    let mut send_finished = false;
    let outcome = tokio::select! {
        result = &mut recv_task => match result {
            Ok(result) => result.err(),
            Err(e) => Some(HandlerError::Internal(e.to_string())),
        },
        _ = &mut send_task => {
            send_finished = true;
            tracing::debug!(connection_id = %connection_id, "Send task ended");
            None
        }
        err = idle_watch(connection.clone(), heartbeat_timeout) => Some(err),
    };

    recv_task.abort();

    let close_code = outcome.as_ref().and_then(HandlerError::to_close_code);
    if let Some(err) = &outcome {
        tracing::debug!(
            connection_id = %connection_id,
            error = %err,
            close_code = ?close_code,
            "Closing connection"
        );
    }

    // the writer must see the close code before the hub drops its queue
    match close_code {
        Some(code) => {
            let _ = close_tx.send(code);
        }
        None => drop(close_tx),
    }

    engine.disconnect(&connection);

    if !send_finished && tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
        send_task.abort();
    }

    tracing::info!(
        connection_id = %connection_id,
        age_ms = connection.age().as_millis(),
        "WebSocket connection closed"
    );
}

/// Read frames until the client goes away or sends something fatal
async fn receive_loop(
    engine: Arc<RelayEngine>,
    connection: Arc<Connection>,
    mut stream: SplitStream<WebSocket>,
) -> HandlerResult<()> {
    while let Some(frame) = stream.next().await {
        connection.touch();

        match frame? {
            Message::Text(text) => handle_text_message(&engine, &connection, &text).await,
            Message::Binary(_) => return Err(HandlerError::BinaryFrame),
            Message::Ping(_) | Message::Pong(_) => {
                tracing::trace!(connection_id = %connection.id(), "Keepalive frame");
            }
            Message::Close(_) => {
                tracing::debug!(connection_id = %connection.id(), "Client closed connection");
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Handle a text message from the client
async fn handle_text_message(engine: &RelayEngine, connection: &Connection, text: &str) {
    match ClientEvent::from_json(text) {
        Ok(event) => EventDispatcher::dispatch(engine, connection, event).await,
        Err(e) => {
            let err = HandlerError::from(e);
            tracing::debug!(connection_id = %connection.id(), error = %err, "Failed to parse message");
            if let Some(event) = err.to_event() {
                engine.reply(connection, event);
            }
        }
    }
}

/// Drain the outbound queue into the socket
///
/// A close code flushes what is already queued, then sends the close frame.
async fn send_loop(
    mut sink: WsSink,
    mut rx: mpsc::Receiver<ServerEvent>,
    mut close_rx: oneshot::Receiver<CloseCode>,
) {
    loop {
        tokio::select! {
            biased;
            code = &mut close_rx => {
                while let Ok(event) = rx.try_recv() {
                    if write_event(&mut sink, &event).await.is_err() {
                        return;
                    }
                }
                let frame = code.ok().map(close_frame);
                if let Err(e) = sink.send(Message::Close(frame)).await {
                    tracing::trace!(error = %e, "Close frame not sent");
                }
                return;
            }
            event = rx.recv() => match event {
                Some(event) => {
                    if write_event(&mut sink, &event).await.is_err() {
                        return;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    return;
                }
            },
        }
    }
}

/// Resolves once the connection has been silent longer than `timeout`
async fn idle_watch(connection: Arc<Connection>, timeout: Duration) -> HandlerError {
    let mut ticker = interval((timeout / 2).max(MIN_IDLE_CHECK));

    loop {
        ticker.tick().await;

        let idle = connection.idle_for();
        if idle > timeout {
            tracing::warn!(
                connection_id = %connection.id(),
                idle_ms = idle.as_millis(),
                "Connection timed out"
            );
            return HandlerError::IdleTimeout(idle);
        }
    }
}

/// Report a refused connect, then close with the matching code
async fn reject(sink: &mut WsSink, err: HandlerError) {
    tracing::warn!(error = %err, "WebSocket connection rejected");

    if let Some(event) = err.to_event() {
        if write_event(sink, &event).await.is_err() {
            return;
        }
    }
    let frame = err.to_close_code().map(close_frame);
    let _ = sink.send(Message::Close(frame)).await;
}

async fn write_event(sink: &mut WsSink, event: &ServerEvent) -> Result<(), axum::Error> {
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(event = event.name(), error = %e, "Failed to encode event");
            return Ok(());
        }
    };

    sink.send(Message::Text(json)).await.map_err(|e| {
        tracing::debug!(error = %e, "Failed to send message to WebSocket");
        e
    })
}

fn close_frame(code: CloseCode) -> CloseFrame<'static> {
    CloseFrame {
        code: code.as_u16(),
        reason: Cow::Borrowed(code.description()),
    }
}
