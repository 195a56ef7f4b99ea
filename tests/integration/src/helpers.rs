//! Test helpers for integration tests
//!
//! Provides a gateway bound to an ephemeral port, a WebSocket client with
//! timeout-bounded receives, and HTTP helpers for the history endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use futures_util::{SinkExt, StreamExt};
use relay_common::{AppConfig, JwtService};
use relay_core::UserId;
use relay_gateway::{create_app, create_gateway_state, serve, RelayEngine, RelayStats};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Secret shared by the gateway under test and the token minter
pub const TEST_SECRET: &str = "integration-test-secret";

/// Default wait for a single inbound frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Running gateway with the in-process message store
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: Client,
    engine: Arc<RelayEngine>,
    jwt: JwtService,
    _handle: JoinHandle<()>,
}

impl TestGateway {
    /// Start a gateway with default relay settings
    pub async fn start() -> Result<Self> {
        Self::start_with(&[]).await
    }

    /// Start a gateway with extra environment-style overrides
    pub async fn start_with(overrides: &[(&str, &str)]) -> Result<Self> {
        let config = test_config(overrides)?;
        let state = create_gateway_state(config).await?;
        let engine = state.engine().clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            serve(listener, create_app(state)).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            engine,
            jwt: JwtService::new(TEST_SECRET, 300),
            _handle: handle,
        })
    }

    /// Mint a valid token for `user`
    pub fn token(&self, user: &str) -> String {
        self.jwt
            .issue_token(&UserId::new(user))
            .expect("token issue failed")
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Connect as `user` and consume the welcome message
    pub async fn connect(&self, user: &str) -> Result<WsClient> {
        let url = format!("{}?token={}", self.ws_url(), self.token(user));
        let mut client = WsClient::connect(&url).await?;
        client.expect_welcome().await?;
        Ok(client)
    }

    /// Connect without credentials and consume the welcome message
    pub async fn connect_anonymous(&self) -> Result<WsClient> {
        let mut client = WsClient::connect(&self.ws_url()).await?;
        client.expect_welcome().await?;
        Ok(client)
    }

    /// Open a raw socket with an explicit token and nothing consumed
    pub async fn connect_raw(&self, token: &str) -> Result<WsClient> {
        WsClient::connect(&format!("{}?token={token}", self.ws_url())).await
    }

    /// Open a socket that authenticates through the `Authorization` header
    pub async fn connect_with_header(&self, user: &str) -> Result<WsClient> {
        let mut request = self.ws_url().into_client_request()?;
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.token(user)))?,
        );
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        let mut client = WsClient { stream };
        client.expect_welcome().await?;
        Ok(client)
    }

    pub fn stats(&self) -> RelayStats {
        self.engine.stats()
    }

    pub fn engine(&self) -> &RelayEngine {
        &self.engine
    }

    /// Poll until `condition` holds or `RECV_TIMEOUT` passes
    pub async fn wait_until<F>(&self, condition: F) -> Result<()>
    where
        F: Fn(&RelayEngine) -> bool,
    {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        while !condition(&self.engine) {
            if tokio::time::Instant::now() >= deadline {
                bail!("condition not reached; stats: {:?}", self.stats());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a GET request with auth token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?)
    }
}

/// Configuration for a memory-backed gateway on an ephemeral port
pub fn test_config(overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let mut vars: HashMap<&str, &str> = HashMap::from([
        ("APP_ENV", "development"),
        ("GATEWAY_HOST", "127.0.0.1"),
        ("GATEWAY_PORT", "0"),
        ("MESSAGE_STORE", "memory"),
        ("JWT_SECRET", TEST_SECRET),
    ]);
    vars.extend(overrides.iter().copied());

    AppConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()))
        .map_err(|e| anyhow!("Config error: {e}"))
}

/// How a socket ended from the client's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closed {
    /// Close frame carrying this code
    Code(u16),
    /// Close frame without a code, or the stream just ended
    NoCode,
}

/// WebSocket client speaking the relay's JSON events
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(url).await?;
        Ok(Self { stream })
    }

    /// Send one client event
    pub async fn send(&mut self, event: Value) -> Result<()> {
        self.stream.send(Message::Text(event.to_string())).await?;
        Ok(())
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    pub async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.stream.send(Message::Binary(bytes)).await?;
        Ok(())
    }

    /// Next server event, failing on close or after `RECV_TIMEOUT`
    pub async fn recv(&mut self) -> Result<Value> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .map_err(|_| anyhow!("timed out waiting for an event"))?;

            match frame {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => bail!("socket closed: {frame:?}"),
                Some(Ok(other)) => bail!("unexpected frame: {other:?}"),
                Some(Err(e)) => return Err(e.into()),
                None => bail!("socket ended"),
            }
        }
    }

    /// Next server event, which must be named `name`
    pub async fn recv_event(&mut self, name: &str) -> Result<Value> {
        let event = self.recv().await?;
        if event["event"] != name {
            bail!("expected {name}, got {event}");
        }
        Ok(event["data"].clone())
    }

    /// Skip events until one named `name` arrives
    pub async fn recv_until(&mut self, name: &str) -> Result<Value> {
        loop {
            let event = self.recv().await?;
            if event["event"] == name {
                return Ok(event["data"].clone());
            }
        }
    }

    /// Expect no event for `window`
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match tokio::time::timeout(window, self.stream.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => bail!("unexpected event: {text}"),
            Ok(other) => bail!("unexpected frame: {other:?}"),
        }
    }

    /// Wait for the server to close the socket, skipping any events first
    pub async fn expect_close(&mut self) -> Result<Closed> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .map_err(|_| anyhow!("timed out waiting for close"))?;

            match frame {
                Some(Ok(Message::Close(Some(frame)))) => {
                    return Ok(Closed::Code(u16::from(frame.code)))
                }
                Some(Ok(Message::Close(None))) | None => return Ok(Closed::NoCode),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn expect_welcome(&mut self) -> Result<()> {
        let data = self.recv_event("system_message").await?;
        if data["message"] != "Welcome to the chat! You are connected." {
            bail!("unexpected welcome: {data}");
        }
        Ok(())
    }

    /// Close the socket from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}
