//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub store: StoreConfig,
    pub jwt: JwtConfig,
    pub relay: RelayConfig,
    pub ids: IdConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Gateway listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which `MessageStore` implementation backs the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend {other:?}")),
        }
    }
}

/// Message store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Present whenever `backend` is `Postgres`
    pub database: Option<DatabaseConfig>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

/// Presence & routing policy
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Accept connections that present no credentials
    pub allow_anonymous_connections: bool,
    /// Let anonymous connections send room messages (recorded as sender `anonymous`)
    pub allow_anonymous_room_messages: bool,
    /// Upper bound on a single `MessageStore::append`
    pub persist_timeout_ms: u64,
    /// Upper bound on one delivery attempt to one connection
    pub delivery_timeout_ms: u64,
    /// Outbound queue depth per connection
    pub outbound_buffer: usize,
    /// Longest accepted message content, in characters
    pub max_content_length: usize,
    /// Idle time after which a connection is considered dead
    pub heartbeat_timeout_ms: u64,
}

impl RelayConfig {
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            allow_anonymous_connections: true,
            allow_anonymous_room_messages: false,
            persist_timeout_ms: default_persist_timeout_ms(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            outbound_buffer: default_outbound_buffer(),
            max_content_length: default_max_content_length(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

/// Message ID generator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IdConfig {
    #[serde(default)]
    pub worker_id: u16,
}

impl IdConfig {
    /// Worker ids occupy 10 bits of a message id
    pub const MAX_WORKER_ID: u16 = 1023;
}

// Default value functions
fn default_app_name() -> String {
    "chat-relay".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_access_token_expiry() -> i64 {
    1800 // 30 minutes
}

fn default_persist_timeout_ms() -> u64 {
    5_000
}

fn default_delivery_timeout_ms() -> u64 {
    1_000
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_max_content_length() -> usize {
    2_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    90_000
}

/// Parse an optional variable, failing loudly on values that are present but malformed
fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
    }
}

fn parse_flag<F>(lookup: &F, name: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(name, raw)),
        },
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Returns an error if required variables are missing or malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV") {
            None => Environment::default(),
            Some(raw) => match raw.to_lowercase().as_str() {
                "production" => Environment::Production,
                "staging" => Environment::Staging,
                "development" => Environment::Development,
                _ => return Err(ConfigError::InvalidValue("APP_ENV", raw)),
            },
        };

        let backend = parse_var::<StoreBackend, _>(&lookup, "MESSAGE_STORE")?.unwrap_or_default();
        let database = match (backend, lookup("DATABASE_URL")) {
            (_, Some(url)) => Some(DatabaseConfig {
                url,
                max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: parse_var(&lookup, "DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
            }),
            (StoreBackend::Postgres, None) => return Err(ConfigError::MissingVar("DATABASE_URL")),
            (StoreBackend::Memory, None) => None,
        };

        let relay_defaults = RelayConfig::default();

        let worker_id: u16 = parse_var(&lookup, "WORKER_ID")?.unwrap_or(0);
        if worker_id > IdConfig::MAX_WORKER_ID {
            return Err(ConfigError::InvalidValue("WORKER_ID", worker_id.to_string()));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            gateway: ServerConfig {
                host: lookup("GATEWAY_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "GATEWAY_PORT")?.unwrap_or_else(default_port),
            },
            store: StoreConfig { backend, database },
            jwt: JwtConfig {
                secret: lookup("JWT_SECRET").ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
                access_token_expiry: parse_var(&lookup, "JWT_ACCESS_TOKEN_EXPIRY")?
                    .unwrap_or_else(default_access_token_expiry),
            },
            relay: RelayConfig {
                allow_anonymous_connections: parse_flag(&lookup, "RELAY_ALLOW_ANONYMOUS_CONNECTIONS")?
                    .unwrap_or(relay_defaults.allow_anonymous_connections),
                allow_anonymous_room_messages: parse_flag(
                    &lookup,
                    "RELAY_ALLOW_ANONYMOUS_ROOM_MESSAGES",
                )?
                .unwrap_or(relay_defaults.allow_anonymous_room_messages),
                persist_timeout_ms: parse_var(&lookup, "RELAY_PERSIST_TIMEOUT_MS")?
                    .unwrap_or(relay_defaults.persist_timeout_ms),
                delivery_timeout_ms: parse_var(&lookup, "RELAY_DELIVERY_TIMEOUT_MS")?
                    .unwrap_or(relay_defaults.delivery_timeout_ms),
                outbound_buffer: parse_var(&lookup, "RELAY_OUTBOUND_BUFFER")?
                    .unwrap_or(relay_defaults.outbound_buffer),
                max_content_length: parse_var(&lookup, "RELAY_MAX_CONTENT_LENGTH")?
                    .unwrap_or(relay_defaults.max_content_length),
                heartbeat_timeout_ms: parse_var(&lookup, "RELAY_HEARTBEAT_TIMEOUT_MS")?
                    .unwrap_or(relay_defaults.heartbeat_timeout_ms),
            },
            ids: IdConfig { worker_id },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
