//! Gateway server setup
//!
//! Wires the WebSocket endpoint, the HTTP history routes and the message
//! store selected by configuration.

mod auth;
mod handler;
mod response;
mod routes;
mod state;

pub use auth::AuthUser;
pub use handler::{gateway_handler, ConnectParams};
pub use response::{HttpError, HttpResult};
pub use routes::HistoryParams;
pub use state::GatewayState;

use crate::engine::RelayEngine;
use axum::{routing::get, Router};
use relay_common::{AppConfig, AppError, AppResult, JwtAuthenticator, JwtService, StoreBackend};
use relay_core::{Authenticator, MessageIdGenerator, MessageStore};
use relay_store::{InMemoryMessageStore, PgMessageStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(routes::health_check))
        .route("/stats", get(routes::stats))
        .route("/rooms/:room_id/messages", get(routes::room_messages))
        .route("/direct/:user_id/messages", get(routes::direct_messages))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: AppConfig) -> AppResult<GatewayState> {
    let store = create_store(&config).await?;

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
    ));
    let authenticator: Arc<dyn Authenticator> = Arc::new(JwtAuthenticator::new(jwt_service));

    let engine = RelayEngine::new_shared(store, authenticator.clone(), &config.relay);

    Ok(GatewayState::new(engine, authenticator, config))
}

async fn create_store(config: &AppConfig) -> AppResult<Arc<dyn MessageStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory message store; history is lost on restart");
            Ok(Arc::new(InMemoryMessageStore::new()))
        }
        StoreBackend::Postgres => {
            let database = config
                .store
                .database
                .as_ref()
                .ok_or_else(|| AppError::Config("DATABASE_URL is required".to_string()))?;

            tracing::info!("Connecting to PostgreSQL...");
            let db_config = relay_store::DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                min_connections: database.min_connections,
                ..Default::default()
            };
            let pool = relay_store::create_pool(&db_config)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            relay_store::ensure_schema(&pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            tracing::info!("PostgreSQL connection established");

            let ids = MessageIdGenerator::new(config.ids.worker_id);
            Ok(Arc::new(PgMessageStore::new(pool, ids)))
        }
    }
}

/// Serve `app` on an already bound listener
pub async fn serve(listener: TcpListener, app: Router) -> AppResult<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::Config(format!("Server error: {e}")))
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: &str) -> AppResult<()> {
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    serve(listener, app).await
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> AppResult<()> {
    let addr = config.gateway.address();

    let state = create_gateway_state(config).await?;
    let app = create_app(state);

    run_server(app, &addr).await
}
