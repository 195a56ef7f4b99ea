//! Gateway state
//!
//! Application state for the gateway server.

use crate::engine::RelayEngine;
use relay_common::AppConfig;
use relay_core::Authenticator;
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Presence and routing engine
    engine: Arc<RelayEngine>,
    /// Resolves bearer credentials on the HTTP surface
    authenticator: Arc<dyn Authenticator>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        engine: Arc<RelayEngine>,
        authenticator: Arc<dyn Authenticator>,
        config: AppConfig,
    ) -> Self {
        Self {
            engine,
            authenticator,
            config: Arc::new(config),
        }
    }

    pub fn engine(&self) -> &Arc<RelayEngine> {
        &self.engine
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("engine", &self.engine)
            .field("config", &"AppConfig")
            .finish()
    }
}
