//! Shared application state

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::core::SessionRegistry;

/// State shared by every handler.
pub struct AppState {
    /// Server configuration, including the server-held Voice Live
    /// credentials
    pub config: BridgeConfig,
    /// Registry of live sessions
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Create shared state from loaded configuration.
    pub fn new(config: BridgeConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions: SessionRegistry::new(),
        })
    }
}
