use std::sync::Arc;

use crate::config::Config;
use crate::db::DocumentStore;
use crate::websocket::registry::SessionRegistry;

/// Shared state handed to every HTTP and WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub registry: Arc<SessionRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self {
            store,
            registry: Arc::new(SessionRegistry::new()),
            config: Arc::new(config),
        }
    }
}
