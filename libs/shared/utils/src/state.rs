use std::sync::Arc;

use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::{DocumentStore, MemoryDocumentStore, RestDocumentStore};

/// Shared state handed to every router.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self { config, store }
    }

    /// Pick the remote store when configured, otherwise run in-memory.
    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn DocumentStore> = if config.is_remote_store_configured() {
            info!("Using remote document store at {}", config.store_url);
            Arc::new(RestDocumentStore::new(&config))
        } else {
            warn!("No remote document store configured; data will not survive a restart");
            Arc::new(MemoryDocumentStore::new())
        };

        Self { config, store }
    }
}
