//! Shared application state.
//!
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! API keeps no data between requests; state is configuration plus the
//! upload store.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::upload::UploadStore;

/// Clone is required by Axum; inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let uploads = UploadStore::new(config.upload_dir.clone(), config.upload_max_bytes);
        Self { config: Arc::new(config), uploads: Arc::new(uploads) }
    }
}
