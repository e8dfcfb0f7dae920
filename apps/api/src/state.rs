use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::storage::BlobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Gemini in production; scripted in tests.
    pub llm: Arc<dyn TextGenerator>,
    pub storage: Arc<dyn BlobStore>,
    pub config: Config,
}
