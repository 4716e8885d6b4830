//! Application State

use std::sync::Arc;

use chat_core::LlmProvider;
use service_directory::{DocumentStore, TurnController};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Turn controller wired with the directory tools
    pub controller: Arc<TurnController>,

    /// Reasoning service, for health checks
    pub provider: Arc<dyn LlmProvider>,

    /// Document store (Firestore or in-memory)
    pub store: Arc<dyn DocumentStore>,
}
