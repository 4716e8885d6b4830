//! chat-trigger HTTP Receiver
//!
//! Axum server that receives message-created events for
//! `rooms/{roomId}/messages/{messageId}` and runs the directory assistant.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_core::LlmProvider;
use chat_runtime::{GeminiConfig, GeminiProvider};
use service_directory::{DocumentStore, FirestoreStore, MemoryStore, TurnController};

use crate::config::{StoreBackend, TriggerConfig};
use crate::handlers::{health_check, message_created};
use crate::state::AppState;

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/triggers/message-created", post(message_created))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = TriggerConfig::from_env()?;

    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreStore::from_env()?),
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; documents are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let model = config.controller.agent.generation.model.clone();
    let provider: Arc<dyn LlmProvider> =
        Arc::new(GeminiProvider::from_config(GeminiConfig::from_env()?, &model)?);

    match provider.health_check().await {
        Ok(true) => tracing::info!(%model, "Connected to Gemini"),
        Ok(false) | Err(_) => {
            tracing::warn!(%model, "Gemini not reachable; turns will fail until it is");
        }
    }

    let controller =
        TurnController::new(store.clone(), provider.clone(), config.controller.clone())?;
    tracing::info!(
        assistant = %config.controller.assistant_id,
        store = store.name(),
        tools = ?controller.agent().tools().names(),
        max_tool_hops = config.controller.agent.max_tool_hops,
        "Turn controller ready"
    );

    let state = AppState {
        controller: Arc::new(controller),
        provider,
        store,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("chat-trigger listening on http://{}", config.bind_addr);
    tracing::info!("  GET  /health");
    tracing::info!("  POST /triggers/message-created");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
