//! HTTP Handlers

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use service_directory::{MessageCreated, TurnOutcome, store::Fields};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Path parameters of `rooms/{roomId}/messages/{messageId}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerParams {
    pub room_id: String,
    pub message_id: String,
}

/// Document-created event as delivered by the platform
#[derive(Debug, Deserialize)]
pub struct TriggerEvent {
    pub params: TriggerParams,

    /// Created document fields as plain JSON
    #[serde(default)]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<TriggerEvent> for MessageCreated {
    fn from(event: TriggerEvent) -> Self {
        let data = event.data.map(|fields| {
            fields
                .into_iter()
                .map(|(key, value)| (key, value.into()))
                .collect::<Fields>()
        });
        Self::new(event.params.room_id, event.params.message_id, data)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OutcomeResponse {
    /// `replied` or `skipped`
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default)]
    pub tools_used: Vec<String>,
}

impl From<TurnOutcome> for OutcomeResponse {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Skipped(reason) => Self {
                status: "skipped".into(),
                reason: Some(reason.to_string()),
                message_id: None,
                tools_used: Vec::new(),
            },
            TurnOutcome::Replied {
                message_id,
                tools_used,
                ..
            } => Self {
                status: "replied".into(),
                reason: None,
                message_id: Some(message_id),
                tools_used,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub retryable: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub store: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        provider_connected,
        store: state.store.name().to_string(),
    })
}

/// Message-created trigger; a failure answers 500 so the platform redelivers
pub async fn message_created(
    State(state): State<AppState>,
    Json(event): Json<TriggerEvent>,
) -> Result<Json<OutcomeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let event = MessageCreated::from(event);
    tracing::info!(room = %event.room_id, message = %event.message_id, "Message created");

    let outcome = state.controller.handle(&event).await.map_err(|e| {
        tracing::error!(
            room = %event.room_id,
            message = %event.message_id,
            error = %e,
            "Turn failed"
        );
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
                retryable: e.is_retryable(),
            }),
        )
    })?;

    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use chat_core::ToolCall;
    use chat_runtime::ScriptedProvider;
    use service_directory::{
        ControllerConfig, DocumentStore, MemoryStore, TurnController,
        store::{FieldValue, messages_path},
    };
    use tower::ServiceExt;

    const BOT: &str = "bot";

    async fn state(provider: Arc<ScriptedProvider>) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());

        let mut room = Fields::new();
        room.insert("userIds".into(), vec![BOT, "u1"].into());
        store.set("rooms", "R1", room).await.unwrap();

        let mut tag = Fields::new();
        tag.insert("text".into(), "plomeria".into());
        tag.insert("usedBy".into(), 4_i64.into());
        store.set("tags", "t1", tag).await.unwrap();

        let mut service = Fields::new();
        service.insert("text".into(), "plomeria".into());
        let mut profile = Fields::new();
        profile.insert("displayName".into(), "Juan Perez".into());
        profile.insert("service".into(), FieldValue::Map(service));
        store.set("profiles", "p1", profile).await.unwrap();

        let config = ControllerConfig {
            assistant_id: BOT.into(),
            ..ControllerConfig::default()
        };
        let controller = TurnController::new(store.clone(), provider.clone(), config).unwrap();
        let state = AppState {
            controller: Arc::new(controller),
            provider,
            store: store.clone(),
        };
        (state, store)
    }

    fn trigger(author: &str, text: &str) -> Request<Body> {
        let body = serde_json::json!({
            "params": { "roomId": "R1", "messageId": "m1" },
            "data": { "authorId": author, "text": text, "type": "text" }
        });
        Request::post("/triggers/message-created")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_trigger_replies() {
        let provider = Arc::new(ScriptedProvider::new());
        provider
            .push_call(ToolCall::new("get_providers_by_category").with_argument("tag", "plomeria"))
            .await;
        provider.push_text("- Juan Perez").await;
        let (state, store) = state(provider).await;

        let response = crate::router(state)
            .oneshot(trigger("u1", "busco un plomero"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let outcome: OutcomeResponse = read(response).await;
        assert_eq!(outcome.status, "replied");
        assert_eq!(outcome.tools_used, vec!["get_providers_by_category"]);

        let reply = store
            .get(&messages_path("R1"), outcome.message_id.as_deref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.get_str("text"), Some("- Juan Perez"));
        assert_eq!(reply.get_str("authorId"), Some(BOT));
    }

    #[tokio::test]
    async fn test_own_message_is_skipped() {
        let (state, store) = state(Arc::new(ScriptedProvider::with_fallback("eco"))).await;

        let response = crate::router(state).oneshot(trigger(BOT, "hola")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let outcome: OutcomeResponse = read(response).await;
        assert_eq!(outcome.status, "skipped");
        assert_eq!(outcome.reason.as_deref(), Some("own_message"));
        assert_eq!(store.count(&messages_path("R1")).await, 0);
    }

    #[tokio::test]
    async fn test_failure_answers_500() {
        let (state, store) = state(Arc::new(ScriptedProvider::new())).await;

        let response = crate::router(state).oneshot(trigger("u1", "hola")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let error: ErrorResponse = read(response).await;
        assert!(error.retryable);
        assert_eq!(store.count(&messages_path("R1")).await, 0);
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state(Arc::new(ScriptedProvider::new())).await;
        let request = Request::get("/health").body(Body::empty()).unwrap();

        let response = crate::router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health: serde_json::Value = read(response).await;
        assert_eq!(health["provider"], "Scripted");
        assert_eq!(health["store"], "Memory");
        assert_eq!(health["provider_connected"], true);
    }
}
