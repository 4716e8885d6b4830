//! Scripted Provider
//!
//! For testing and local runs. Replays queued responses in order and keeps
//! every request it receives.

use std::collections::VecDeque;

use async_trait::async_trait;
use chat_core::{
    error::{ChatError, Result},
    provider::{ChatRequest, ChatResponse, LlmProvider},
    tool::ToolCall,
};
use tokio::sync::Mutex;

const MODEL: &str = "scripted";

/// Provider that answers from a queue
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
    /// Answer used once the queue is empty
    fallback: Option<String>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep answering with `text` after the queue runs out
    pub fn with_fallback(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// Queue a raw response
    pub async fn push(&self, response: ChatResponse) {
        self.responses.lock().await.push_back(response);
    }

    /// Queue a plain text answer
    pub async fn push_text(&self, text: impl Into<String>) {
        self.push(ChatResponse::text_reply(MODEL, text)).await;
    }

    /// Queue a tool-call request
    pub async fn push_call(&self, call: ToolCall) {
        self.push(ChatResponse::tool_request(MODEL, call)).await;
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().await.push(request.clone());

        if let Some(response) = self.responses.lock().await.pop_front() {
            return Ok(response);
        }
        self.fallback
            .as_ref()
            .map(|text| ChatResponse::text_reply(MODEL, text.clone()))
            .ok_or_else(|| ChatError::ProviderUnavailable("script exhausted".into()))
    }
}
