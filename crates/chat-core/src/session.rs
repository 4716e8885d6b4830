//! Session Management
//!
//! A chat session keeps the turn history for one invocation so follow-up
//! sends (such as function responses) reach the model with full context.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::message::Content;
use crate::provider::{ChatRequest, ChatResponse, GenerationOptions, LlmProvider};
use crate::tool::ToolSchema;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live conversation with the reasoning service
pub struct ChatSession {
    /// Unique identifier (log correlation only)
    pub id: SessionId,

    provider: Arc<dyn LlmProvider>,
    system_instruction: Option<String>,
    tools: Vec<ToolSchema>,
    options: GenerationOptions,
    history: Vec<Content>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create an empty session
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            id: SessionId::new(),
            provider,
            system_instruction: None,
            tools: Vec::new(),
            options,
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    /// Seed with replayed turns
    pub fn with_history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    /// Send a user message
    pub async fn send_message(&mut self, text: impl Into<String>) -> Result<ChatResponse> {
        self.send(Content::user(text)).await
    }

    /// Send a tool's output back to the model
    pub async fn send_function_response(
        &mut self,
        name: impl Into<String>,
        response: serde_json::Value,
    ) -> Result<ChatResponse> {
        self.send(Content::function_response(name, response)).await
    }

    /// Append `content`, round-trip, and record the model's answer.
    ///
    /// On failure the pending content is removed again so the history only
    /// ever holds completed exchanges.
    async fn send(&mut self, content: Content) -> Result<ChatResponse> {
        self.history.push(content);

        let request = ChatRequest {
            system_instruction: self.system_instruction.clone(),
            contents: self.history.clone(),
            tools: self.tools.clone(),
            options: self.options.clone(),
        };

        match self.provider.generate(&request).await {
            Ok(response) => {
                if let Some(answer) = response.first_content() {
                    self.history.push(answer.clone());
                }
                Ok(response)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    /// Turns exchanged so far, oldest first
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    pub fn system_instruction(&self) -> Option<&str> {
        self.system_instruction.as_deref()
    }

    /// Duration since creation
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}
