//! Reasoning Service Strategy Pattern
//!
//! Defines a common interface for hosted chat models with function calling
//! (Gemini today), so the agent turn never depends on a specific backend.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_core::provider::{ChatRequest, LlmProvider};
//!
//! let provider = GeminiProvider::from_env()?;
//! let response = provider.generate(&request).await?;
//! if let Some(call) = response.function_call() {
//!     // dispatch the tool
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{Content, Part};
use crate::tool::{ToolCall, ToolSchema};

/// Configuration for model generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gemini-1.5-pro-001")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic)
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Top-p nucleus sampling
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-pro-001".into(),
            temperature: 0.0,
            max_tokens: None,
            top_p: None,
        }
    }
}

/// Everything one `generate` round-trip sends
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// System instruction, sent outside the turn list
    pub system_instruction: Option<String>,

    /// Ordered turns, oldest first
    pub contents: Vec<Content>,

    /// Function declarations the model may call
    pub tools: Vec<ToolSchema>,

    pub options: GenerationOptions,
}

/// Token usage statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for generation finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    Safety,
    Other,
}

/// One alternative answer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candidate {
    pub content: Content,
    pub finish_reason: Option<FinishReason>,
}

/// Response from a `generate` call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub candidates: Vec<Candidate>,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// Response with a single text candidate
    pub fn text_reply(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::single(model, Content::model(text))
    }

    /// Response whose single candidate requests a tool call
    pub fn tool_request(model: impl Into<String>, call: ToolCall) -> Self {
        Self::single(
            model,
            Content {
                role: crate::message::Role::Model,
                parts: vec![Part::FunctionCall(call)],
            },
        )
    }

    fn single(model: impl Into<String>, content: Content) -> Self {
        Self {
            candidates: vec![Candidate {
                content,
                finish_reason: Some(FinishReason::Stop),
            }],
            model: model.into(),
            usage: None,
        }
    }

    /// First candidate's content
    pub fn first_content(&self) -> Option<&Content> {
        self.candidates.first().map(|c| &c.content)
    }

    /// First part of the first candidate
    pub fn first_part(&self) -> Option<&Part> {
        self.first_content().and_then(|c| c.parts.first())
    }

    /// Tool call, if the first part of the first candidate is one
    pub fn function_call(&self) -> Option<&ToolCall> {
        self.first_part().and_then(Part::as_function_call)
    }

    /// Text of the first candidate (empty when it only carries calls)
    pub fn text(&self) -> String {
        self.first_content().map(Content::text).unwrap_or_default()
    }
}

/// Strategy trait for reasoning services
///
/// Implement this trait to add support for new backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Check if the provider is reachable and the credential is accepted
    async fn health_check(&self) -> Result<bool>;

    /// One stateless generation round-trip
    async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
