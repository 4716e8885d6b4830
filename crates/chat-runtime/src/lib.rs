//! # chat-runtime
//!
//! Reasoning-service bindings for the chat system.
//!
//! ## Providers
//!
//! - **Gemini** (default): hosted `generateContent` API with function calling
//! - **Scripted**: queued responses for tests and offline runs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_runtime::GeminiProvider;
//!
//! let provider = GeminiProvider::from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

#[cfg(feature = "gemini")]
pub mod gemini;
pub mod mock;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};
pub use mock::ScriptedProvider;

// Re-export core types for convenience
pub use chat_core::{
    Agent, ChatError, ChatRequest, ChatResponse, LlmProvider, Result, Tool, ToolRegistry,
};
