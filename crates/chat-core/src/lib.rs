//! # chat-core
//!
//! Provider-agnostic chat sessions with function calling and a tool registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ ChatSession │  │    Tools    │  │   LlmProvider       │  │
//! │  │ (tool hops) │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait keeps the agent turn independent of the hosted
//! model; tools are plain trait objects looked up by their declared name.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use error::{ChatError, Result};
pub use message::{Content, Conversation, Part, Role, Turn};
pub use provider::{ChatRequest, ChatResponse, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, AgentReply};
pub use session::{ChatSession, SessionId};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolOutput, ToolRegistry, ToolSchema};
