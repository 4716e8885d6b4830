//! Error Types

use thiserror::Error;

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Chat error types
#[derive(Error, Debug)]
pub enum ChatError {
    /// Reasoning service returned an error response
    #[error("Provider error: {0}")]
    Provider(String),

    /// Reasoning service unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The response carried no usable text
    #[error("Empty response from provider")]
    EmptyResponse,

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool declaration or call arguments rejected
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool ran but could not produce a result
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// A lookup matched nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backing document store failed
    #[error("Store error: {0}")]
    Store(String),

    /// Parse error (e.g., malformed provider payload)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Check if the platform should retry the invocation
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::RateLimited(_) | Self::Store(_)
        )
    }

    /// Faults a tool reports back to the model instead of aborting the turn
    pub const fn is_tool_fault(&self) -> bool {
        matches!(
            self,
            Self::ToolValidation(_) | Self::ToolExecution(_) | Self::NotFound(_)
        )
    }
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
