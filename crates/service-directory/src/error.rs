//! Error Types for the Service Directory

use chat_core::ChatError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("Invalid document {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DirectoryError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }
}

impl From<DirectoryError> for ChatError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound { .. } => Self::NotFound(err.to_string()),
            DirectoryError::InvalidDocument { .. } => Self::ToolExecution(err.to_string()),
            DirectoryError::Config(msg) => Self::Config(msg),
            DirectoryError::Serialization(e) => Self::Json(e),
            DirectoryError::Store(_)
            | DirectoryError::Network(_)
            | DirectoryError::InvalidQuery(_) => Self::Store(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_becomes_tool_fault() {
        let err: ChatError = DirectoryError::not_found("profile", "Ana").into();
        assert!(err.is_tool_fault());
        assert_eq!(err.to_string(), "Not found: profile not found: Ana");
    }

    #[test]
    fn test_store_failure_is_retryable() {
        let err: ChatError = DirectoryError::Store("503".into()).into();
        assert!(err.is_retryable());
        assert!(!err.is_tool_fault());
    }
}
