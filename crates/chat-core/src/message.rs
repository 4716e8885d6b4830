//! Conversation Messages
//!
//! Turn and content types exchanged with the reasoning service.

use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

/// Role of a turn author
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user input (also carries function responses)
    User,
    /// Reasoning service output
    Model,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// One piece of content inside a turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    /// Plain text
    Text(String),

    /// Tool invocation requested by the model
    FunctionCall(ToolCall),

    /// Tool output sent back to the model
    FunctionResponse {
        name: String,
        response: serde_json::Value,
    },
}

impl Part {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub const fn as_function_call(&self) -> Option<&ToolCall> {
        match self {
            Self::FunctionCall(call) => Some(call),
            _ => None,
        }
    }
}

/// A role-attributed list of parts, as sent to or received from the service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn function_response(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::FunctionResponse {
                name: name.into(),
                response,
            }],
        }
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }
}

/// A single replayed turn of conversation history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            parts: vec![Part::Text(turn.text.clone())],
        }
    }
}

/// Replayable conversation history, always alternating user → model
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair user and model texts in order.
    ///
    /// Emits `min(user.len(), model.len())` `(user, model)` pairs; anything
    /// left over on the longer side is dropped so the result never breaks
    /// the alternation the chat API requires.
    pub fn interleave<U, M>(user: U, model: M) -> Self
    where
        U: IntoIterator<Item = String>,
        M: IntoIterator<Item = String>,
    {
        let turns = user
            .into_iter()
            .zip(model)
            .flat_map(|(u, m)| [Turn::user(u), Turn::model(m)])
            .collect();
        Self { turns }
    }

    /// Get all turns
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of `(user, model)` pairs
    pub fn pairs(&self) -> usize {
        self.turns.len() / 2
    }

    /// Turns in the wire form used to seed a session
    pub fn to_contents(&self) -> Vec<Content> {
        self.turns.iter().map(Content::from).collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
