//! Chat request/response models.

use serde::{Deserialize, Serialize};

/// A single chat turn addressed to the agent.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Empty means "start a fresh session"
    pub session_id: String,
    pub message: String,
    /// Contains sensitive data - never log
    pub connection_string: String,
    /// Falls back to the default model when absent
    pub model: Option<String>,
}

/// A proposed SQL query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub title: String,
    pub query: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub message: String,
    pub queries: Vec<Query>,
}

impl ChatResponse {
    /// A response carrying only text.
    pub fn text(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            queries: Vec::new(),
        }
    }
}
