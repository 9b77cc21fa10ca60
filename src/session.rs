//! In-memory conversation sessions.
//!
//! One [`SessionStore`] is shared by every pooled agent. Each session holds a
//! small key-value state map (used by the schema cache) and the conversation
//! history that links consecutive chat turns. Nothing is persisted.

use crate::error::AgentResult;
use crate::providers::Message;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key-value state scoped to one conversation session.
#[async_trait]
pub trait SessionState: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    async fn get(&self, key: &str) -> AgentResult<Option<Value>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> AgentResult<()>;
}

#[derive(Debug, Default)]
struct Session {
    state: HashMap<String, Value>,
    history: Vec<Message>,
}

/// Process-wide session registry.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// State accessor bound to one session.
    pub fn handle(self: &Arc<Self>, session_id: impl Into<String>) -> SessionHandle {
        SessionHandle {
            store: Arc::clone(self),
            session_id: session_id.into(),
        }
    }

    pub async fn get_value(&self, session_id: &str, key: &str) -> Option<Value> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .and_then(|s| s.state.get(key))
            .cloned()
    }

    pub async fn set_value(&self, session_id: &str, key: &str, value: Value) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .state
            .insert(key.to_string(), value);
    }

    /// Conversation so far; empty for unknown sessions.
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    pub async fn append_history(&self, session_id: &str, messages: Vec<Message>) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .history
            .extend(messages);
    }

    #[cfg(test)]
    pub(crate) async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    #[cfg(test)]
    pub(crate) async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every session.
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

/// [`SessionState`] backed by a [`SessionStore`] entry.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    store: Arc<SessionStore>,
    session_id: String,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl SessionState for SessionHandle {
    async fn get(&self, key: &str) -> AgentResult<Option<Value>> {
        Ok(self.store.get_value(&self.session_id, key).await)
    }

    async fn set(&self, key: &str, value: Value) -> AgentResult<()> {
        self.store.set_value(&self.session_id, key, value).await;
        Ok(())
    }
}
