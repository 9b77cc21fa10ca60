//! Agent pool.
//!
//! One [`DbAgent`] per model slug, built on first use and reused for every
//! later request. Lookups take the read lock; a miss upgrades to the write
//! lock and re-checks before building, so concurrent first requests for the
//! same slug construct at most one agent.

use super::db_agent::{AgentSettings, DbAgent};
use crate::config::AgentConfig;
use crate::error::{Advisory, AgentError, AgentResult};
use crate::models::{ChatRequest, ChatResponse, Model, Provider, default_model_slug, model_by_slug};
use crate::providers::{ChatModel, build_chat_model};
use crate::session::SessionStore;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Builds the chat model for a registry entry.
pub type ModelBuilder =
    Arc<dyn Fn(&Model, &AgentConfig) -> AgentResult<Arc<dyn ChatModel>> + Send + Sync>;

pub struct AgentManager {
    config: AgentConfig,
    agents: RwLock<HashMap<String, Arc<DbAgent>>>,
    sessions: Arc<SessionStore>,
    build_model: ModelBuilder,
}

impl std::fmt::Debug for AgentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentManager")
            .field("schema_cache_ttl", &self.config.schema_cache_ttl)
            .field("max_turns", &self.config.max_turns)
            .finish_non_exhaustive()
    }
}

impl AgentManager {
    /// Create a pool whose agents talk to the real provider APIs.
    pub fn new(config: AgentConfig) -> Self {
        Self::with_model_builder(config, Arc::new(build_chat_model))
    }

    /// Create a pool with a custom model constructor.
    pub fn with_model_builder(config: AgentConfig, build_model: ModelBuilder) -> Self {
        let configured: Vec<_> = Provider::ALL
            .iter()
            .filter(|p| config.is_configured(**p))
            .map(|p| p.as_str())
            .collect();
        info!(
            providers = ?configured,
            schema_cache_ttl_secs = config.schema_cache_ttl.as_secs(),
            "Agent manager initialized"
        );

        Self {
            config,
            agents: RwLock::new(HashMap::new()),
            sessions: Arc::new(SessionStore::new()),
            build_model,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The session store shared by every agent.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Get the agent for `slug`, building it on first use.
    pub async fn get_agent(&self, slug: &str) -> AgentResult<Arc<DbAgent>> {
        {
            let agents = self.agents.read().await;
            if let Some(agent) = agents.get(slug) {
                return Ok(Arc::clone(agent));
            }
        }

        let mut agents = self.agents.write().await;
        // Another request may have built it while we waited for the lock.
        if let Some(agent) = agents.get(slug) {
            return Ok(Arc::clone(agent));
        }

        let model = model_by_slug(slug).ok_or_else(|| AgentError::unknown_model(slug))?;
        if !self.config.is_configured(model.provider) {
            return Err(AgentError::provider_not_configured(model.provider.as_str()));
        }

        let chat_model = (self.build_model)(model, &self.config)?;
        let agent = Arc::new(DbAgent::new(
            model.slug,
            chat_model,
            Arc::clone(&self.sessions),
            AgentSettings::from(&self.config),
        ));
        agents.insert(slug.to_string(), Arc::clone(&agent));

        info!(model = %slug, provider = %model.provider, "Agent created");
        Ok(agent)
    }

    /// Models whose provider has an API key, in registry order.
    pub fn available_models(&self) -> Vec<Model> {
        Provider::ALL
            .iter()
            .filter(|p| self.config.is_configured(**p))
            .flat_map(|p| p.models().iter().copied())
            .collect()
    }

    pub fn default_model(&self) -> &'static str {
        default_model_slug()
    }

    /// Route a chat request to its model's agent.
    pub async fn chat(&self, request: ChatRequest) -> AgentResult<ChatResponse> {
        let slug = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default_model_slug())
            .to_string();

        debug!(model = %slug, "Routing chat request");
        let agent = self.get_agent(&slug).await?;
        agent.chat(&request).await
    }

    pub async fn agent_count(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Drop all sessions, close every agent and empty the pool. Failures are
    /// logged, not raised.
    pub async fn close(&self) -> Advisory {
        self.sessions.clear().await;

        let drained: Vec<(String, Arc<DbAgent>)> = {
            let mut agents = self.agents.write().await;
            agents.drain().collect()
        };

        if drained.is_empty() {
            return Advisory::Skipped("no agents to close".to_string());
        }

        let results = join_all(drained.iter().map(|(slug, agent)| async move {
            agent.close().await.map_err(|e| (slug.clone(), e))
        }))
        .await;

        let mut failures = Vec::new();
        for result in results {
            if let Err((slug, e)) = result {
                warn!(model = %slug, error = %e, "Failed to close agent");
                failures.push(e);
            }
        }

        info!(closed = drained.len(), failed = failures.len(), "Agent pool closed");
        Advisory::from_failures(failures)
    }
}
