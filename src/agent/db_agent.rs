//! A pooled agent bound to one model.
//!
//! [`DbAgent::chat`] runs the tool-calling loop: send the conversation to the
//! model, execute any requested tools, repeat until the model answers with
//! text or the turn limit is hit. The final text goes through the
//! [`ResponseParser`]. Conversation history lives in the shared
//! [`SessionStore`] so the next turn of the same session picks it up.

use super::response::ResponseParser;
use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::models::{ChatRequest, ChatResponse};
use crate::providers::{ChatModel, Completion, CompletionRequest, Message};
use crate::session::SessionStore;
use crate::tools::{ReadSchemaTool, ToolContext, ToolRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// System instruction given to every model.
pub const DEFAULT_INSTRUCTION: &str = r#"You are a database assistant. You help users understand their relational database and write SQL for it.

Rules:
- Before answering questions about tables, columns or relationships, call the `read_schema` tool. Never guess table or column names.
- Only propose queries that use tables and columns present in the schema.
- Prefer read-only queries. If the user asks for a statement that modifies data, explain what it does in the description.
- Use the SQL dialect of the connected database.

Always answer with a single JSON object and nothing else:
{"message": "<your explanation for the user>", "queries": [{"title": "<short title>", "query": "<SQL>", "description": "<what the query does>"}]}
Use an empty "queries" array when no query is needed."#;

/// Limits and timeouts applied to every chat turn.
#[derive(Debug, Clone, Copy)]
pub struct AgentSettings {
    pub max_turns: usize,
    pub schema_cache_ttl: Duration,
    pub query_timeout: Duration,
    pub connect_timeout: Duration,
}

impl From<&AgentConfig> for AgentSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_turns: config.max_turns.max(1),
            schema_cache_ttl: config.schema_cache_ttl,
            query_timeout: config.query_timeout,
            connect_timeout: config.connect_timeout,
        }
    }
}

pub struct DbAgent {
    slug: String,
    model: Arc<dyn ChatModel>,
    sessions: Arc<SessionStore>,
    tools: ToolRegistry,
    instruction: String,
    settings: AgentSettings,
    parser: ResponseParser,
}

impl std::fmt::Debug for DbAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbAgent")
            .field("slug", &self.slug)
            .field("provider", &self.model.provider())
            .field("tools", &self.tools)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl DbAgent {
    /// Create an agent with the `read_schema` tool registered.
    pub fn new(
        slug: impl Into<String>,
        model: Arc<dyn ChatModel>,
        sessions: Arc<SessionStore>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            slug: slug.into(),
            model,
            sessions,
            tools: ToolRegistry::new().with_tool(Arc::new(ReadSchemaTool::new())),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            settings,
            parser: ResponseParser::new(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Run one chat turn.
    ///
    /// An empty session id starts a new session. History is only stored when
    /// the turn completes.
    pub async fn chat(&self, request: &ChatRequest) -> AgentResult<ChatResponse> {
        if request.message.trim().is_empty() {
            return Err(AgentError::invalid_input("message is required"));
        }

        let session_id = if request.session_id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            request.session_id.clone()
        };

        let started = Instant::now();
        let ctx = ToolContext {
            session: Arc::new(self.sessions.handle(session_id.clone())),
            connection_string: request.connection_string.clone(),
            schema_cache_ttl: self.settings.schema_cache_ttl,
            query_timeout: self.settings.query_timeout,
            connect_timeout: self.settings.connect_timeout,
        };

        let mut conversation = self.sessions.history(&session_id).await;
        let history_len = conversation.len();
        conversation.push(Message::user(request.message.clone()));

        let definitions = self.tools.definitions();

        for turn in 1..=self.settings.max_turns {
            debug!(
                session_id = %session_id,
                model = %self.slug,
                turn,
                max_turns = self.settings.max_turns,
                "Requesting completion"
            );

            let completion = self
                .model
                .complete(CompletionRequest {
                    system: &self.instruction,
                    messages: &conversation,
                    tools: &definitions,
                })
                .await?;

            match completion {
                Completion::Text(text) => {
                    if !self.parser.looks_like_json_object(&text) {
                        debug!(session_id = %session_id, "Model answered with plain text");
                    }
                    conversation.push(Message::assistant(text.clone()));
                    let new_messages = conversation.split_off(history_len);
                    self.sessions
                        .append_history(&session_id, new_messages)
                        .await;

                    info!(
                        session_id = %session_id,
                        model = %self.slug,
                        turns = turn,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Chat turn completed"
                    );
                    return Ok(self.parser.parse(&session_id, &text));
                }
                Completion::ToolCalls(calls) => {
                    conversation.push(Message::assistant_with_tools(calls.clone()));
                    for call in &calls {
                        let result = self.tools.execute(call, &ctx).await;
                        conversation.push(Message::tool_result(call, result));
                    }
                }
            }
        }

        warn!(
            session_id = %session_id,
            model = %self.slug,
            max_turns = self.settings.max_turns,
            "Turn limit exceeded"
        );
        Err(AgentError::internal(format!(
            "Agent did not produce an answer within {} turns",
            self.settings.max_turns
        )))
    }

    /// Release the model's resources.
    pub async fn close(&self) -> AgentResult<()> {
        self.model.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use crate::providers::{Role, ToolCall};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned completions and records what it was sent.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Completion>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Completion>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn provider(&self) -> Provider {
            Provider::Google
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest<'_>) -> AgentResult<Completion> {
            self.seen.lock().unwrap().push(request.messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::provider("google", "script exhausted"))
        }
    }

    fn settings(max_turns: usize) -> AgentSettings {
        AgentSettings {
            max_turns,
            schema_cache_ttl: Duration::from_secs(60),
            query_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
        }
    }

    fn request(session_id: &str, message: &str) -> ChatRequest {
        ChatRequest {
            session_id: session_id.to_string(),
            message: message.to_string(),
            connection_string: String::new(),
            model: None,
        }
    }

    #[tokio::test]
    async fn test_chat_parses_final_text() {
        let model = Arc::new(ScriptedModel::new(vec![Completion::Text(
            r#"{"message":"hello","queries":[{"title":"t","query":"SELECT 1","description":"d"}]}"#
                .to_string(),
        )]));
        let agent = DbAgent::new("m", model, Arc::new(SessionStore::new()), settings(4));

        let resp = agent.chat(&request("s1", "hi")).await.unwrap();
        assert_eq!(resp.session_id, "s1");
        assert_eq!(resp.message, "hello");
        assert_eq!(resp.queries.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_session_id_gets_uuid() {
        let model = Arc::new(ScriptedModel::new(vec![Completion::Text("plain".into())]));
        let agent = DbAgent::new("m", model, Arc::new(SessionStore::new()), settings(4));

        let resp = agent.chat(&request("", "hi")).await.unwrap();
        assert!(Uuid::parse_str(&resp.session_id).is_ok());
        assert_eq!(resp.message, "plain");
    }

    #[tokio::test]
    async fn test_tool_results_are_fed_back() {
        let model = Arc::new(ScriptedModel::new(vec![
            Completion::ToolCalls(vec![ToolCall::new("c1", "read_schema", "{}")]),
            Completion::Text("done".into()),
        ]));
        let sessions = Arc::new(SessionStore::new());
        let agent = DbAgent::new("m", model.clone(), sessions.clone(), settings(4));

        agent.chat(&request("s1", "what tables?")).await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let tool_msg = seen[1].last().unwrap();
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("c1"));
        // No connection string on this request
        assert!(tool_msg.content.as_deref().unwrap().contains("No database connection"));

        let history = sessions.history("s1").await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[3].content.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn test_history_carries_across_turns() {
        let model = Arc::new(ScriptedModel::new(vec![
            Completion::Text("first".into()),
            Completion::Text("second".into()),
        ]));
        let agent = DbAgent::new("m", model.clone(), Arc::new(SessionStore::new()), settings(4));

        agent.chat(&request("s1", "one")).await.unwrap();
        agent.chat(&request("s1", "two")).await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[1].len(), 3);
        assert_eq!(seen[1][0].content.as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn test_turn_limit_is_internal_error() {
        let calls = (0..5)
            .map(|i| Completion::ToolCalls(vec![ToolCall::new(format!("c{}", i), "read_schema", "{}")]))
            .collect();
        let sessions = Arc::new(SessionStore::new());
        let agent = DbAgent::new(
            "m",
            Arc::new(ScriptedModel::new(calls)),
            sessions.clone(),
            settings(2),
        );

        let err = agent.chat(&request("s1", "loop")).await.unwrap_err();
        assert!(matches!(err, AgentError::Internal { .. }));
        assert!(sessions.history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let agent = DbAgent::new(
            "m",
            Arc::new(ScriptedModel::new(Vec::new())),
            Arc::new(SessionStore::new()),
            settings(2),
        );
        let err = agent.chat(&request("s1", "hi")).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let agent = DbAgent::new(
            "m",
            Arc::new(ScriptedModel::new(Vec::new())),
            Arc::new(SessionStore::new()),
            settings(2),
        );
        let err = agent.chat(&request("s1", "  ")).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput { .. }));
    }
}
