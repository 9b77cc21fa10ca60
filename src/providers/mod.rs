//! LLM provider clients.
//!
//! Every provider implements [`ChatModel`]: one request/response exchange
//! with the vendor's HTTP API, carrying the conversation so far and the
//! declared tools. The agent loop in [`crate::agent::db_agent`] drives the
//! tool-calling protocol on top of it.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiModel;
pub use openai::OpenAIModel;

use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::models::{Model, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Set on tool results; Gemini matches responses by function name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// An assistant turn that only requests tool calls.
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls,
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// The result of executing `call`.
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call.id.clone()),
            tool_name: Some(call.name.clone()),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
    /// Opaque Gemini thought signature, echoed back on the next request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
            signature: None,
        }
    }

    /// Arguments decoded as JSON; blank arguments decode to an empty object.
    pub fn arguments_value(&self) -> Value {
        if self.arguments.trim().is_empty() {
            return Value::Object(Default::default());
        }
        serde_json::from_str(&self.arguments).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

/// A tool declaration offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the input object
    pub parameters: Value,
}

impl ToolDefinition {
    /// Whether the input object declares any properties.
    pub fn has_parameters(&self) -> bool {
        self.parameters
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|props| !props.is_empty())
    }
}

/// Everything a provider needs for one exchange.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
}

/// What the model answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Final answer text
    Text(String),
    /// The model wants these tools run before it answers
    ToolCalls(Vec<ToolCall>),
}

/// One LLM behind a vendor API.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn provider(&self) -> Provider;

    fn model_name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest<'_>) -> AgentResult<Completion>;

    /// Release provider resources. Nothing to release for plain HTTP clients.
    async fn close(&self) -> AgentResult<()> {
        Ok(())
    }
}

/// Build the chat model for a registry entry.
///
/// Fails with `ProviderNotConfigured` when the provider has no API key.
pub fn build_chat_model(model: &Model, config: &AgentConfig) -> AgentResult<Arc<dyn ChatModel>> {
    let api_key = config
        .api_key(model.provider)
        .ok_or_else(|| AgentError::provider_not_configured(model.provider.as_str()))?;
    let client = http_client(config.provider_timeout)?;
    let base_url = config.base_url(model.provider);

    let chat_model: Arc<dyn ChatModel> = match model.provider {
        Provider::Google => Arc::new(GeminiModel::new(client, base_url, api_key, model.slug)),
        Provider::OpenAI => Arc::new(OpenAIModel::new(client, base_url, api_key, model.slug)),
    };
    Ok(chat_model)
}

fn http_client(timeout: Duration) -> AgentResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AgentError::internal(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success provider response into an error, preferring the
/// vendor's `error.message` field over the raw body.
pub(crate) async fn provider_error(provider: Provider, response: reqwest::Response) -> AgentError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or(body);
    AgentError::provider(provider.as_str(), format!("{}: {}", status, detail.trim()))
}
