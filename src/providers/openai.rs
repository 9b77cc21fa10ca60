//! OpenAI `chat/completions` client.

use super::{
    ChatModel, Completion, CompletionRequest, Message, Role, ToolCall, ToolDefinition,
    provider_error,
};
use crate::error::{AgentError, AgentResult};
use crate::models::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAIToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAIFunction<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

fn function_type() -> String {
    "function".to_string()
}

/// OpenAI chat model.
#[derive(Debug, Clone)]
pub struct OpenAIModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAIModel {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

fn to_messages(system: &str, messages: &[Message]) -> Vec<OpenAIMessage> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(OpenAIMessage {
        role: "system".to_string(),
        content: Some(system.to_string()),
        tool_calls: Vec::new(),
        tool_call_id: None,
    });

    out.extend(messages.iter().map(|m| OpenAIMessage {
        role: match m.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
        .to_string(),
        content: m.content.clone(),
        tool_calls: m
            .tool_calls
            .iter()
            .map(|c| OpenAIToolCall {
                id: c.id.clone(),
                kind: function_type(),
                function: OpenAIFunctionCall {
                    name: c.name.clone(),
                    arguments: c.arguments.clone(),
                },
            })
            .collect(),
        tool_call_id: m.tool_call_id.clone(),
    }));
    out
}

fn to_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool<'_>> {
    tools
        .iter()
        .map(|t| OpenAITool {
            kind: "function",
            function: OpenAIFunction {
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            },
        })
        .collect()
}

fn from_response(response: ChatCompletionResponse) -> AgentResult<Completion> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::provider("openai", "Response contained no choices"))?;

    if !choice.message.tool_calls.is_empty() {
        let calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|c| ToolCall::new(c.id, c.function.name, c.function.arguments))
            .collect();
        return Ok(Completion::ToolCalls(calls));
    }

    match choice.message.content.filter(|c| !c.is_empty()) {
        Some(text) => Ok(Completion::Text(text)),
        None => Err(AgentError::provider(
            "openai",
            format!(
                "Empty response (finish reason: {})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ),
        )),
    }
}

#[async_trait]
impl ChatModel for OpenAIModel {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> AgentResult<Completion> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: to_messages(request.system, request.messages),
            tools: to_tools(request.tools),
        };

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            "Sending OpenAI request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::provider("openai", e.to_string()))?;

        if !response.status().is_success() {
            return Err(provider_error(Provider::OpenAI, response).await);
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::provider("openai", format!("Invalid response: {}", e)))?;

        from_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_messages_prepends_system_and_keeps_tool_links() {
        let call = ToolCall::new("call_1", "read_schema", "{}");
        let messages = vec![
            Message::user("hi"),
            Message::assistant_with_tools(vec![call.clone()]),
            Message::tool_result(&call, "{}"),
        ];

        let value = serde_json::to_value(to_messages("be helpful", &messages)).unwrap();
        assert_eq!(value[0]["role"], "system");
        assert_eq!(value[0]["content"], "be helpful");
        assert_eq!(value[2]["tool_calls"][0]["type"], "function");
        assert_eq!(value[2]["tool_calls"][0]["function"]["name"], "read_schema");
        assert_eq!(value[3]["role"], "tool");
        assert_eq!(value[3]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_from_response_tool_calls() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "read_schema", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        assert_eq!(
            from_response(response).unwrap(),
            Completion::ToolCalls(vec![ToolCall::new("call_abc", "read_schema", "{}")])
        );
    }

    #[test]
    fn test_from_response_empty_content_is_error() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": ""}, "finish_reason": "length"}]
        }))
        .unwrap();

        let err = from_response(response).unwrap_err();
        assert!(err.to_string().contains("length"));
    }
}
