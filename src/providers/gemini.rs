//! Google Gemini `generateContent` client.

use super::{
    ChatModel, Completion, CompletionRequest, Message, Role, ToolCall, ToolDefinition,
    provider_error,
};
use crate::error::{AgentError, AgentResult};
use crate::models::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTools<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools<'a> {
    function_declarations: Vec<GeminiFunctionDeclaration<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

/// Gemini chat model.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiModel {
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
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Map the conversation onto Gemini contents. Consecutive messages that
/// land on the same Gemini role share one content entry.
fn to_contents(messages: &[Message]) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = Vec::new();

    for message in messages {
        let role = match message.role {
            Role::Assistant => "model",
            Role::User | Role::Tool => "user",
        };

        let mut parts = Vec::new();
        match message.role {
            Role::Tool => {
                let raw = message.content.as_deref().unwrap_or_default();
                let response = match serde_json::from_str::<Value>(raw) {
                    Ok(value @ Value::Object(_)) => value,
                    Ok(other) => json!({ "result": other }),
                    Err(_) => json!({ "result": raw }),
                };
                parts.push(GeminiPart {
                    function_response: Some(GeminiFunctionResponse {
                        name: message.tool_name.clone().unwrap_or_default(),
                        response,
                    }),
                    ..Default::default()
                });
            }
            Role::User | Role::Assistant => {
                if let Some(text) = message.content.as_ref().filter(|t| !t.is_empty()) {
                    parts.push(GeminiPart {
                        text: Some(text.clone()),
                        ..Default::default()
                    });
                }
                for call in &message.tool_calls {
                    parts.push(GeminiPart {
                        function_call: Some(GeminiFunctionCall {
                            id: None,
                            name: call.name.clone(),
                            args: call.arguments_value(),
                        }),
                        thought_signature: call.signature.clone(),
                        ..Default::default()
                    });
                }
            }
        }

        if parts.is_empty() {
            continue;
        }
        match contents.last_mut() {
            Some(last) if last.role.as_deref() == Some(role) => last.parts.extend(parts),
            _ => contents.push(GeminiContent {
                role: Some(role.to_string()),
                parts,
            }),
        }
    }

    contents
}

fn to_tools(tools: &[ToolDefinition]) -> Vec<GeminiTools<'_>> {
    if tools.is_empty() {
        return Vec::new();
    }
    vec![GeminiTools {
        function_declarations: tools
            .iter()
            .map(|t| GeminiFunctionDeclaration {
                name: &t.name,
                description: &t.description,
                parameters: t.has_parameters().then_some(&t.parameters),
            })
            .collect(),
    }]
}

fn from_response(response: GenerateContentResponse) -> AgentResult<Completion> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::provider("google", "Response contained no candidates"))?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    let mut text = String::new();
    let mut calls = Vec::new();

    for part in parts {
        if let Some(call) = part.function_call {
            let id = call
                .id
                .unwrap_or_else(|| format!("call_{}_{}", call.name, calls.len()));
            calls.push(ToolCall {
                id,
                name: call.name,
                arguments: call.args.to_string(),
                signature: part.thought_signature,
            });
        } else if let Some(chunk) = part.text {
            if part.thought != Some(true) {
                text.push_str(&chunk);
            }
        }
    }

    if !calls.is_empty() {
        return Ok(Completion::ToolCalls(calls));
    }
    if text.is_empty() {
        return Err(AgentError::provider(
            "google",
            format!(
                "Empty response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        ));
    }
    Ok(Completion::Text(text))
}

#[async_trait]
impl ChatModel for GeminiModel {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> AgentResult<Completion> {
        let body = GenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(request.system.to_string()),
                    ..Default::default()
                }],
            },
            contents: to_contents(request.messages),
            tools: to_tools(request.tools),
        };

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            "Sending Gemini request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::provider("google", e.to_string()))?;

        if !response.status().is_success() {
            return Err(provider_error(Provider::Google, response).await);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AgentError::provider("google", format!("Invalid response: {}", e)))?;

        from_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_contents_maps_roles_and_merges_tool_results() {
        let call_a = ToolCall::new("a", "read_schema", "{}");
        let call_b = ToolCall::new("b", "read_schema", "{}");
        let messages = vec![
            Message::user("show me users"),
            Message::assistant_with_tools(vec![call_a.clone(), call_b.clone()]),
            Message::tool_result(&call_a, r#"{"status":"success"}"#),
            Message::tool_result(&call_b, "not json"),
        ];

        let contents = to_contents(&messages);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[1].parts.len(), 2);
        assert_eq!(contents[2].parts.len(), 2);

        let first = contents[2].parts[0].function_response.as_ref().unwrap();
        assert_eq!(first.name, "read_schema");
        assert_eq!(first.response["status"], "success");
        let second = contents[2].parts[1].function_response.as_ref().unwrap();
        assert_eq!(second.response["result"], "not json");
    }

    #[test]
    fn test_to_tools_omits_empty_parameters() {
        let tools = vec![ToolDefinition {
            name: "read_schema".into(),
            description: "Reads the schema".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let value = serde_json::to_value(to_tools(&tools)).unwrap();
        let decl = &value[0]["functionDeclarations"][0];
        assert_eq!(decl["name"], "read_schema");
        assert!(decl.get("parameters").is_none());
    }

    #[test]
    fn test_from_response_prefers_function_calls() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Let me look."},
                        {"functionCall": {"name": "read_schema", "args": {}}, "thoughtSignature": "sig"}
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        match from_response(response).unwrap() {
            Completion::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "read_schema");
                assert_eq!(calls[0].signature.as_deref(), Some("sig"));
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn test_from_response_skips_thoughts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "{\"message\":\"hi\"}"}
                ]}
            }]
        }))
        .unwrap();

        assert_eq!(
            from_response(response).unwrap(),
            Completion::Text("{\"message\":\"hi\"}".to_string())
        );
    }

    #[test]
    fn test_from_response_without_candidates_is_provider_error() {
        let response = GenerateContentResponse {
            candidates: Vec::new(),
        };
        assert!(matches!(
            from_response(response),
            Err(AgentError::Provider { .. })
        ));
    }
}
