//! Parsing of the model's final answer.
//!
//! Models are asked to answer with `{"message": ..., "queries": [...]}` but
//! often wrap it in a Markdown fence or answer in prose. Parsing never fails:
//! anything that does not decode becomes a text-only response carrying the
//! raw reply.

use crate::models::{ChatResponse, Query};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct StructuredReply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    queries: Option<Vec<ReplyQuery>>,
}

#[derive(Debug, Deserialize)]
struct ReplyQuery {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<ReplyQuery> for Query {
    fn from(q: ReplyQuery) -> Self {
        Query {
            title: q.title.unwrap_or_default(),
            query: q.query.unwrap_or_default(),
            description: q.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, session_id: &str, raw: &str) -> ChatResponse {
        let cleaned = strip_code_fence(raw);

        match serde_json::from_str::<StructuredReply>(cleaned) {
            Ok(reply) => {
                let queries: Vec<Query> = reply
                    .queries
                    .unwrap_or_default()
                    .into_iter()
                    .map(Query::from)
                    .collect();
                debug!(queries = queries.len(), "Parsed structured reply");
                ChatResponse {
                    session_id: session_id.to_string(),
                    message: reply.message.unwrap_or_default(),
                    queries,
                }
            }
            Err(e) => {
                debug!(error = %e, "Reply is not structured, returning raw text");
                ChatResponse::text(session_id, raw)
            }
        }
    }

    /// Cheap pre-check: does the cleaned reply look like a JSON object?
    pub fn looks_like_json_object(&self, raw: &str) -> bool {
        let cleaned = strip_code_fence(raw);
        cleaned.starts_with('{') && cleaned.ends_with('}')
    }
}

/// Trim, drop one leading ```json / ```JSON / ``` marker and one trailing
/// ``` marker, trim again.
fn strip_code_fence(raw: &str) -> &str {
    let mut s = raw.trim();
    for fence in ["```json", "```JSON", "```"] {
        if let Some(rest) = s.strip_prefix(fence) {
            s = rest;
        }
    }
    s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}
