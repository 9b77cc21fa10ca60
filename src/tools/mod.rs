//! Agent tool implementations.
//!
//! This module contains the tools an agent may call during a chat turn:
//! - `read_schema`: Read the schema of the conversation's database
//!
//! Tools receive their per-turn inputs (connection string, cache TTL,
//! timeouts, session state) through an explicit [`ToolContext`].

pub mod read_schema;

pub use read_schema::{ReadSchemaInput, ReadSchemaTool, SchemaReaderOutput, ToolStatus};

use crate::providers::{ToolCall, ToolDefinition};
use crate::session::SessionState;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Request-scoped values a tool can reach.
#[derive(Clone)]
pub struct ToolContext {
    pub session: Arc<dyn SessionState>,
    /// Contains sensitive data - never log
    pub connection_string: String,
    pub schema_cache_ttl: Duration,
    pub query_timeout: Duration,
    pub connect_timeout: Duration,
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("connection_string", &"<redacted>")
            .field("schema_cache_ttl", &self.schema_cache_ttl)
            .field("query_timeout", &self.query_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the tool's input object.
    fn parameters(&self) -> Value;

    /// Run the tool. Failures are reported inside the returned JSON.
    async fn call(&self, args: Value, ctx: &ToolContext) -> Value;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Input schema for `T`, without the top-level keys providers reject.
pub fn input_schema<T: JsonSchema>() -> Value {
    let mut value = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("type").or_insert_with(|| json!("object"));
        obj.entry("properties").or_insert_with(|| json!({}));
    }
    value
}

/// Tools registered on one agent, keyed by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations for every tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a requested call and encode its result for the model.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> String {
        let result = match self.get(&call.name) {
            Some(tool) => {
                debug!(tool = %call.name, call_id = %call.id, "Executing tool");
                tool.call(call.arguments_value(), ctx).await
            }
            None => {
                warn!(tool = %call.name, "Model requested unknown tool");
                json!({
                    "status": "error",
                    "message": format!("Unknown tool: {}", call.name),
                })
            }
        };
        result.to_string()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.tools.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
