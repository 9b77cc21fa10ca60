//! The `read_schema` tool.
//!
//! Serves the session's cached schema when fresh, otherwise extracts it from
//! the database named by the turn's connection string and caches the result.
//! Every outcome, including connection failures, is returned to the model as
//! a [`SchemaReaderOutput`].

use super::{Tool, ToolContext, input_schema};
use crate::agent::cache::SchemaCache;
use crate::db::{DbPool, SchemaExtractor};
use crate::error::{Advisory, AgentError};
use crate::models::{DatabaseSchema, mask_connection_string};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const TOOL_NAME: &str = "read_schema";

const TOOL_DESCRIPTION: &str = "Returns the full schema of the connected database: every table \
with its columns, primary key, foreign keys and indexes. The connection is already configured, \
so call this tool without arguments.";

pub const NO_CONNECTION_MESSAGE: &str =
    "No database connection configured. Please provide a connection string.";

pub const CACHE_HIT_MESSAGE: &str = "Schema loaded from cache.";

/// `read_schema` takes no input.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ReadSchemaInput {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Result handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaReaderOutput {
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<DatabaseSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SchemaReaderOutput {
    pub fn success(schema: DatabaseSchema) -> Self {
        Self {
            status: ToolStatus::Success,
            schema: Some(schema),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            schema: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

/// Timeouts applied to one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
}

/// Connect, ping, extract, close. Never fails: problems become error outputs.
pub async fn read_schema_from_database(
    connection_string: &str,
    options: ExtractOptions,
) -> SchemaReaderOutput {
    if connection_string.trim().is_empty() {
        return SchemaReaderOutput::error(NO_CONNECTION_MESSAGE);
    }

    debug!(
        connection = %mask_connection_string(connection_string),
        "Reading schema from database"
    );

    let pool = match DbPool::connect(connection_string, options.connect_timeout).await {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "Schema read: connection failed");
            return SchemaReaderOutput::error(format!("failed to connect to database: {}", e));
        }
    };

    if let Err(e) = pool.ping().await {
        pool.close().await;
        warn!(error = %e, "Schema read: ping failed");
        return SchemaReaderOutput::error(format!("failed to ping database: {}", e));
    }

    let result = tokio::time::timeout(options.query_timeout, SchemaExtractor::extract(&pool))
        .await
        .unwrap_or_else(|_| {
            Err(AgentError::timeout(
                "schema extraction",
                options.query_timeout.as_secs(),
            ))
        });
    pool.close().await;

    match result {
        Ok(schema) => SchemaReaderOutput::success(schema),
        Err(e) => {
            warn!(error = %e, "Schema read: extraction failed");
            SchemaReaderOutput::error(format!("failed to extract schema: {}", e))
        }
    }
}

/// Cache-aware schema read for one tool call.
pub async fn read_schema(ctx: &ToolContext) -> SchemaReaderOutput {
    if ctx.connection_string.trim().is_empty() {
        return SchemaReaderOutput::error(NO_CONNECTION_MESSAGE);
    }

    let cache = SchemaCache::new(ctx.schema_cache_ttl);
    if let Some(schema) = cache.get(ctx.session.as_ref()).await {
        debug!(tables = schema.table_count(), "Schema cache hit");
        return SchemaReaderOutput::success(schema).with_message(CACHE_HIT_MESSAGE);
    }

    let output = read_schema_from_database(
        &ctx.connection_string,
        ExtractOptions {
            connect_timeout: ctx.connect_timeout,
            query_timeout: ctx.query_timeout,
        },
    )
    .await;

    if let Some(schema) = &output.schema {
        match cache.set(ctx.session.as_ref(), schema).await {
            Advisory::Done => info!(tables = schema.table_count(), "Schema extracted and cached"),
            _ => info!(tables = schema.table_count(), "Schema extracted, not cached"),
        }
    }

    output
}

/// Tool glue for the agent runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadSchemaTool;

impl ReadSchemaTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ReadSchemaTool {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        input_schema::<ReadSchemaInput>()
    }

    async fn call(&self, _args: Value, ctx: &ToolContext) -> Value {
        let output = read_schema(ctx).await;
        serde_json::to_value(&output).unwrap_or_else(|e| {
            json!({
                "status": "error",
                "message": format!("failed to encode schema: {}", e),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::cache::{CACHED_SCHEMA_KEY, SCHEMA_CACHED_AT_KEY};
    use crate::error::AgentResult;
    use crate::session::{SessionState, SessionStore};
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteConnectOptions;
    use std::sync::Arc;

    fn context(store: &Arc<SessionStore>, connection_string: &str) -> ToolContext {
        ToolContext {
            session: Arc::new(store.handle("s1")),
            connection_string: connection_string.to_string(),
            schema_cache_ttl: Duration::from_secs(60),
            query_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_empty_connection_string_touches_nothing() {
        let store = Arc::new(SessionStore::new());
        let output = read_schema(&context(&store, "   ")).await;

        assert_eq!(output.status, ToolStatus::Error);
        assert_eq!(output.message.as_deref(), Some(NO_CONNECTION_MESSAGE));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_database() {
        let store = Arc::new(SessionStore::new());
        let ctx = context(&store, "postgres://nobody@127.0.0.1:1/none");
        let cached = DatabaseSchema::new("cached_db");
        SchemaCache::new(ctx.schema_cache_ttl)
            .set(ctx.session.as_ref(), &cached)
            .await;

        let output = read_schema(&ctx).await;
        assert!(output.is_success());
        assert_eq!(output.schema, Some(cached));
        assert_eq!(output.message.as_deref(), Some(CACHE_HIT_MESSAGE));
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_error_output() {
        let store = Arc::new(SessionStore::new());
        let output = read_schema(&context(&store, "oracle://db")).await;

        assert_eq!(output.status, ToolStatus::Error);
        assert!(
            output
                .message
                .unwrap()
                .starts_with("failed to connect to database")
        );
        let state = store.handle("s1");
        assert_eq!(state.get(CACHED_SCHEMA_KEY).await.unwrap(), None);
        assert_eq!(state.get(SCHEMA_CACHED_AT_KEY).await.unwrap(), None);
    }

    struct ReadOnlyState;

    #[async_trait]
    impl SessionState for ReadOnlyState {
        async fn get(&self, _key: &str) -> AgentResult<Option<Value>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Value) -> AgentResult<()> {
            Err(AgentError::state("read-only"))
        }
    }

    #[tokio::test]
    async fn test_cache_write_failure_keeps_schema() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fresh.db");
        SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true),
        )
        .await
        .unwrap()
        .close()
        .await;

        let store = Arc::new(SessionStore::new());
        let ctx = ToolContext {
            session: Arc::new(ReadOnlyState),
            ..context(&store, &format!("sqlite:{}", path.display()))
        };

        let output = read_schema(&ctx).await;
        assert!(output.is_success());
        assert_eq!(output.message, None);
        assert_eq!(output.schema.unwrap().database_name, "fresh");
    }

    #[test]
    fn test_output_serialization() {
        let value = serde_json::to_value(SchemaReaderOutput::error("boom")).unwrap();
        assert_eq!(value, json!({"status": "error", "message": "boom"}));
    }

    #[test]
    fn test_tool_definition() {
        let def = ReadSchemaTool::new().definition();
        assert_eq!(def.name, "read_schema");
        assert_eq!(def.parameters["type"], "object");
        assert!(def.parameters.get("$schema").is_none());
        assert!(!def.has_parameters());
    }
}
