//! Session-scoped schema cache.
//!
//! A schema is stored as two session keys: the JSON-encoded snapshot and the
//! RFC3339 time it was written. An entry is served while its age does not
//! exceed the TTL. Any malformed or missing piece is treated as a miss.

use crate::error::{Advisory, AgentError};
use crate::models::DatabaseSchema;
use crate::session::SessionState;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const CACHED_SCHEMA_KEY: &str = "cached_schema";
pub const SCHEMA_CACHED_AT_KEY: &str = "schema_cached_at";

const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy)]
pub struct SchemaCache {
    ttl: Duration,
}

impl SchemaCache {
    /// A zero TTL falls back to one hour.
    pub fn new(ttl: Duration) -> Self {
        let ttl = if ttl.is_zero() { DEFAULT_TTL } else { ttl };
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached schema for the session, if present and fresh.
    pub async fn get(&self, state: &dyn SessionState) -> Option<DatabaseSchema> {
        self.get_at(state, Utc::now()).await
    }

    pub(crate) async fn get_at(
        &self,
        state: &dyn SessionState,
        now: DateTime<Utc>,
    ) -> Option<DatabaseSchema> {
        let blob = read_string(state, CACHED_SCHEMA_KEY).await?;
        let cached_at = read_string(state, SCHEMA_CACHED_AT_KEY).await?;

        let cached_at = match DateTime::parse_from_rfc3339(&cached_at) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                debug!(error = %e, "Ignoring cache entry with unparsable timestamp");
                return None;
            }
        };

        // A timestamp in the future counts as fresh.
        if let Ok(age) = (now - cached_at).to_std() {
            if age > self.ttl {
                debug!(age_secs = age.as_secs(), "Schema cache expired");
                return None;
            }
        }

        match serde_json::from_str(&blob) {
            Ok(schema) => Some(schema),
            Err(e) => {
                debug!(error = %e, "Ignoring undecodable cached schema");
                None
            }
        }
    }

    /// Store a schema for the session. Failures are logged and reported,
    /// never raised.
    pub async fn set(&self, state: &dyn SessionState, schema: &DatabaseSchema) -> Advisory {
        let blob = match serde_json::to_string(schema) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Failed to serialize schema for cache");
                return Advisory::Failed(vec![AgentError::internal(e.to_string())]);
            }
        };

        if let Err(e) = state.set(CACHED_SCHEMA_KEY, Value::String(blob)).await {
            warn!(error = %e, "Failed to cache schema");
            return Advisory::Failed(vec![e]);
        }

        let cached_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        if let Err(e) = state.set(SCHEMA_CACHED_AT_KEY, Value::String(cached_at)).await {
            warn!(error = %e, "Failed to cache schema timestamp");
            return Advisory::Failed(vec![e]);
        }

        Advisory::Done
    }
}

/// Non-empty string value under `key`; anything else is a miss.
async fn read_string(state: &dyn SessionState, key: &str) -> Option<String> {
    match state.get(key).await {
        Ok(Some(Value::String(s))) if !s.is_empty() => Some(s),
        Ok(_) => None,
        Err(e) => {
            debug!(key, error = %e, "Session state read failed");
            None
        }
    }
}
