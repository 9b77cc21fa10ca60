//! Error types for the DB Agent Server.
//!
//! Two categories of outcome are distinguished here:
//!
//! - [`AgentResult`] for operations whose failure the caller must handle
//!   (model resolution, agent construction, provider calls, extraction).
//! - [`Advisory`] for best-effort operations (schema cache writes, pool
//!   teardown). Failures are logged where they happen and the outcome is
//!   informational only.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Unknown model: {slug}")]
    UnknownModel { slug: String },

    #[error("Provider {provider} is not configured")]
    ProviderNotConfigured { provider: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Failed to read {operation} for table {table}: {message}")]
    Schema {
        table: String,
        /// columns, primary key, foreign keys or indexes
        operation: String,
        message: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout { operation: String, elapsed_secs: u64 },

    #[error("{provider} API error: {message}")]
    Provider { provider: String, message: String },

    #[error("Session state error: {message}")]
    State { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AgentError {
    /// Create an unknown model error.
    pub fn unknown_model(slug: impl Into<String>) -> Self {
        Self::UnknownModel { slug: slug.into() }
    }

    /// Create a provider-not-configured error.
    pub fn provider_not_configured(provider: impl Into<String>) -> Self {
        Self::ProviderNotConfigured {
            provider: provider.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    /// Wrap a per-table metadata failure.
    pub fn schema(
        table: impl Into<String>,
        operation: impl Into<String>,
        source: impl std::fmt::Display,
    ) -> Self {
        Self::Schema {
            table: table.into(),
            operation: operation.into(),
            message: source.to_string(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an LLM provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a session state error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Configuration errors are fatal to one request only.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownModel { .. } | Self::ProviderNotConfigured { .. }
        )
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownModel { .. }
            | Self::ProviderNotConfigured { .. }
            | Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Provider { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert sqlx errors to AgentError.
impl From<sqlx::Error> for AgentError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => AgentError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                AgentError::database(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => AgentError::database("No rows returned", None),
            sqlx::Error::PoolTimedOut => AgentError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                AgentError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => AgentError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => AgentError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => AgentError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                AgentError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                AgentError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                AgentError::internal(format!("Decode error: {}", source))
            }
            sqlx::Error::WorkerCrashed => AgentError::internal("Database worker crashed"),
            _ => AgentError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return AgentError::timeout("provider request", 0);
        }
        AgentError::provider("http", err.to_string())
    }
}

/// Result type alias for operations whose failure must be handled.
pub type AgentResult<T> = Result<T, AgentError>;

/// Outcome of a best-effort operation. Failures have already been logged.
#[derive(Debug)]
pub enum Advisory {
    /// The operation completed.
    Done,
    /// The operation was not attempted.
    Skipped(String),
    /// The operation was attempted and one or more steps failed.
    Failed(Vec<AgentError>),
}

impl Advisory {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Collapse a list of step failures into an outcome.
    pub fn from_failures(failures: Vec<AgentError>) -> Self {
        if failures.is_empty() {
            Self::Done
        } else {
            Self::Failed(failures)
        }
    }
}

/// Error body returned by the HTTP surface.
#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            suggestion: self.suggestion().map(String::from),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = AgentError::connection("refused", "Check the server is running");
        assert_eq!(err.suggestion(), Some("Check the server is running"));
        assert_eq!(AgentError::internal("x").suggestion(), None);
    }

    #[test]
    fn test_schema_error_identifies_table_and_operation() {
        let err = AgentError::schema("orders", "foreign keys", "relation does not exist");
        let msg = err.to_string();
        assert!(msg.contains("orders"));
        assert!(msg.contains("foreign keys"));
        assert!(msg.contains("relation does not exist"));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(AgentError::unknown_model("nope").is_configuration());
        assert!(AgentError::provider_not_configured("openai").is_configuration());
        assert!(!AgentError::internal("boom").is_configuration());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AgentError::unknown_model("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AgentError::provider_not_configured("google").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AgentError::provider("google", "quota").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AgentError::timeout("chat", 30).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AgentError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_advisory_from_failures() {
        assert!(Advisory::from_failures(Vec::new()).is_done());
        let outcome = Advisory::from_failures(vec![AgentError::internal("x")]);
        assert!(matches!(outcome, Advisory::Failed(ref f) if f.len() == 1));
    }
}
