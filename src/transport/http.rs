//! HTTP transport for the agent server.
//!
//! Routes:
//! - `POST /v1/agent/chat`: one chat turn
//! - `GET /v1/models`: models offered by the configured providers
//! - `GET /v1/health`: liveness probe

use crate::agent::AgentManager;
use crate::error::{AgentError, AgentResult};
use crate::models::{ChatRequest, Model, Query};
use crate::transport::Transport;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Body of `POST /v1/agent/chat`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatBody {
    pub session_id: Option<String>,
    pub message: String,
    /// Contains sensitive data - never log
    pub connection_string: String,
    pub model: Option<String>,
}

impl ChatBody {
    fn validate(&self) -> AgentResult<()> {
        if self.message.trim().is_empty() {
            return Err(AgentError::invalid_input("message is required"));
        }
        if self.connection_string.trim().is_empty() {
            return Err(AgentError::invalid_input("connection_string is required"));
        }
        Ok(())
    }
}

impl From<ChatBody> for ChatRequest {
    fn from(body: ChatBody) -> Self {
        Self {
            session_id: body.session_id.unwrap_or_default(),
            message: body.message,
            connection_string: body.connection_string,
            model: body.model,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub success: bool,
    pub session_id: String,
    pub message: String,
    pub queries: Vec<Query>,
}

#[derive(Debug, Serialize)]
pub struct ModelsReply {
    pub models: Vec<Model>,
    pub default_model: &'static str,
}

async fn chat(
    State(manager): State<Arc<AgentManager>>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return AgentError::invalid_input(rejection.body_text()).into_response();
        }
    };
    if let Err(e) = body.validate() {
        return e.into_response();
    }

    match manager.chat(body.into()).await {
        Ok(resp) => Json(ChatReply {
            success: true,
            session_id: resp.session_id,
            message: resp.message,
            queries: resp.queries,
        })
        .into_response(),
        Err(e) => {
            if e.is_configuration() {
                warn!(error = %e, "Chat request rejected");
            } else {
                error!(error = %e, "Chat request failed");
            }
            e.into_response()
        }
    }
}

async fn models(State(manager): State<Arc<AgentManager>>) -> Json<ModelsReply> {
    Json(ModelsReply {
        models: manager.available_models(),
        default_model: manager.default_model(),
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Build the API router around a shared agent pool.
pub fn router(manager: Arc<AgentManager>) -> Router {
    Router::new()
        .route("/v1/agent/chat", post(chat))
        .route("/v1/models", get(models))
        .route("/v1/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(manager)
}

/// HTTP transport serving the agent API.
pub struct HttpTransport {
    manager: Arc<AgentManager>,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
}

impl HttpTransport {
    pub fn new(manager: Arc<AgentManager>, host: impl Into<String>, port: u16) -> Self {
        Self {
            manager,
            host: host.into(),
            port,
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> AgentResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting agent server on {}", bind_addr);

        let app = router(Arc::clone(&self.manager));

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            AgentError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;

        // In-flight chat turns may wait on a slow provider; force exit after this.
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(AgentError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for requests to finish (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        info!("Closing agents");
        let _ = self.manager.close().await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
