//! DB Agent Server - Main entry point.
//!
//! Serves a chat API where an LLM agent inspects the caller's database schema
//! and proposes SQL queries.

use clap::Parser;
use db_agent_server::agent::AgentManager;
use db_agent_server::config::Config;
use db_agent_server::models::Provider;
use db_agent_server::transport::{HttpTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    let agent_config = config.agent_config();

    // At least one provider is needed to serve any model
    if !Provider::ALL.iter().any(|p| agent_config.is_configured(*p)) {
        eprintln!("Error: No LLM provider is configured.");
        eprintln!();
        eprintln!("Set at least one API key:");
        for provider in Provider::ALL {
            eprintln!("  {}=<key>", provider.env_key());
        }
        std::process::exit(1);
    }

    info!(
        addr = %config.http_bind_addr(),
        "Starting DB Agent Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let manager = Arc::new(AgentManager::new(agent_config));
    let transport = HttpTransport::new(manager, &config.host, config.port);

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
