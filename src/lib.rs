//! DB Agent Server Library
//!
//! An LLM agent that answers questions about a relational database. The agent
//! reads the live schema through the `read_schema` tool (cached per session)
//! and replies with an explanation plus proposed SQL queries.
//!
//! Supported databases: SQLite, PostgreSQL, MySQL. Supported model providers:
//! Google Gemini, OpenAI.

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod providers;
pub mod session;
pub mod tools;
pub mod transport;

pub use agent::AgentManager;
pub use config::Config;
pub use error::{AgentError, AgentResult};
