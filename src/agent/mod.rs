//! Agent pool, per-model agents, schema cache and reply parsing.

pub mod cache;
pub mod db_agent;
pub mod manager;
pub mod response;

pub use cache::SchemaCache;
pub use db_agent::{AgentSettings, DEFAULT_INSTRUCTION, DbAgent};
pub use manager::{AgentManager, ModelBuilder};
pub use response::ResponseParser;
