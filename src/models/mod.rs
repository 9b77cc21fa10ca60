//! Data models for the DB Agent Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod agent;
pub mod chat;
pub mod connection;
pub mod schema;

// Re-export commonly used types
pub use agent::{Model, Provider, default_model_slug, model_by_slug};
pub use chat::{ChatRequest, ChatResponse, Query};
pub use connection::{DatabaseType, mask_connection_string};
pub use schema::{ColumnSchema, DatabaseSchema, ForeignKey, IndexSchema, TableSchema};
