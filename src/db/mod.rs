//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Short-lived, database-specific connection pools
//! - Schema introspection
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod pool;
pub mod schema;

pub use pool::DbPool;
pub use schema::{
    ForeignKeyRow, IndexColumnRow, SchemaExtractor, group_index_rows, merge_foreign_key_rows,
};
