//! Schema introspection module.
//!
//! Builds a [`DatabaseSchema`] snapshot of every base table in the default
//! schema of a PostgreSQL, MySQL or SQLite database.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each providing the same interface:
//!
//! - `database_name`
//! - `list_tables`
//! - `fetch_columns`
//! - `fetch_primary_key`
//! - `fetch_foreign_keys`
//! - `fetch_indexes`
//!
//! Foreign key and index catalogs return one row per column. Those rows are
//! folded into records by [`merge_foreign_key_rows`] and [`group_index_rows`].

use crate::db::pool::DbPool;
use crate::dispatch_backend;
use crate::error::{AgentError, AgentResult};
use crate::models::{ColumnSchema, DatabaseSchema, ForeignKey, IndexSchema, TableSchema};
use std::time::Instant;
use tracing::{debug, info};

/// One catalog row of a (possibly composite) foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// One catalog row of a (possibly multi-column) index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumnRow {
    pub index_name: String,
    pub column: String,
    pub is_unique: bool,
}

/// Merge per-column rows into one record per constraint.
///
/// Constraints keep the order in which they are first seen. Rows must already
/// be in key-ordinal order within each constraint.
pub fn merge_foreign_key_rows(rows: impl IntoIterator<Item = ForeignKeyRow>) -> Vec<ForeignKey> {
    let mut merged: Vec<ForeignKey> = Vec::new();
    for row in rows {
        match merged.iter_mut().find(|fk| fk.name == row.constraint_name) {
            Some(fk) => fk.push_pair(row.column, row.referenced_column),
            None => merged.push(ForeignKey::new(
                row.constraint_name,
                row.column,
                row.referenced_table,
                row.referenced_column,
            )),
        }
    }
    merged
}

/// Group per-column rows into one record per index, first-seen order.
pub fn group_index_rows(rows: impl IntoIterator<Item = IndexColumnRow>) -> Vec<IndexSchema> {
    let mut grouped: Vec<IndexSchema> = Vec::new();
    for row in rows {
        match grouped.iter_mut().find(|idx| idx.name == row.index_name) {
            Some(idx) => idx.columns.push(row.column),
            None => grouped.push(IndexSchema::new(
                row.index_name,
                vec![row.column],
                row.is_unique,
            )),
        }
    }
    grouped
}

/// Describe tables in order, stopping at the first failure.
async fn describe_tables<F, Fut>(
    table_names: Vec<String>,
    mut describe: F,
) -> AgentResult<Vec<TableSchema>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = AgentResult<TableSchema>>,
{
    let mut tables = Vec::with_capacity(table_names.len());
    for table_name in table_names {
        tables.push(describe(table_name).await?);
    }
    Ok(tables)
}

/// Schema extractor for database introspection.
pub struct SchemaExtractor;

impl SchemaExtractor {
    /// Extract the full schema over an open pool.
    ///
    /// Tables are described one after another; the first per-table failure
    /// aborts the extraction.
    pub async fn extract(pool: &DbPool) -> AgentResult<DatabaseSchema> {
        let started = Instant::now();

        let database_name = dispatch_backend!(pool, database_name())?;
        let table_names = dispatch_backend!(pool, list_tables())?;

        debug!(
            db_type = %pool.db_type(),
            table_count = table_names.len(),
            "Listing tables complete"
        );

        let mut schema = DatabaseSchema::new(database_name);
        schema.tables = describe_tables(table_names, move |table_name| async move {
            Self::describe_table(pool, &table_name).await
        })
        .await?;

        info!(
            database = %schema.database_name,
            tables = schema.table_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Schema extracted"
        );

        Ok(schema)
    }

    /// Describe a single table: columns, primary key, foreign keys, indexes.
    pub async fn describe_table(pool: &DbPool, table_name: &str) -> AgentResult<TableSchema> {
        let columns = dispatch_backend!(pool, fetch_columns(table_name))
            .map_err(|e| AgentError::schema(table_name, "columns", e))?;
        let primary_key = dispatch_backend!(pool, fetch_primary_key(table_name))
            .map_err(|e| AgentError::schema(table_name, "primary key", e))?;
        let foreign_key_rows = dispatch_backend!(pool, fetch_foreign_keys(table_name))
            .map_err(|e| AgentError::schema(table_name, "foreign keys", e))?;
        let index_rows = dispatch_backend!(pool, fetch_indexes(table_name))
            .map_err(|e| AgentError::schema(table_name, "indexes", e))?;

        Ok(TableSchema {
            name: table_name.to_string(),
            columns,
            primary_key,
            foreign_keys: merge_foreign_key_rows(foreign_key_rows),
            indexes: group_index_rows(index_rows),
        })
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================
//
// Each database has its own submodule with queries adapted to its catalogs.
// Table names are always bound as parameters.

mod queries {
    pub mod postgres {
        pub const SCHEMA: &str = "public";

        pub const DATABASE_NAME: &str = "SELECT current_database()::text";

        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = $1
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#;

        pub const COLUMNS: &str = r#"
            SELECT
                c.column_name::text AS column_name,
                c.data_type::text AS data_type,
                c.is_nullable::text AS is_nullable,
                c.column_default::text AS column_default,
                col_description(
                    (quote_ident(c.table_schema) || '.' || quote_ident(c.table_name))::regclass::oid,
                    c.ordinal_position::int
                ) AS column_comment
            FROM information_schema.columns c
            WHERE c.table_name = $1
            AND c.table_schema = $2
            ORDER BY c.ordinal_position
            "#;

        pub const PRIMARY_KEY: &str = r#"
            SELECT a.attname::text AS column_name
            FROM pg_index i
            JOIN pg_attribute a
                ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
            WHERE i.indrelid = (quote_ident($2) || '.' || quote_ident($1))::regclass
            AND i.indisprimary
            ORDER BY array_position(i.indkey, a.attnum)
            "#;

        pub const FOREIGN_KEYS: &str = r#"
            SELECT
                con.conname::text AS constraint_name,
                att.attname::text AS column_name,
                ref_cls.relname::text AS referenced_table,
                ref_att.attname::text AS referenced_column
            FROM pg_constraint con
            JOIN pg_class cls ON cls.oid = con.conrelid
            JOIN pg_namespace nsp ON nsp.oid = cls.relnamespace
            JOIN pg_class ref_cls ON ref_cls.oid = con.confrelid
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(attnum, ref_attnum, ord)
            JOIN pg_attribute att
                ON att.attrelid = con.conrelid AND att.attnum = k.attnum
            JOIN pg_attribute ref_att
                ON ref_att.attrelid = con.confrelid AND ref_att.attnum = k.ref_attnum
            WHERE con.contype = 'f'
            AND cls.relname = $1
            AND nsp.nspname = $2
            ORDER BY con.conname, k.ord
            "#;

        pub const INDEXES: &str = r#"
            SELECT
                ic.relname::text AS index_name,
                a.attname::text AS column_name,
                ix.indisunique AS is_unique
            FROM pg_index ix
            JOIN pg_class ic ON ic.oid = ix.indexrelid
            JOIN pg_attribute a
                ON a.attrelid = ix.indrelid AND a.attnum = ANY(ix.indkey)
            WHERE ix.indrelid = (quote_ident($2) || '.' || quote_ident($1))::regclass
            AND NOT ix.indisprimary
            ORDER BY ic.relname, array_position(ix.indkey, a.attnum)
            "#;
    }

    pub mod mysql {
        pub const DATABASE_NAME: &str = "SELECT CONVERT(DATABASE() USING utf8) AS DB_NAME";

        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const COLUMNS: &str = r#"
            SELECT
                CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
                CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
                CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE,
                CONVERT(COLUMN_DEFAULT USING utf8) AS COLUMN_DEFAULT,
                CONVERT(COLUMN_COMMENT USING utf8) AS COLUMN_COMMENT
            FROM information_schema.COLUMNS
            WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
            ORDER BY ORDINAL_POSITION
            "#;

        pub const PRIMARY_KEY: &str = r#"
            SELECT CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
            AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
            "#;

        pub const FOREIGN_KEYS: &str = r#"
            SELECT
                CONVERT(CONSTRAINT_NAME USING utf8) AS CONSTRAINT_NAME,
                CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
                CONVERT(REFERENCED_TABLE_NAME USING utf8) AS REFERENCED_TABLE_NAME,
                CONVERT(REFERENCED_COLUMN_NAME USING utf8) AS REFERENCED_COLUMN_NAME
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
            AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
            "#;

        pub const INDEXES: &str = r#"
            SELECT
                CONVERT(INDEX_NAME USING utf8) AS INDEX_NAME,
                CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
                CAST(CASE WHEN NON_UNIQUE = 0 THEN 1 ELSE 0 END AS SIGNED) AS IS_UNIQUE
            FROM information_schema.STATISTICS
            WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
            AND INDEX_NAME <> 'PRIMARY'
            AND COLUMN_NAME IS NOT NULL
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
            "#;
    }

    pub mod sqlite {
        pub const DATABASE_LIST: &str = "SELECT name, file FROM pragma_database_list WHERE name = 'main'";

        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const COLUMNS: &str = r#"
            SELECT name, type, "notnull", dflt_value
            FROM pragma_table_info(?)
            ORDER BY cid
            "#;

        pub const PRIMARY_KEY: &str = r#"
            SELECT name FROM pragma_table_info(?)
            WHERE pk > 0
            ORDER BY pk
            "#;

        pub const FOREIGN_KEYS: &str = r#"
            SELECT id, seq, "table", "from", "to"
            FROM pragma_foreign_key_list(?)
            ORDER BY id, seq
            "#;

        pub const INDEX_LIST: &str = r#"
            SELECT name, "unique" FROM pragma_index_list(?)
            WHERE origin <> 'pk'
            ORDER BY name
            "#;

        pub const INDEX_COLUMNS: &str = r#"
            SELECT name FROM pragma_index_info(?)
            WHERE name IS NOT NULL
            ORDER BY seqno
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    const SCHEMA: &str = queries::postgres::SCHEMA;

    pub async fn database_name(pool: &PgPool) -> AgentResult<String> {
        let name: String = sqlx::query_scalar(queries::postgres::DATABASE_NAME)
            .fetch_one(pool)
            .await?;
        Ok(name)
    }

    pub async fn list_tables(pool: &PgPool) -> AgentResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(queries::postgres::LIST_TABLES)
            .bind(SCHEMA)
            .fetch_all(pool)
            .await?;
        Ok(names)
    }

    pub async fn fetch_columns(pool: &PgPool, table_name: &str) -> AgentResult<Vec<ColumnSchema>> {
        let rows = sqlx::query(queries::postgres::COLUMNS)
            .bind(table_name)
            .bind(SCHEMA)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get("column_name")?;
                let data_type: String = row.try_get("data_type")?;
                let is_nullable: String = row.try_get("is_nullable")?;
                let default: Option<String> = row.try_get("column_default")?;
                let comment: Option<String> = row.try_get("column_comment")?;

                let mut column = ColumnSchema::new(name, data_type, is_nullable == "YES");
                if let Some(default) = default {
                    column = column.with_default(default);
                }
                if let Some(comment) = comment {
                    column = column.with_comment(comment);
                }
                Ok(column)
            })
            .collect()
    }

    pub async fn fetch_primary_key(pool: &PgPool, table_name: &str) -> AgentResult<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar(queries::postgres::PRIMARY_KEY)
            .bind(table_name)
            .bind(SCHEMA)
            .fetch_all(pool)
            .await?;
        Ok(columns)
    }

    pub async fn fetch_foreign_keys(
        pool: &PgPool,
        table_name: &str,
    ) -> AgentResult<Vec<ForeignKeyRow>> {
        let rows = sqlx::query(queries::postgres::FOREIGN_KEYS)
            .bind(table_name)
            .bind(SCHEMA)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ForeignKeyRow {
                    constraint_name: row.try_get("constraint_name")?,
                    column: row.try_get("column_name")?,
                    referenced_table: row.try_get("referenced_table")?,
                    referenced_column: row.try_get("referenced_column")?,
                })
            })
            .collect()
    }

    pub async fn fetch_indexes(pool: &PgPool, table_name: &str) -> AgentResult<Vec<IndexColumnRow>> {
        let rows = sqlx::query(queries::postgres::INDEXES)
            .bind(table_name)
            .bind(SCHEMA)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(IndexColumnRow {
                    index_name: row.try_get("index_name")?,
                    column: row.try_get("column_name")?,
                    is_unique: row.try_get("is_unique")?,
                })
            })
            .collect()
    }
}

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{MySqlPool, Row};

    /// Get an optional string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_optional_string(row: &MySqlRow, column: &str) -> AgentResult<Option<String>> {
        if let Ok(value) = row.try_get::<Option<String>, _>(column) {
            return Ok(value);
        }
        let bytes: Option<Vec<u8>> = row.try_get(column)?;
        bytes
            .map(|b| {
                String::from_utf8(b).map_err(|e| {
                    AgentError::internal(format!("Column {} is not valid UTF-8: {}", column, e))
                })
            })
            .transpose()
    }

    fn get_string(row: &MySqlRow, column: &str) -> AgentResult<String> {
        get_optional_string(row, column)?
            .ok_or_else(|| AgentError::internal(format!("Unexpected NULL in column {}", column)))
    }

    pub async fn database_name(pool: &MySqlPool) -> AgentResult<String> {
        let row = sqlx::query(queries::mysql::DATABASE_NAME)
            .fetch_one(pool)
            .await?;
        get_optional_string(&row, "DB_NAME")?.ok_or_else(|| {
            AgentError::invalid_input(
                "No database selected. Include the database name in the connection string.",
            )
        })
    }

    pub async fn list_tables(pool: &MySqlPool) -> AgentResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        rows.iter().map(|row| get_string(row, "TABLE_NAME")).collect()
    }

    pub async fn fetch_columns(
        pool: &MySqlPool,
        table_name: &str,
    ) -> AgentResult<Vec<ColumnSchema>> {
        let rows = sqlx::query(queries::mysql::COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| {
                let name = get_string(row, "COLUMN_NAME")?;
                let data_type = get_string(row, "COLUMN_TYPE")?;
                let is_nullable = get_string(row, "IS_NULLABLE")?;

                let mut column = ColumnSchema::new(name, data_type, is_nullable == "YES");
                if let Some(default) = get_optional_string(row, "COLUMN_DEFAULT")? {
                    column = column.with_default(default);
                }
                if let Some(comment) = get_optional_string(row, "COLUMN_COMMENT")? {
                    column = column.with_comment(comment);
                }
                Ok(column)
            })
            .collect()
    }

    pub async fn fetch_primary_key(pool: &MySqlPool, table_name: &str) -> AgentResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::PRIMARY_KEY)
            .bind(table_name)
            .fetch_all(pool)
            .await?;
        rows.iter().map(|row| get_string(row, "COLUMN_NAME")).collect()
    }

    pub async fn fetch_foreign_keys(
        pool: &MySqlPool,
        table_name: &str,
    ) -> AgentResult<Vec<ForeignKeyRow>> {
        let rows = sqlx::query(queries::mysql::FOREIGN_KEYS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ForeignKeyRow {
                    constraint_name: get_string(row, "CONSTRAINT_NAME")?,
                    column: get_string(row, "COLUMN_NAME")?,
                    referenced_table: get_string(row, "REFERENCED_TABLE_NAME")?,
                    referenced_column: get_string(row, "REFERENCED_COLUMN_NAME")?,
                })
            })
            .collect()
    }

    pub async fn fetch_indexes(
        pool: &MySqlPool,
        table_name: &str,
    ) -> AgentResult<Vec<IndexColumnRow>> {
        let rows = sqlx::query(queries::mysql::INDEXES)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| {
                let is_unique: i64 = row.try_get("IS_UNIQUE")?;
                Ok(IndexColumnRow {
                    index_name: get_string(row, "INDEX_NAME")?,
                    column: get_string(row, "COLUMN_NAME")?,
                    is_unique: is_unique != 0,
                })
            })
            .collect()
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};
    use std::path::Path;

    const MAIN: &str = "main";

    /// File stem of the main database, or `main` for in-memory databases.
    pub async fn database_name(pool: &SqlitePool) -> AgentResult<String> {
        let row = sqlx::query(queries::sqlite::DATABASE_LIST)
            .fetch_optional(pool)
            .await?;

        let file: Option<String> = match row {
            Some(row) => row.try_get("file")?,
            None => None,
        };

        Ok(file
            .as_deref()
            .and_then(|f| Path::new(f).file_stem())
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or(MAIN)
            .to_string())
    }

    pub async fn list_tables(pool: &SqlitePool) -> AgentResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        Ok(names)
    }

    pub async fn fetch_columns(
        pool: &SqlitePool,
        table_name: &str,
    ) -> AgentResult<Vec<ColumnSchema>> {
        let rows = sqlx::query(queries::sqlite::COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get("name")?;
                let data_type: String = row.try_get("type")?;
                let notnull: i64 = row.try_get("notnull")?;
                let default: Option<String> = row.try_get("dflt_value")?;

                let mut column = ColumnSchema::new(name, data_type, notnull == 0);
                if let Some(default) = default {
                    column = column.with_default(default);
                }
                Ok(column)
            })
            .collect()
    }

    pub async fn fetch_primary_key(
        pool: &SqlitePool,
        table_name: &str,
    ) -> AgentResult<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar(queries::sqlite::PRIMARY_KEY)
            .bind(table_name)
            .fetch_all(pool)
            .await?;
        Ok(columns)
    }

    /// SQLite foreign keys are unnamed, so names are derived from the
    /// constraint id. A missing target column means the parent's primary key.
    pub async fn fetch_foreign_keys(
        pool: &SqlitePool,
        table_name: &str,
    ) -> AgentResult<Vec<ForeignKeyRow>> {
        let rows = sqlx::query(queries::sqlite::FOREIGN_KEYS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let mut fk_rows = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            let seq: i64 = row.try_get("seq")?;
            let referenced_table: String = row.try_get("table")?;
            let column: String = row.try_get("from")?;
            let to: Option<String> = row.try_get("to")?;

            let referenced_column = match to {
                Some(to) => to,
                None => fetch_primary_key(pool, &referenced_table)
                    .await?
                    .into_iter()
                    .nth(seq as usize)
                    .unwrap_or_else(|| "rowid".to_string()),
            };

            fk_rows.push(ForeignKeyRow {
                constraint_name: format!("fk_{}_{}", table_name, id),
                column,
                referenced_table,
                referenced_column,
            });
        }
        Ok(fk_rows)
    }

    pub async fn fetch_indexes(
        pool: &SqlitePool,
        table_name: &str,
    ) -> AgentResult<Vec<IndexColumnRow>> {
        let indexes = sqlx::query(queries::sqlite::INDEX_LIST)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let mut rows = Vec::new();
        for index in &indexes {
            let index_name: String = index.try_get("name")?;
            let unique: i64 = index.try_get("unique")?;

            let columns: Vec<String> = sqlx::query_scalar(queries::sqlite::INDEX_COLUMNS)
                .bind(&index_name)
                .fetch_all(pool)
                .await?;

            rows.extend(columns.into_iter().map(|column| IndexColumnRow {
                index_name: index_name.clone(),
                column,
                is_unique: unique != 0,
            }));
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_describe_tables_stops_at_first_failure() {
        let names = vec!["t1".to_string(), "t2".to_string(), "t3".to_string()];
        let mut described = Vec::new();

        let result = describe_tables(names, |table_name| {
            described.push(table_name.clone());
            async move {
                if table_name == "t2" {
                    Err(AgentError::schema(&table_name, "foreign keys", "permission denied"))
                } else {
                    Ok(TableSchema::new(table_name))
                }
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(AgentError::Schema { ref table, ref operation, .. })
                if table == "t2" && operation == "foreign keys"
        ));
        assert_eq!(described, vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_describe_tables_keeps_order() {
        let names = vec!["b".to_string(), "a".to_string()];
        let tables = describe_tables(names, |table_name| async move {
            Ok(TableSchema::new(table_name))
        })
        .await
        .unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    fn fk_row(name: &str, column: &str, table: &str, referenced: &str) -> ForeignKeyRow {
        ForeignKeyRow {
            constraint_name: name.to_string(),
            column: column.to_string(),
            referenced_table: table.to_string(),
            referenced_column: referenced.to_string(),
        }
    }

    #[test]
    fn test_merge_composite_foreign_key() {
        let merged = merge_foreign_key_rows(vec![
            fk_row("fk_line_order", "order_id", "orders", "id"),
            fk_row("fk_line_order", "order_rev", "orders", "rev"),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].columns, vec!["order_id", "order_rev"]);
        assert_eq!(merged[0].referenced_columns, vec!["id", "rev"]);
        assert_eq!(merged[0].referenced_table, "orders");
    }

    #[test]
    fn test_merge_keeps_first_seen_order() {
        let merged = merge_foreign_key_rows(vec![
            fk_row("z_fk", "a", "t1", "id"),
            fk_row("a_fk", "b", "t2", "id"),
            fk_row("z_fk", "c", "t1", "rev"),
        ]);

        let names: Vec<_> = merged.iter().map(|fk| fk.name.as_str()).collect();
        assert_eq!(names, vec!["z_fk", "a_fk"]);
        assert_eq!(merged[0].columns, vec!["a", "c"]);
        for fk in &merged {
            assert_eq!(fk.columns.len(), fk.referenced_columns.len());
        }
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_foreign_key_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_group_index_rows() {
        let rows = vec![
            IndexColumnRow {
                index_name: "idx_name_email".to_string(),
                column: "name".to_string(),
                is_unique: false,
            },
            IndexColumnRow {
                index_name: "idx_name_email".to_string(),
                column: "email".to_string(),
                is_unique: false,
            },
            IndexColumnRow {
                index_name: "uq_email".to_string(),
                column: "email".to_string(),
                is_unique: true,
            },
        ];

        let indexes = group_index_rows(rows);
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].columns, vec!["name", "email"]);
        assert!(!indexes[0].is_unique);
        assert!(indexes[1].is_unique);
    }
}
