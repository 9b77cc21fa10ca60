//! Schema snapshot data models.
//!
//! A [`DatabaseSchema`] is a point-in-time, normalized description of a
//! database's tables, columns, keys and indexes. It is what the `read_schema`
//! tool hands to the model and what the schema cache stores per session.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub database_name: String,
    /// Sorted by table name
    pub tables: Vec<TableSchema>,
}

impl DatabaseSchema {
    /// Create an empty snapshot for the named database.
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            tables: Vec::new(),
        }
    }

    /// Find a table by name.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    /// Ordinal position order
    pub columns: Vec<ColumnSchema>,
    /// Key definition order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
    /// Primary-key indexes are never listed here
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    /// Create a new table schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a column definition.
    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the primary key columns.
    pub fn with_primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = columns;
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Catalog-native type string
    pub data_type: String,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnSchema {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable,
            default: None,
            comment: None,
        }
    }

    /// Set the default expression. Empty strings are treated as no default.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        let default = default.into();
        self.default = (!default.is_empty()).then_some(default);
        self
    }

    /// Set the column comment. Empty strings are treated as no comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.comment = (!comment.is_empty()).then_some(comment);
        self
    }
}

/// A foreign key constraint. Catalog rows for the same constraint are merged
/// into one record, so `columns[i]` references `referenced_columns[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// Create a single-column foreign key.
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: vec![column.into()],
            referenced_table: referenced_table.into(),
            referenced_columns: vec![referenced_column.into()],
        }
    }

    /// Append a column pair to a composite key.
    pub fn push_pair(&mut self, column: impl Into<String>, referenced_column: impl Into<String>) {
        self.columns.push(column.into());
        self.referenced_columns.push(referenced_column.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
}

impl IndexSchema {
    /// Create a new index definition.
    pub fn new(name: impl Into<String>, columns: Vec<String>, is_unique: bool) -> Self {
        Self {
            name: name.into(),
            columns,
            is_unique,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_empty_default_and_comment_are_none() {
        let col = ColumnSchema::new("id", "integer", false)
            .with_default("")
            .with_comment("");
        assert_eq!(col.default, None);
        assert_eq!(col.comment, None);
    }

    #[test]
    fn test_column_serialization_skips_absent_fields() {
        let col = ColumnSchema::new("email", "text", true);
        let json = serde_json::to_string(&col).unwrap();
        assert!(!json.contains("default"));
        assert!(!json.contains("comment"));
        assert!(json.contains("\"is_nullable\":true"));
    }

    #[test]
    fn test_foreign_key_push_pair_keeps_lengths_equal() {
        let mut fk = ForeignKey::new("fk_orders_customer", "customer_id", "customers", "id");
        fk.push_pair("customer_region", "region");
        assert_eq!(fk.columns, vec!["customer_id", "customer_region"]);
        assert_eq!(fk.referenced_columns, vec!["id", "region"]);
    }

    #[test]
    fn test_table_deserializes_without_optional_lists() {
        let json = r#"{"name":"users","columns":[{"name":"id","data_type":"integer","is_nullable":false}]}"#;
        let table: TableSchema = serde_json::from_str(json).unwrap();
        assert_eq!(table.name, "users");
        assert!(table.primary_key.is_empty());
        assert!(table.foreign_keys.is_empty());
        assert!(table.indexes.is_empty());
    }

    #[test]
    fn test_schema_lookup_helpers() {
        let schema = DatabaseSchema {
            database_name: "shop".to_string(),
            tables: vec![
                TableSchema::new("orders").with_column(ColumnSchema::new("id", "int", false)),
            ],
        };
        assert_eq!(schema.table_count(), 1);
        assert!(schema.table("orders").unwrap().column("id").is_some());
        assert!(schema.table("missing").is_none());
    }
}
