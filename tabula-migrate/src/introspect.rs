//! Introspected table structure.

use serde::{Deserialize, Serialize};

use crate::definition::ColumnDefinition;

/// Raw column information from the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Native type, e.g. `varchar(128)`.
    pub db_type: String,
    /// Character or binary length.
    pub size: Option<u32>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
    /// Default expression.
    pub default: Option<String>,
    /// Whether the column is nullable.
    pub allow_null: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Whether the column is the primary key.
    pub is_primary_key: bool,
    /// Whether the column carries a foreign key.
    pub is_foreign_key: bool,
    /// Referenced table.
    pub ref_table: Option<String>,
    /// Referenced column.
    pub ref_field: Option<String>,
}

impl ColumnSchema {
    /// Build from a parsed column definition.
    pub fn from_definition(name: impl Into<String>, def: &ColumnDefinition) -> Self {
        Self {
            name: name.into(),
            db_type: def.db_type.clone(),
            size: def.size,
            precision: def.precision,
            scale: def.scale,
            default: def.default_unquoted(),
            allow_null: def.nullable,
            auto_increment: def.auto_increment,
            is_primary_key: def.primary_key,
            ..Default::default()
        }
    }

    /// Whether the column references `table.field` (case-insensitive).
    pub fn references(&self, table: &str, field: &str) -> bool {
        self.is_foreign_key
            && self
                .ref_table
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(table))
            && self
                .ref_field
                .as_deref()
                .is_some_and(|f| f.eq_ignore_ascii_case(field))
    }
}

/// Columns of one table, in physical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name as stored.
    pub name: String,
    /// Columns.
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Create an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Find a column, ignoring case.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Mutable column lookup, ignoring case.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnSchema> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// The primary key column, if any.
    pub fn primary_key(&self) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.is_primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        let mut schema = TableSchema::new("widgets");
        schema.columns.push(ColumnSchema::from_definition(
            "id",
            &ColumnDefinition::parse("int NOT NULL AUTO_INCREMENT PRIMARY KEY"),
        ));
        schema.columns.push(ColumnSchema {
            is_foreign_key: true,
            ref_table: Some("users".into()),
            ref_field: Some("id".into()),
            ..ColumnSchema::from_definition("owner_id", &ColumnDefinition::parse("int NULL"))
        });
        schema
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let schema = schema();
        assert!(schema.column("OWNER_ID").is_some());
        assert_eq!(schema.primary_key().map(|c| c.name.as_str()), Some("id"));
    }

    #[test]
    fn test_foreign_key_references() {
        let schema = schema();
        assert!(schema.column("owner_id").unwrap().references("Users", "ID"));
        assert!(!schema.column("owner_id").unwrap().references("accounts", "id"));
    }
}
