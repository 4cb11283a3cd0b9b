//! Planned column changes and the constraint and label records derived from them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldDescriptor, TableDescriptor, is_empty_value};

/// Column changes for one table, consumed by a single migration call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnPlan {
    /// New columns, name to definition.
    pub columns: IndexMap<String, String>,
    /// Existing columns to alter, name to definition.
    pub alter_columns: IndexMap<String, String>,
    /// Existing columns to drop, in table order.
    pub drop_columns: Vec<String>,
    /// Foreign keys to (re)create.
    pub references: Vec<ForeignKeyConstraint>,
    /// Indexes to (re)create.
    pub indexes: Vec<IndexConstraint>,
    /// Label metadata to upsert.
    pub labels: Vec<LabelRecord>,
}

impl ColumnPlan {
    /// Whether no column DDL is planned.
    pub fn has_column_changes(&self) -> bool {
        !(self.columns.is_empty() && self.alter_columns.is_empty() && self.drop_columns.is_empty())
    }

    /// Move the deferred constraint and label records of another plan into this one.
    pub fn absorb_deferred(&mut self, other: ColumnPlan) {
        self.references.extend(other.references);
        self.indexes.extend(other.indexes);
        self.labels.extend(other.labels);
    }
}

/// A foreign key named `fk_<table>_<column>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    /// Constraint name.
    pub name: String,
    /// Owning table.
    pub table: String,
    /// Owning column.
    pub column: String,
    /// Referenced table.
    pub ref_table: String,
    /// Referenced column.
    pub ref_fields: String,
    /// `ON DELETE` action.
    pub on_delete: Option<String>,
    /// `ON UPDATE` action.
    pub on_update: Option<String>,
    /// Drop an existing constraint of the same name first.
    pub drop: bool,
}

impl ForeignKeyConstraint {
    /// Build a constraint with the synthetic name.
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_fields: impl Into<String>,
    ) -> Self {
        let table = table.into();
        let column = column.into();
        Self {
            name: format!("fk_{}_{}", table, column),
            table,
            column,
            ref_table: ref_table.into(),
            ref_fields: ref_fields.into(),
            on_delete: None,
            on_update: None,
            drop: false,
        }
    }
}

/// An index named `ndx_<table>_<column>` or `undx_<table>_<column>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConstraint {
    /// Index name.
    pub name: String,
    /// Owning table.
    pub table: String,
    /// Indexed column.
    pub column: String,
    /// Unique index.
    pub unique: bool,
    /// Drop an existing index of the same name first.
    pub drop: bool,
}

impl IndexConstraint {
    /// Build an index with the synthetic name.
    pub fn new(table: impl Into<String>, column: impl Into<String>, unique: bool) -> Self {
        let table = table.into();
        let column = column.into();
        let prefix = if unique { "undx" } else { "ndx" };
        Self {
            name: format!("{}_{}_{}", prefix, table, column),
            table,
            column,
            unique,
            drop: false,
        }
    }
}

/// One metadata row, keyed by `(table, field)`; `field` is empty for the table itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Table name.
    pub table: String,
    /// Field name, or empty.
    pub field: String,
    /// Label.
    pub label: Option<String>,
    /// Plural label (tables only).
    pub plural: Option<String>,
    /// Newline-delimited picklist.
    pub picklist: Option<String>,
    /// Validation rules as JSON text.
    pub validation: Option<String>,
    /// Naming field (tables only).
    pub name_field: Option<String>,
}

impl LabelRecord {
    /// Record for a table descriptor.
    pub fn for_table(table: &TableDescriptor) -> Self {
        Self {
            table: table.name.clone(),
            field: String::new(),
            label: table.label.clone(),
            plural: table.plural.clone(),
            name_field: table.name_field.clone(),
            ..Default::default()
        }
    }

    /// Record for a field descriptor.
    pub fn for_field(table: &str, field: &FieldDescriptor) -> Self {
        Self {
            table: table.to_string(),
            field: field.name.clone(),
            label: field.label.clone().filter(|l| !l.is_empty()),
            picklist: field
                .values
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(|v| v.to_text()),
            validation: field
                .validation
                .as_ref()
                .filter(|v| !is_empty_value(v))
                .map(|v| v.to_string()),
            ..Default::default()
        }
    }

    /// Whether the record addresses the same row as another.
    pub fn same_key(&self, other: &LabelRecord) -> bool {
        self.table.eq_ignore_ascii_case(&other.table) && self.field.eq_ignore_ascii_case(&other.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constraint_names() {
        let fk = ForeignKeyConstraint::new("widgets", "owner_id", "users", "id");
        assert_eq!(fk.name, "fk_widgets_owner_id");
        assert!(!fk.drop);

        assert_eq!(IndexConstraint::new("widgets", "sku", true).name, "undx_widgets_sku");
        assert_eq!(IndexConstraint::new("widgets", "sku", false).name, "ndx_widgets_sku");
    }

    #[test]
    fn test_field_label_record() {
        let field = FieldDescriptor::new("color", "string")
            .label("Color")
            .picklist(["red", "green"])
            .validation(json!({"not_empty": true}));
        let record = LabelRecord::for_field("widgets", &field);

        assert_eq!(record.label.as_deref(), Some("Color"));
        assert_eq!(record.picklist.as_deref(), Some("red\ngreen"));
        assert_eq!(record.validation.as_deref(), Some(r#"{"not_empty":true}"#));
    }

    #[test]
    fn test_same_key_is_case_insensitive() {
        let a = LabelRecord {
            table: "Widgets".into(),
            ..Default::default()
        };
        let b = LabelRecord {
            table: "widgets".into(),
            label: Some("x".into()),
            ..Default::default()
        };
        assert!(a.same_key(&b));
    }
}
