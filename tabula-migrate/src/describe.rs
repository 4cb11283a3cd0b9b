//! Table descriptions: introspected columns merged with label metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::Picklist;
use crate::introspect::{ColumnSchema, TableSchema};
use crate::plan::LabelRecord;
use crate::types::FieldCategory;

/// A table as stored, with its labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    /// Stored table name.
    pub name: String,
    /// Table label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Plural label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    /// Naming field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_field: Option<String>,
    /// Columns in table order.
    #[serde(rename = "field")]
    pub fields: Vec<FieldDescription>,
}

impl TableDescription {
    /// Merge a schema with the table row and one optional row per column.
    pub fn new(
        schema: TableSchema,
        table_label: Option<LabelRecord>,
        mut field_labels: Vec<Option<LabelRecord>>,
    ) -> Self {
        field_labels.resize(schema.columns.len(), None);
        let fields = schema
            .columns
            .into_iter()
            .zip(field_labels)
            .map(|(column, label)| FieldDescription::new(column, label))
            .collect();

        let table_label = table_label.unwrap_or_default();
        Self {
            name: schema.name,
            label: table_label.label,
            plural: table_label.plural,
            name_field: table_label.name_field,
            fields,
        }
    }

    /// Field by name, ignoring case.
    pub fn field(&self, name: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// A column as stored, with its category re-inferred from the native type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescription {
    /// Column name.
    pub name: String,
    /// Category inferred from `db_type`.
    pub category: FieldCategory,
    /// Native type as stored.
    pub db_type: String,
    /// Character, binary or integer length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Numeric precision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Numeric scale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Default expression, unquoted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Whether NULL is accepted.
    pub allow_null: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Whether the column is the primary key.
    pub is_primary_key: bool,
    /// Whether the column carries a foreign key.
    pub is_foreign_key: bool,
    /// Referenced table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_table: Option<String>,
    /// Referenced column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_field: Option<String>,
    /// Field label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Allowed values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub picklist: Vec<String>,
    /// Validation rules; plain text when not stored as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Value>,
}

impl FieldDescription {
    fn new(column: ColumnSchema, label: Option<LabelRecord>) -> Self {
        let label = label.unwrap_or_default();
        let picklist = label
            .picklist
            .map(|text| Picklist::Text(text).values())
            .unwrap_or_default();
        // Rules stored before they were JSON encoded come back as plain strings.
        let validation = label.validation.map(|text| {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        });

        Self {
            category: FieldCategory::from_db_type(&column.db_type),
            name: column.name,
            db_type: column.db_type,
            size: column.size,
            precision: column.precision,
            scale: column.scale,
            default: column.default,
            allow_null: column.allow_null,
            auto_increment: column.auto_increment,
            is_primary_key: column.is_primary_key,
            is_foreign_key: column.is_foreign_key,
            ref_table: column.ref_table,
            ref_field: column.ref_field,
            label: label.label,
            picklist,
            validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ColumnDefinition;
    use serde_json::json;

    fn schema() -> TableSchema {
        let mut schema = TableSchema::new("widgets");
        for (name, def) in [
            ("id", "int NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            ("active", "tinyint(1) NOT NULL DEFAULT 1"),
            ("status", "varchar(16) NULL"),
        ] {
            schema
                .columns
                .push(ColumnSchema::from_definition(name, &ColumnDefinition::parse(def)));
        }
        schema
    }

    #[test]
    fn test_merge_labels() {
        let table = LabelRecord {
            table: "widgets".into(),
            label: Some("Widget".into()),
            plural: Some("Widgets".into()),
            ..Default::default()
        };
        let status = LabelRecord {
            table: "widgets".into(),
            field: "status".into(),
            label: Some("Status".into()),
            picklist: Some("new\nshipped\n".into()),
            validation: Some(r#"{"max":16}"#.into()),
            ..Default::default()
        };

        let description = TableDescription::new(schema(), Some(table), vec![None, None, Some(status)]);
        assert_eq!(description.label.as_deref(), Some("Widget"));
        assert_eq!(description.fields.len(), 3);

        let status = description.field("STATUS").unwrap();
        assert_eq!(status.category, FieldCategory::String);
        assert_eq!(status.picklist, vec!["new", "shipped"]);
        assert_eq!(status.validation, Some(json!({"max": 16})));

        let active = description.field("active").unwrap();
        assert_eq!(active.category, FieldCategory::Boolean);
        assert!(!active.allow_null);
    }

    #[test]
    fn test_missing_labels() {
        let description = TableDescription::new(schema(), None, Vec::new());
        assert!(description.label.is_none());
        assert!(description.fields.iter().all(|f| f.label.is_none()));
        assert!(description.field("id").unwrap().is_primary_key);
    }

    #[test]
    fn test_plain_text_validation() {
        let record = LabelRecord {
            validation: Some("required".into()),
            ..Default::default()
        };
        let description = TableDescription::new(schema(), None, vec![Some(record)]);
        assert_eq!(description.fields[0].validation, Some(json!("required")));
    }
}
