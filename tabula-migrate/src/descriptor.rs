//! Database-agnostic table and field descriptors.
//!
//! Descriptors usually arrive as decoded JSON documents:
//!
//! ```rust
//! use tabula_migrate::descriptor::TableDescriptor;
//!
//! let table: TableDescriptor = serde_json::from_str(r#"{
//!     "name": "widgets",
//!     "label": "Widget",
//!     "field": [
//!         { "name": "id", "type": "id" },
//!         { "name": "name", "type": "string", "length": 128, "allow_null": false }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(table.fields.len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A dialect-neutral description of one column's intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDescriptor {
    /// Column name, unique within the table (case-insensitive).
    pub name: String,
    /// Abstract type name (`id`, `string`, `reference`, ...).
    #[serde(rename = "type")]
    pub field_type: String,
    /// Raw column definition; when present it is used verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Length of character and binary types.
    #[serde(alias = "size", skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Numeric precision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Numeric scale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Nullability; `None` means the type decides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_null: Option<bool>,
    /// Declares the column as the primary key.
    pub is_primary_key: bool,
    /// Declares a foreign key on the column.
    pub is_foreign_key: bool,
    /// Referenced table for foreign keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_table: Option<String>,
    /// Referenced column for foreign keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_fields: Option<String>,
    /// `ON DELETE` action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_on_delete: Option<String>,
    /// `ON UPDATE` action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_on_update: Option<String>,
    /// Requests a unique index.
    pub is_unique: bool,
    /// Requests a plain index.
    pub is_index: bool,
    /// Selects fixed length character types.
    pub fixed_length: bool,
    /// Selects national (multibyte) character types.
    pub supports_multibyte: bool,
    /// Allowed values.
    #[serde(alias = "picklist", skip_serializing_if = "Option::is_none")]
    pub values: Option<Picklist>,
    /// Human readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Opaque validation rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Value>,
}

impl FieldDescriptor {
    /// Create a descriptor with a name and abstract type.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            ..Default::default()
        }
    }

    /// Create a descriptor backed by a raw column definition.
    pub fn raw(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: Some(sql.into()),
            ..Default::default()
        }
    }

    /// Set the length.
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Set precision and scale.
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Set the scale only.
    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set the nullability explicitly.
    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = Some(allow);
        self
    }

    /// Shorthand for `allow_null(false)`.
    pub fn not_null(self) -> Self {
        self.allow_null(false)
    }

    /// Set the default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Add a foreign key reference.
    pub fn references(mut self, table: impl Into<String>, field: impl Into<String>) -> Self {
        self.is_foreign_key = true;
        self.ref_table = Some(table.into());
        self.ref_fields = Some(field.into());
        self
    }

    /// Set the referential actions.
    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.ref_on_delete = Some(action.into());
        self
    }

    /// Set the `ON UPDATE` action.
    pub fn on_update(mut self, action: impl Into<String>) -> Self {
        self.ref_on_update = Some(action.into());
        self
    }

    /// Request a unique index.
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// Request a plain index.
    pub fn indexed(mut self) -> Self {
        self.is_index = true;
        self
    }

    /// Select fixed length character storage.
    pub fn fixed(mut self) -> Self {
        self.fixed_length = true;
        self
    }

    /// Select national character storage.
    pub fn multibyte(mut self) -> Self {
        self.supports_multibyte = true;
        self
    }

    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the picklist.
    pub fn picklist<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(Picklist::List(values.into_iter().map(Into::into).collect()));
        self
    }

    /// Set the validation rules.
    pub fn validation(mut self, rules: Value) -> Self {
        self.validation = Some(rules);
        self
    }

    /// Whether the descriptor relies on a raw definition only.
    pub fn is_raw(&self) -> bool {
        self.field_type.trim().is_empty() && self.sql.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Whether any label metadata is attached.
    pub fn has_label_metadata(&self) -> bool {
        self.label.as_deref().is_some_and(|l| !l.is_empty())
            || self.values.as_ref().is_some_and(|v| !v.is_empty())
            || self.validation.as_ref().is_some_and(|v| !is_empty_value(v))
    }
}

/// Allowed values for a field, either a list or newline-delimited text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Picklist {
    /// A list of values.
    List(Vec<String>),
    /// Newline-delimited values.
    Text(String),
}

impl Picklist {
    /// Whether the picklist holds no values.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(values) => values.iter().all(|v| v.is_empty()),
            Self::Text(text) => text.trim().is_empty(),
        }
    }

    /// Newline-delimited storage form.
    pub fn to_text(&self) -> String {
        match self {
            Self::List(values) => values.join("\n"),
            Self::Text(text) => text.clone(),
        }
    }

    /// The individual values.
    pub fn values(&self) -> Vec<String> {
        match self {
            Self::List(values) => values.clone(),
            Self::Text(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

/// A dialect-neutral description of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,
    /// Human readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Plural label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    /// Field used to name records in user interfaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_field: Option<String>,
    /// Ordered fields.
    #[serde(alias = "field")]
    pub fields: Vec<FieldDescriptor>,
    /// Requested new name; renames are rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
}

impl TableDescriptor {
    /// Create an empty descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the label and plural.
    pub fn label(mut self, label: impl Into<String>, plural: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self.plural = Some(plural.into());
        self
    }

    /// Whether table-level label metadata is present.
    pub fn has_label_metadata(&self) -> bool {
        [&self.label, &self.plural, &self.name_field]
            .into_iter()
            .any(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

/// One or many table descriptors as sent by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableInput {
    /// A list of tables.
    Many(Vec<TableDescriptor>),
    /// A `{ "table": [...] }` envelope.
    Envelope {
        /// Wrapped tables.
        table: Vec<TableDescriptor>,
    },
    /// A single table.
    One(TableDescriptor),
}

impl TableInput {
    /// Normalise into an ordered list.
    pub fn into_tables(self) -> Vec<TableDescriptor> {
        match self {
            Self::Many(tables) | Self::Envelope { table: tables } => tables,
            Self::One(table) => vec![table],
        }
    }
}

impl From<TableDescriptor> for TableInput {
    fn from(table: TableDescriptor) -> Self {
        Self::One(table)
    }
}

impl From<Vec<TableDescriptor>> for TableInput {
    fn from(tables: Vec<TableDescriptor>) -> Self {
        Self::Many(tables)
    }
}

pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
