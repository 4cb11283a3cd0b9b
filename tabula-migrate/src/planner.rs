//! Column planning: diffing field descriptors against an existing table.
//!
//! Planning is pure. Every descriptor is validated before anything is
//! derived, so a rejected table never yields a partial plan.

use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::descriptor::FieldDescriptor;
use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::introspect::{ColumnSchema, TableSchema};
use crate::plan::{ColumnPlan, ForeignKeyConstraint, IndexConstraint, LabelRecord};
use crate::translate::TypeTranslator;
use crate::types::{AbstractType, FieldCategory};

/// Check a table or field name against the dialect's identifier rules.
pub fn check_identifier(name: &str, dialect: Dialect, kind: &str) -> MigrateResult<()> {
    if name.trim().is_empty() {
        return Err(MigrationError::bad_request(format!(
            "Invalid schema detected - {} name missing",
            kind
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return Err(MigrationError::bad_request(format!(
            "Invalid {} name '{}' - only letters, digits, '_' and '$' are allowed",
            kind, name
        )));
    }
    let max = dialect.limits().identifier_max;
    if name.len() > max {
        return Err(MigrationError::bad_request(format!(
            "Invalid {} name '{}' - longer than the {} limit of {} characters",
            kind, name, dialect, max
        )));
    }
    Ok(())
}

/// A field that passed validation.
struct CheckedField<'a> {
    field: &'a FieldDescriptor,
    ty: Option<AbstractType>,
}

impl CheckedField<'_> {
    fn is_raw(&self) -> bool {
        self.ty.is_none()
    }

    fn is_primary_key(&self) -> bool {
        self.field.is_primary_key || self.ty == Some(AbstractType::Id)
    }
}

/// Produces [`ColumnPlan`]s for create and update requests.
#[derive(Debug, Clone)]
pub struct FieldPlanner {
    translator: TypeTranslator,
    user_table: String,
    user_key: String,
}

impl FieldPlanner {
    /// Create a planner from engine settings.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            translator: TypeTranslator::new(config.dialect)
                .with_default_string_length(config.default_string_length),
            user_table: config.system_user_table.clone(),
            user_key: config.system_user_key.clone(),
        }
    }

    /// The translator used for column definitions.
    pub fn translator(&self) -> &TypeTranslator {
        &self.translator
    }

    /// Plan the changes bringing `existing` (or nothing) in line with `fields`.
    pub fn plan(
        &self,
        table: &str,
        fields: &[FieldDescriptor],
        existing: Option<&TableSchema>,
        allow_update: bool,
        allow_delete: bool,
    ) -> MigrateResult<ColumnPlan> {
        let checked = self.validate(table, fields, existing, allow_update)?;
        let mut plan = ColumnPlan::default();

        for item in &checked {
            let field = item.field;
            let current = existing.and_then(|t| t.column(&field.name));

            let skip_column = current.is_some_and(|c| c.is_primary_key) && item.is_primary_key();
            if !skip_column {
                let definition = self.translator.translate(field)?;
                match current {
                    Some(column) => {
                        if let Some(ty) = &item.ty {
                            let stored = FieldCategory::from_db_type(&column.db_type);
                            if ty.category() != stored {
                                tracing::debug!(
                                    table,
                                    column = %column.name,
                                    from = ?stored,
                                    to = ?ty.category(),
                                    "column changes category"
                                );
                            }
                        }
                        plan.alter_columns.insert(column.name.clone(), definition);
                    }
                    None => {
                        plan.columns.insert(field.name.clone(), definition);
                    }
                }
            }

            let Some(ty) = &item.ty else {
                continue;
            };

            if !skip_column {
                self.derive_constraints(table, field, ty, current, &mut plan);
            }

            if field.has_label_metadata() {
                plan.labels.push(LabelRecord::for_field(table, field));
            }
        }

        if allow_delete {
            if let Some(schema) = existing {
                let incoming: HashSet<String> = fields
                    .iter()
                    .map(|f| f.name.to_ascii_lowercase())
                    .collect();
                plan.drop_columns = schema
                    .columns
                    .iter()
                    .filter(|c| !incoming.contains(&c.name.to_ascii_lowercase()))
                    .map(|c| c.name.clone())
                    .collect();
            }
        }

        tracing::debug!(
            table,
            add = plan.columns.len(),
            alter = plan.alter_columns.len(),
            drop = plan.drop_columns.len(),
            references = plan.references.len(),
            indexes = plan.indexes.len(),
            labels = plan.labels.len(),
            "planned columns"
        );

        Ok(plan)
    }

    fn validate<'a>(
        &self,
        table: &str,
        fields: &'a [FieldDescriptor],
        existing: Option<&TableSchema>,
        allow_update: bool,
    ) -> MigrateResult<Vec<CheckedField<'a>>> {
        let dialect = self.translator.dialect();
        let mut seen = HashSet::new();
        let mut primary_keys = Vec::new();
        let mut checked = Vec::with_capacity(fields.len());

        for field in fields {
            check_identifier(&field.name, dialect, "field")?;

            if !seen.insert(field.name.to_ascii_lowercase()) {
                return Err(MigrationError::bad_request(format!(
                    "Duplicate field name '{}' in table '{}'",
                    field.name, table
                )));
            }

            let ty = AbstractType::parse(&field.field_type);
            if ty.is_none() && !field.is_raw() {
                return Err(MigrationError::bad_request(format!(
                    "Invalid schema detected - no type or sql for field '{}'",
                    field.name
                )));
            }

            let item = CheckedField { field, ty };

            if !item.is_raw() {
                let is_reference =
                    item.ty == Some(AbstractType::Reference) || field.is_foreign_key;
                if is_reference && field.ref_table.as_deref().is_none_or(|t| t.trim().is_empty()) {
                    return Err(MigrationError::bad_request(format!(
                        "Invalid schema detected - reference field '{}' has no ref_table",
                        field.name
                    )));
                }
            }

            if item.is_primary_key() {
                primary_keys.push(field.name.clone());
            }

            if !allow_update {
                if let Some(column) = existing.and_then(|t| t.column(&field.name)) {
                    return Err(MigrationError::bad_request(format!(
                        "Field '{}' already exists in table '{}'",
                        column.name, table
                    )));
                }
            }

            checked.push(item);
        }

        if primary_keys.len() > 1 {
            return Err(MigrationError::bad_request(format!(
                "Multiple primary keys defined for table '{}': {}",
                table,
                primary_keys.join(", ")
            )));
        }

        if let (Some(incoming), Some(current)) =
            (primary_keys.first(), existing.and_then(|t| t.primary_key()))
        {
            if !current.name.eq_ignore_ascii_case(incoming) {
                return Err(MigrationError::bad_request(format!(
                    "Table '{}' already has primary key '{}'; cannot add '{}'",
                    table, current.name, incoming
                )));
            }
        }

        Ok(checked)
    }

    fn derive_constraints(
        &self,
        table: &str,
        field: &FieldDescriptor,
        ty: &AbstractType,
        current: Option<&ColumnSchema>,
        plan: &mut ColumnPlan,
    ) {
        let target = if *ty == AbstractType::Reference || field.is_foreign_key {
            field.ref_table.as_deref().map(|t| {
                let key = field
                    .ref_fields
                    .as_deref()
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or("id");
                (t.to_string(), key.to_string())
            })
        } else if ty.is_user_id() {
            Some((self.user_table.clone(), self.user_key.clone()))
        } else {
            None
        };

        if let Some((ref_table, ref_fields)) = target {
            let unchanged = current.is_some_and(|c| c.references(&ref_table, &ref_fields));
            if !unchanged {
                let mut fk = ForeignKeyConstraint::new(table, &field.name, ref_table, ref_fields);
                fk.on_delete = field.ref_on_delete.clone();
                fk.on_update = field.ref_on_update.clone();
                fk.drop = current.is_some_and(|c| c.is_foreign_key);
                plan.references.push(fk);
            }
        }

        if field.is_unique || field.is_index {
            let mut index = IndexConstraint::new(table, &field.name, field.is_unique);
            index.drop = current.is_some();
            plan.indexes.push(index);
        }
    }
}
