//! Single-table operations.
//!
//! DDL failures are fatal and surface as [`MigrationError`]s. Foreign key,
//! index and label failures are logged and never fail the call.

use serde::{Deserialize, Serialize};

use crate::connection::SchemaConnection;
use crate::describe::TableDescription;
use crate::descriptor::TableDescriptor;
use crate::engine::SchemaEngine;
use crate::error::{MigrateResult, MigrationError};
use crate::plan::{ColumnPlan, LabelRecord};
use crate::planner::check_identifier;

/// Name of a table an operation was applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Table name.
    pub name: String,
}

impl TableRef {
    /// Create a reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Result of a create or update.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    /// Columns, constraints and labels were all applied.
    Applied(TableRef),
    /// Columns were applied; constraints and labels are left to the caller.
    Deferred(ColumnPlan),
}

impl TableOutcome {
    /// The deferred plan, if any.
    pub fn into_plan(self) -> Option<ColumnPlan> {
        match self {
            Self::Deferred(plan) => Some(plan),
            Self::Applied(_) => None,
        }
    }

    /// The applied table, if any.
    pub fn table(&self) -> Option<&TableRef> {
        match self {
            Self::Applied(table) => Some(table),
            Self::Deferred(_) => None,
        }
    }
}

fn reject_rename(table: &TableDescriptor) -> MigrateResult<()> {
    match table.new_name.as_deref() {
        Some(new_name) if !new_name.trim().is_empty() => Err(MigrationError::bad_request(format!(
            "Table rename is not supported ('{}' to '{}')",
            table.name, new_name
        ))),
        _ => Ok(()),
    }
}

fn table_label(table: &TableDescriptor, stored_name: &str) -> LabelRecord {
    let mut record = LabelRecord::for_table(table);
    record.table = stored_name.to_string();
    record
}

impl<C: SchemaConnection> SchemaEngine<C> {
    /// Create a table.
    ///
    /// With `check_exist`, an existing table of the same name (ignoring case)
    /// is a bad request. With `return_plan`, constraints and labels are not
    /// applied but returned in [`TableOutcome::Deferred`].
    pub async fn create_table(
        &self,
        table: &TableDescriptor,
        check_exist: bool,
        return_plan: bool,
    ) -> MigrateResult<TableOutcome> {
        let dialect = self.config.dialect;
        check_identifier(&table.name, dialect, "table")?;
        reject_rename(table)?;

        if check_exist && self.cache.exists(&self.conn, &table.name).await? {
            return Err(MigrationError::bad_request(format!(
                "Table '{}' already exists",
                table.name
            )));
        }
        if table.fields.is_empty() {
            return Err(MigrationError::bad_request(format!(
                "Table '{}' has no fields",
                table.name
            )));
        }

        let mut plan = self
            .planner
            .plan(&table.name, &table.fields, None, false, false)?;
        if plan.columns.is_empty() {
            return Err(MigrationError::bad_request(format!(
                "Table '{}' has no columns to create",
                table.name
            )));
        }
        if table.has_label_metadata() {
            plan.labels.insert(0, table_label(table, &table.name));
        }

        self.conn.create_table(&table.name, &plan.columns).await?;
        self.cache.invalidate();
        tracing::info!(
            table = %table.name,
            columns = plan.columns.len(),
            "table created"
        );

        self.finish(&table.name, plan, return_plan).await
    }

    /// Add, alter and optionally drop columns of an existing table.
    ///
    /// Columns are added, then altered, then dropped. Columns missing from
    /// the descriptor are dropped only with `allow_delete`.
    pub async fn update_table(
        &self,
        table: &TableDescriptor,
        return_plan: bool,
        allow_delete: bool,
    ) -> MigrateResult<TableOutcome> {
        check_identifier(&table.name, self.config.dialect, "table")?;
        reject_rename(table)?;

        let missing =
            || MigrationError::bad_request(format!("Table '{}' does not exist", table.name));
        let name = self
            .cache
            .resolve(&self.conn, &table.name)
            .await?
            .ok_or_else(missing)?;
        let schema = self.conn.describe_table(&name).await?.ok_or_else(missing)?;

        let mut plan = self
            .planner
            .plan(&name, &table.fields, Some(&schema), true, allow_delete)?;
        if table.has_label_metadata() {
            plan.labels.insert(0, table_label(table, &name));
        }

        for (column, definition) in &plan.columns {
            self.conn.add_column(&name, column, definition).await?;
        }
        for (column, definition) in &plan.alter_columns {
            self.conn.alter_column(&name, column, definition).await?;
        }
        for column in &plan.drop_columns {
            self.conn.drop_column(&name, column).await?;
            self.labels().remove(&name, Some(column)).await;
        }

        if plan.has_column_changes() {
            self.cache.invalidate();
        }
        tracing::info!(
            table = %name,
            added = plan.columns.len(),
            altered = plan.alter_columns.len(),
            dropped = plan.drop_columns.len(),
            "table updated"
        );

        self.finish(&name, plan, return_plan).await
    }

    /// Drop a table and its label rows.
    pub async fn drop_table(&self, table: &str) -> MigrateResult<()> {
        let name = self.require_table(table).await?;

        self.conn.drop_table(&name).await?;
        self.cache.invalidate();
        tracing::info!(table = %name, "table dropped");

        self.labels().remove(&name, None).await;
        Ok(())
    }

    /// Drop one column and its label row.
    pub async fn drop_field(&self, table: &str, field: &str) -> MigrateResult<()> {
        let name = self.require_table(table).await?;
        let column = self
            .conn
            .describe_table(&name)
            .await?
            .and_then(|schema| schema.column(field).map(|c| c.name.clone()))
            .ok_or_else(|| {
                MigrationError::not_found(format!(
                    "Field '{}' does not exist in table '{}'",
                    field, name
                ))
            })?;

        self.conn.drop_column(&name, &column).await?;
        self.cache.invalidate();
        tracing::info!(table = %name, field = %column, "field dropped");

        self.labels().remove(&name, Some(&column)).await;
        Ok(())
    }

    /// Describe a table: its columns with categories and labels.
    pub async fn describe_table(&self, table: &str) -> MigrateResult<TableDescription> {
        let name = self.require_table(table).await?;
        let schema = self
            .conn
            .describe_table(&name)
            .await?
            .ok_or_else(|| not_found(table))?;

        let store = self.labels();
        let table_label = store.find(&name, "").await;
        let mut field_labels = Vec::with_capacity(schema.columns.len());
        for column in &schema.columns {
            field_labels.push(store.find(&name, &column.name).await);
        }

        Ok(TableDescription::new(schema, table_label, field_labels))
    }

    async fn require_table(&self, table: &str) -> MigrateResult<String> {
        self.cache
            .resolve(&self.conn, table)
            .await?
            .ok_or_else(|| not_found(table))
    }

    async fn finish(
        &self,
        table: &str,
        plan: ColumnPlan,
        return_plan: bool,
    ) -> MigrateResult<TableOutcome> {
        if return_plan {
            return Ok(TableOutcome::Deferred(plan));
        }
        self.apply_deferred(&plan).await;
        Ok(TableOutcome::Applied(TableRef::new(table)))
    }
}

fn not_found(table: &str) -> MigrationError {
    MigrationError::not_found(format!("Table '{}' does not exist", table))
}
