//! Multi-table migrations.
//!
//! Tables are processed in order. With more than one table, foreign keys,
//! indexes and labels of every table are collected and applied once after
//! the last table, so references between tables of the same batch resolve
//! regardless of order.
//!
//! A failing table either aborts the call or is recorded in place:
//!
//! | mode                   | on failure                                   |
//! |------------------------|----------------------------------------------|
//! | single table           | error returned                               |
//! | batch, `rollback`      | tables created by the call dropped, error returned |
//! | batch, continue        | `{ "error": ... }` recorded, next table runs |
//!
//! DDL commits per statement on most databases. Rollback only undoes table
//! creation; columns added to pre-existing tables stay.

use serde::{Deserialize, Serialize};

use crate::connection::SchemaConnection;
use crate::descriptor::{TableDescriptor, TableInput};
use crate::engine::{DeferredOutcome, SchemaEngine};
use crate::error::{ErrorBody, MigrateResult, MigrationError};
use crate::plan::ColumnPlan;
use crate::table::{TableOutcome, TableRef};

/// Options of a batch migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Update tables that already exist instead of rejecting them.
    pub allow_merge: bool,
    /// Drop columns missing from the descriptors of existing tables.
    pub allow_delete: bool,
    /// Abort on the first failure and drop the tables created so far.
    pub rollback: bool,
}

impl BatchOptions {
    /// Default options: no merge, no delete, continue on error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow updating existing tables.
    pub fn allow_merge(mut self, allow: bool) -> Self {
        self.allow_merge = allow;
        self
    }

    /// Allow dropping columns.
    pub fn allow_delete(mut self, allow: bool) -> Self {
        self.allow_delete = allow;
        self
    }

    /// Abort and compensate on failure.
    pub fn rollback(mut self, rollback: bool) -> Self {
        self.rollback = rollback;
        self
    }
}

/// Per-table result, positionally aligned with the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    /// The table was created or updated.
    Applied(TableRef),
    /// The table failed; later tables still ran.
    Failed {
        /// What went wrong.
        error: ErrorBody,
    },
}

impl BatchEntry {
    /// Whether the table was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Name of the applied table.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Applied(table) => Some(&table.name),
            Self::Failed { .. } => None,
        }
    }

    /// Error of a failed table.
    pub fn error(&self) -> Option<&ErrorBody> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Applied(_) => None,
        }
    }
}

/// Full result of a batch migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// One entry per input table.
    pub results: Vec<BatchEntry>,
    /// Constraint and label work applied after the tables.
    #[serde(flatten)]
    pub deferred: DeferredOutcome,
}

impl BatchReport {
    /// Whether any table failed.
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.is_applied())
    }
}

impl<C: SchemaConnection> SchemaEngine<C> {
    /// Create or update each table, returning one entry per table.
    pub async fn update_tables(
        &self,
        input: impl Into<TableInput>,
        options: BatchOptions,
    ) -> MigrateResult<Vec<BatchEntry>> {
        Ok(self.migrate_batch(input, options).await?.results)
    }

    /// Create or update each table, returning the deferred work as well.
    pub async fn migrate_batch(
        &self,
        input: impl Into<TableInput>,
        options: BatchOptions,
    ) -> MigrateResult<BatchReport> {
        let tables = input.into().into_tables();
        let batch = tables.len() > 1;

        if let Some(position) = tables.iter().position(|t| t.name.trim().is_empty()) {
            return Err(MigrationError::bad_request(format!(
                "Table name is required (table {} of {})",
                position + 1,
                tables.len()
            )));
        }

        self.cache.refresh(&self.conn).await?;

        let mut report = BatchReport::default();
        let mut deferred = ColumnPlan::default();
        let mut created: Vec<String> = Vec::new();

        for table in &tables {
            match self.migrate_one(table, batch, options, &mut created).await {
                Ok(TableOutcome::Deferred(plan)) => {
                    deferred.absorb_deferred(plan);
                    report.results.push(BatchEntry::Applied(TableRef::new(&table.name)));
                }
                Ok(TableOutcome::Applied(applied)) => {
                    report.results.push(BatchEntry::Applied(applied));
                }
                Err(e) if options.rollback || !batch => {
                    self.cache.invalidate();
                    if options.rollback {
                        self.compensate(&created).await;
                    }
                    tracing::warn!(table = %table.name, error = %e, "migration aborted");
                    return Err(e);
                }
                Err(e) => {
                    if e.is_client_error() {
                        tracing::warn!(table = %table.name, error = %e, "table rejected, continuing");
                    } else {
                        tracing::error!(table = %table.name, error = %e, "table failed, continuing");
                    }
                    report.results.push(BatchEntry::Failed { error: e.to_body() });
                }
            }
        }

        if batch {
            report.deferred = self.apply_deferred(&deferred).await;
        }
        self.cache.refresh(&self.conn).await?;

        tracing::info!(
            tables = tables.len(),
            failed = report.results.iter().filter(|r| !r.is_applied()).count(),
            "batch migration finished"
        );
        Ok(report)
    }

    async fn migrate_one(
        &self,
        table: &TableDescriptor,
        batch: bool,
        options: BatchOptions,
        created: &mut Vec<String>,
    ) -> MigrateResult<TableOutcome> {
        if self.cache.exists(&self.conn, &table.name).await? {
            if !options.allow_merge {
                return Err(MigrationError::bad_request(format!(
                    "Table '{}' already exists",
                    table.name
                )));
            }
            return self.update_table(table, batch, options.allow_delete).await;
        }

        let outcome = self.create_table(table, false, batch).await?;
        if batch && options.rollback {
            created.push(table.name.clone());
        }
        Ok(outcome)
    }

    /// Drop tables created by a failed call, newest first.
    async fn compensate(&self, created: &[String]) {
        for table in created.iter().rev() {
            match self.conn.drop_table(table).await {
                Ok(()) => tracing::info!(table = %table, "rolled back table creation"),
                Err(e) => tracing::warn!(table = %table, error = %e, "rollback drop failed"),
            }
        }
        if !created.is_empty() {
            self.cache.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldDescriptor;
    use crate::dialect::Dialect;
    use crate::memory::MemoryConnection;
    use serde_json::json;

    async fn engine() -> SchemaEngine<MemoryConnection> {
        let engine = SchemaEngine::new(MemoryConnection::new(Dialect::MySql));
        engine.install().await.unwrap();
        engine
    }

    fn table(name: &str) -> TableDescriptor {
        TableDescriptor::new(name)
            .field(FieldDescriptor::new("id", "id"))
            .field(FieldDescriptor::new("title", "string").length(64))
    }

    fn broken(name: &str) -> TableDescriptor {
        TableDescriptor::new(name)
            .field(FieldDescriptor::new("a", "integer").primary_key())
            .field(FieldDescriptor::new("b", "integer").primary_key())
    }

    #[tokio::test]
    async fn test_single_table() {
        let engine = engine().await;
        let results = engine
            .update_tables(table("notes"), BatchOptions::new())
            .await
            .unwrap();
        assert_eq!(results, vec![BatchEntry::Applied(TableRef::new("notes"))]);
    }

    #[tokio::test]
    async fn test_single_table_failure_propagates() {
        let engine = engine().await;
        let err = engine
            .update_tables(broken("pairs"), BatchOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[tokio::test]
    async fn test_continue_records_failures_in_place() {
        let engine = engine().await;
        let results = engine
            .update_tables(
                vec![table("first"), broken("second"), table("third")],
                BatchOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name(), Some("first"));
        assert_eq!(results[1].error().map(|e| e.code), Some(400));
        assert_eq!(results[2].name(), Some("third"));
        assert!(engine.table_exists("first").await.unwrap());
        assert!(engine.table_exists("third").await.unwrap());
        assert!(!engine.table_exists("second").await.unwrap());

        let value = serde_json::to_value(&results).unwrap();
        assert_eq!(value[0], json!({"name": "first"}));
        assert!(value[1]["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_existing_table_requires_merge() {
        let engine = engine().await;
        engine.update_tables(table("notes"), BatchOptions::new()).await.unwrap();

        let err = engine
            .update_tables(table("NOTES"), BatchOptions::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let merged = TableDescriptor::new("notes").field(FieldDescriptor::new("body", "text"));
        let results = engine
            .update_tables(merged, BatchOptions::new().allow_merge(true))
            .await
            .unwrap();
        assert_eq!(results[0].name(), Some("notes"));
        let description = engine.describe_table("notes").await.unwrap();
        assert_eq!(description.fields.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_name_is_fatal_in_continue_mode() {
        let engine = engine().await;
        let err = engine
            .update_tables(
                vec![table("first"), TableDescriptor::default()],
                BatchOptions::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), 400);
        assert!(err.to_string().contains("table 2 of 2"));
    }

    #[tokio::test]
    async fn test_missing_name_rejected_before_any_ddl() {
        let engine = engine().await;
        engine.connection().clear_statements();

        let first = table("first").field(
            FieldDescriptor::new("sku", "string")
                .length(32)
                .unique()
                .label("Stock Unit"),
        );
        let result = engine
            .update_tables(
                vec![first, TableDescriptor::default()],
                BatchOptions::new().allow_merge(true),
            )
            .await;

        assert!(result.is_err());
        assert!(!engine.table_exists("first").await.unwrap());
        assert!(engine.connection().statements().is_empty());
        assert!(engine.connection().index_names().is_empty());
        assert!(engine.connection().labels().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_drops_created_tables() {
        let engine = engine().await;
        engine.update_tables(table("existing"), BatchOptions::new()).await.unwrap();

        let err = engine
            .update_tables(
                vec![
                    table("alpha"),
                    TableDescriptor::new("existing").field(FieldDescriptor::new("extra", "integer")),
                    table("beta"),
                    broken("gamma"),
                ],
                BatchOptions::new().allow_merge(true).rollback(true),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), 400);

        let conn = engine.connection();
        assert!(!conn.has_table("alpha"));
        assert!(!conn.has_table("beta"));
        assert!(conn.has_table("existing"));
        let drops: Vec<String> = conn
            .statements()
            .into_iter()
            .filter(|s| s.starts_with("DROP TABLE"))
            .collect();
        assert_eq!(drops, vec!["DROP TABLE `beta`;", "DROP TABLE `alpha`;"]);

        // Alterations to tables that existed before the call remain.
        let existing = engine.describe_table("existing").await.unwrap();
        assert!(existing.field("extra").is_some());
    }

    #[tokio::test]
    async fn test_batch_defers_cross_references() {
        let engine = engine().await;
        let orders = TableDescriptor::new("orders")
            .field(FieldDescriptor::new("id", "id"))
            .field(FieldDescriptor::new("customer_id", "reference").references("customers", "id"))
            .field(FieldDescriptor::new("code", "string").length(16).unique().label("Code"));
        let customers = table("customers");

        let report = engine
            .migrate_batch(vec![orders, customers], BatchOptions::new())
            .await
            .unwrap();

        assert!(!report.has_failures());
        assert!(report.deferred.is_ok());
        assert_eq!(report.deferred.labels.inserted, 1);
        let conn = engine.connection();
        assert_eq!(conn.foreign_key_names(), vec!["fk_orders_customer_id"]);
        assert_eq!(conn.index_names(), vec!["undx_orders_code"]);
    }

    #[tokio::test]
    async fn test_envelope_input() {
        let engine = engine().await;
        let input: TableInput = serde_json::from_value(json!({
            "table": [
                { "name": "tags", "field": [{ "name": "id", "type": "id" }] },
                { "name": "colors", "field": [{ "name": "id", "type": "id" }] }
            ]
        }))
        .unwrap();

        let results = engine.update_tables(input, BatchOptions::new()).await.unwrap();
        assert!(results.iter().all(BatchEntry::is_applied));
        assert_eq!(engine.cache().stats().cached_count, 3);
    }
}
