//! The database collaborator the engine drives.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::dialect::Dialect;
use crate::error::MigrateResult;
use crate::introspect::TableSchema;
use crate::plan::{ForeignKeyConstraint, IndexConstraint, LabelRecord};

/// Schema introspection, DDL execution and metadata access on one connection.
///
/// Implementations execute one statement per call; the engine never issues
/// statements concurrently on the same connection. Driver failures are
/// reported as [`MigrationError::Internal`](crate::MigrationError::Internal)
/// with the driver's message and code.
#[async_trait]
pub trait SchemaConnection: Send + Sync {
    /// Dialect spoken by the connection.
    fn dialect(&self) -> Dialect;

    /// Whether this is the system connection that owns the user table.
    fn is_system_connection(&self) -> bool {
        true
    }

    /// Names of all tables, as stored.
    async fn table_names(&self) -> MigrateResult<Vec<String>>;

    /// Introspect one table; `None` when it does not exist.
    async fn describe_table(&self, table: &str) -> MigrateResult<Option<TableSchema>>;

    /// Create a table from column definitions.
    async fn create_table(&self, table: &str, columns: &IndexMap<String, String>) -> MigrateResult<()>;

    /// Drop a table.
    async fn drop_table(&self, table: &str) -> MigrateResult<()>;

    /// Add a column.
    async fn add_column(&self, table: &str, column: &str, definition: &str) -> MigrateResult<()>;

    /// Change a column's definition.
    async fn alter_column(&self, table: &str, column: &str, definition: &str) -> MigrateResult<()>;

    /// Drop a column.
    async fn drop_column(&self, table: &str, column: &str) -> MigrateResult<()>;

    /// Add a foreign key.
    async fn add_foreign_key(&self, fk: &ForeignKeyConstraint) -> MigrateResult<()>;

    /// Drop a foreign key by name.
    async fn drop_foreign_key(&self, table: &str, name: &str) -> MigrateResult<()>;

    /// Create an index.
    async fn create_index(&self, index: &IndexConstraint) -> MigrateResult<()>;

    /// Drop an index by name.
    async fn drop_index(&self, table: &str, name: &str) -> MigrateResult<()>;

    /// Point query of a label row.
    async fn find_label(
        &self,
        metadata_table: &str,
        table: &str,
        field: &str,
    ) -> MigrateResult<Option<LabelRecord>>;

    /// Insert label rows.
    async fn insert_labels(&self, metadata_table: &str, records: &[LabelRecord]) -> MigrateResult<()>;

    /// Update label rows by key.
    async fn update_labels(&self, metadata_table: &str, records: &[LabelRecord]) -> MigrateResult<()>;

    /// Delete the label rows of a table, or of one field. Returns the row count.
    async fn delete_labels(
        &self,
        metadata_table: &str,
        table: &str,
        field: Option<&str>,
    ) -> MigrateResult<u64>;

    /// Start a transaction. Returns `false` when transactions are unsupported.
    async fn begin(&self) -> MigrateResult<bool>;

    /// Commit the open transaction.
    async fn commit(&self) -> MigrateResult<()>;

    /// Roll back the open transaction.
    async fn rollback(&self) -> MigrateResult<()>;
}
