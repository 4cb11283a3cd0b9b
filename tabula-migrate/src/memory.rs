//! In-memory [`SchemaConnection`] for tests and dry runs.
//!
//! Every statement is rendered with the dialect's [`DdlGenerator`] and
//! recorded, so callers can inspect exactly what a real database would have
//! received. Errors use MySQL server error numbers.

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::connection::SchemaConnection;
use crate::definition::ColumnDefinition;
use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::introspect::{ColumnSchema, TableSchema};
use crate::plan::{ForeignKeyConstraint, IndexConstraint, LabelRecord};
use crate::sql::{DdlGenerator, storage_type};

#[derive(Debug, Default)]
struct MemoryState {
    tables: IndexMap<String, TableSchema>,
    foreign_keys: IndexMap<String, ForeignKeyConstraint>,
    indexes: IndexMap<String, IndexConstraint>,
    labels: Vec<LabelRecord>,
    snapshot: Option<Vec<LabelRecord>>,
    statements: Vec<String>,
}

/// A database held in memory.
#[derive(Debug)]
pub struct MemoryConnection {
    generator: DdlGenerator,
    system: bool,
    transactions: bool,
    failures: Mutex<Vec<String>>,
    state: Mutex<MemoryState>,
}

impl MemoryConnection {
    /// Create an empty database for a dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            generator: DdlGenerator::new(dialect),
            system: true,
            transactions: true,
            failures: Mutex::new(Vec::new()),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Report no transaction support.
    pub fn without_transactions(mut self) -> Self {
        self.transactions = false;
        self
    }

    /// Act as a secondary connection that does not own the user table.
    pub fn non_system(mut self) -> Self {
        self.system = false;
        self
    }

    /// Fail every statement containing `pattern`.
    pub fn fail_on(&self, pattern: impl Into<String>) {
        self.failures.lock().push(pattern.into());
    }

    /// Remove injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Statements executed so far.
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().statements.clone()
    }

    /// Forget recorded statements.
    pub fn clear_statements(&self) {
        self.state.lock().statements.clear();
    }

    /// Committed label rows.
    pub fn labels(&self) -> Vec<LabelRecord> {
        self.state.lock().labels.clone()
    }

    /// Whether a table exists (case-insensitive).
    pub fn has_table(&self, table: &str) -> bool {
        self.state.lock().tables.contains_key(&key(table))
    }

    /// Names of the foreign keys currently defined.
    pub fn foreign_key_names(&self) -> Vec<String> {
        self.state
            .lock()
            .foreign_keys
            .values()
            .map(|fk| fk.name.clone())
            .collect()
    }

    /// Names of the indexes currently defined.
    pub fn index_names(&self) -> Vec<String> {
        self.state
            .lock()
            .indexes
            .values()
            .map(|i| i.name.clone())
            .collect()
    }

    fn execute(&self, state: &mut MemoryState, sql: String) -> MigrateResult<()> {
        let failures = self.failures.lock();
        if let Some(pattern) = failures.iter().find(|p| sql.contains(p.as_str())) {
            return Err(MigrationError::driver(
                format!("Statement rejected ({}): {}", pattern, sql),
                1105,
            ));
        }
        tracing::trace!(sql = %sql, "memory connection executed statement");
        state.statements.push(sql);
        Ok(())
    }

    fn require_metadata(&self, state: &MemoryState, metadata_table: &str) -> MigrateResult<()> {
        if state.tables.contains_key(&key(metadata_table)) {
            Ok(())
        } else {
            Err(no_such_table(metadata_table))
        }
    }
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn no_such_table(table: &str) -> MigrationError {
    MigrationError::driver(format!("Table '{}' doesn't exist", table), 1146)
}

fn table_mut<'a>(state: &'a mut MemoryState, table: &str) -> MigrateResult<&'a mut TableSchema> {
    state
        .tables
        .get_mut(&key(table))
        .ok_or_else(|| no_such_table(table))
}

/// The column a definition leaves behind, typed as the database stores it.
fn column_from(name: &str, definition: &str) -> ColumnSchema {
    let def = ColumnDefinition::parse(definition);
    ColumnSchema {
        db_type: storage_type(&def),
        ..ColumnSchema::from_definition(name, &def)
    }
}

fn multiple_primary_keys() -> MigrationError {
    MigrationError::driver("Multiple primary key defined", 1068)
}

#[async_trait]
impl SchemaConnection for MemoryConnection {
    fn dialect(&self) -> Dialect {
        self.generator.dialect()
    }

    fn is_system_connection(&self) -> bool {
        self.system
    }

    async fn table_names(&self) -> MigrateResult<Vec<String>> {
        Ok(self
            .state
            .lock()
            .tables
            .values()
            .map(|t| t.name.clone())
            .collect())
    }

    async fn describe_table(&self, table: &str) -> MigrateResult<Option<TableSchema>> {
        Ok(self.state.lock().tables.get(&key(table)).cloned())
    }

    async fn create_table(&self, table: &str, columns: &IndexMap<String, String>) -> MigrateResult<()> {
        let mut state = self.state.lock();
        if state.tables.contains_key(&key(table)) {
            return Err(MigrationError::driver(
                format!("Table '{}' already exists", table),
                1050,
            ));
        }

        let mut schema = TableSchema::new(table);
        for (name, definition) in columns {
            let column = column_from(name, definition);
            if column.is_primary_key && schema.primary_key().is_some() {
                return Err(multiple_primary_keys());
            }
            schema.columns.push(column);
        }

        self.execute(&mut state, self.generator.create_table(table, columns))?;
        state.tables.insert(key(table), schema);
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> MigrateResult<()> {
        let mut state = self.state.lock();
        if !state.tables.contains_key(&key(table)) {
            return Err(MigrationError::driver(
                format!("Unknown table '{}'", table),
                1051,
            ));
        }

        self.execute(&mut state, self.generator.drop_table(table))?;
        state.tables.shift_remove(&key(table));
        state.foreign_keys.retain(|_, fk| !fk.table.eq_ignore_ascii_case(table));
        state.indexes.retain(|_, i| !i.table.eq_ignore_ascii_case(table));
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &str, definition: &str) -> MigrateResult<()> {
        let mut state = self.state.lock();
        let new_column = column_from(column, definition);
        {
            let schema = table_mut(&mut state, table)?;
            if schema.column(column).is_some() {
                return Err(MigrationError::driver(
                    format!("Duplicate column name '{}'", column),
                    1060,
                ));
            }
            if new_column.is_primary_key && schema.primary_key().is_some() {
                return Err(multiple_primary_keys());
            }
        }

        self.execute(&mut state, self.generator.add_column(table, column, definition))?;
        table_mut(&mut state, table)?.columns.push(new_column);
        Ok(())
    }

    async fn alter_column(&self, table: &str, column: &str, definition: &str) -> MigrateResult<()> {
        let mut state = self.state.lock();
        let schema = table_mut(&mut state, table)?;
        let existing = schema.column(column).cloned().ok_or_else(|| {
            MigrationError::driver(format!("Unknown column '{}' in '{}'", column, table), 1054)
        })?;

        let mut updated = column_from(&existing.name, definition);
        if updated.is_primary_key
            && schema
                .primary_key()
                .is_some_and(|pk| !pk.name.eq_ignore_ascii_case(column))
        {
            return Err(multiple_primary_keys());
        }

        for sql in self.generator.alter_column(table, &existing, definition)? {
            self.execute(&mut state, sql)?;
        }

        updated.is_primary_key |= existing.is_primary_key;
        updated.is_foreign_key = existing.is_foreign_key;
        updated.ref_table = existing.ref_table;
        updated.ref_field = existing.ref_field;

        if let Some(slot) = table_mut(&mut state, table)?.column_mut(column) {
            *slot = updated;
        }
        Ok(())
    }

    async fn drop_column(&self, table: &str, column: &str) -> MigrateResult<()> {
        let mut state = self.state.lock();
        if table_mut(&mut state, table)?.column(column).is_none() {
            return Err(MigrationError::driver(
                format!("Can't DROP '{}'; check that column/key exists", column),
                1091,
            ));
        }

        self.execute(&mut state, self.generator.drop_column(table, column))?;
        table_mut(&mut state, table)?
            .columns
            .retain(|c| !c.name.eq_ignore_ascii_case(column));
        let owned = |t: &str, c: &str| t.eq_ignore_ascii_case(table) && c.eq_ignore_ascii_case(column);
        state.foreign_keys.retain(|_, fk| !owned(&fk.table, &fk.column));
        state.indexes.retain(|_, i| !owned(&i.table, &i.column));
        Ok(())
    }

    async fn add_foreign_key(&self, fk: &ForeignKeyConstraint) -> MigrateResult<()> {
        let mut state = self.state.lock();
        if state.foreign_keys.contains_key(&key(&fk.name)) {
            return Err(MigrationError::driver(
                format!("Duplicate foreign key constraint name '{}'", fk.name),
                1826,
            ));
        }
        let referenced = state
            .tables
            .get(&key(&fk.ref_table))
            .is_some_and(|t| t.column(&fk.ref_fields).is_some());
        if !referenced {
            return Err(MigrationError::driver(
                format!(
                    "Failed to open the referenced table '{}'",
                    fk.ref_table
                ),
                1824,
            ));
        }
        if table_mut(&mut state, &fk.table)?.column(&fk.column).is_none() {
            return Err(MigrationError::driver(
                format!("Key column '{}' doesn't exist in table", fk.column),
                1072,
            ));
        }

        self.execute(&mut state, self.generator.add_foreign_key(fk))?;
        if let Some(column) = table_mut(&mut state, &fk.table)?.column_mut(&fk.column) {
            column.is_foreign_key = true;
            column.ref_table = Some(fk.ref_table.clone());
            column.ref_field = Some(fk.ref_fields.clone());
        }
        state.foreign_keys.insert(key(&fk.name), fk.clone());
        Ok(())
    }

    async fn drop_foreign_key(&self, table: &str, name: &str) -> MigrateResult<()> {
        let mut state = self.state.lock();
        let Some(fk) = state.foreign_keys.get(&key(name)).cloned() else {
            return Err(MigrationError::driver(
                format!("Can't DROP '{}'; check that column/key exists", name),
                1091,
            ));
        };

        self.execute(&mut state, self.generator.drop_foreign_key(table, name))?;
        state.foreign_keys.shift_remove(&key(name));
        if let Some(column) = table_mut(&mut state, &fk.table)?.column_mut(&fk.column) {
            column.is_foreign_key = false;
            column.ref_table = None;
            column.ref_field = None;
        }
        Ok(())
    }

    async fn create_index(&self, index: &IndexConstraint) -> MigrateResult<()> {
        let mut state = self.state.lock();
        if state.indexes.contains_key(&key(&index.name)) {
            return Err(MigrationError::driver(
                format!("Duplicate key name '{}'", index.name),
                1061,
            ));
        }
        if table_mut(&mut state, &index.table)?.column(&index.column).is_none() {
            return Err(MigrationError::driver(
                format!("Key column '{}' doesn't exist in table", index.column),
                1072,
            ));
        }

        self.execute(&mut state, self.generator.create_index(index))?;
        state.indexes.insert(key(&index.name), index.clone());
        Ok(())
    }

    async fn drop_index(&self, table: &str, name: &str) -> MigrateResult<()> {
        let mut state = self.state.lock();
        if !state.indexes.contains_key(&key(name)) {
            return Err(MigrationError::driver(
                format!("Can't DROP '{}'; check that column/key exists", name),
                1091,
            ));
        }

        self.execute(&mut state, self.generator.drop_index(table, name))?;
        state.indexes.shift_remove(&key(name));
        Ok(())
    }

    async fn find_label(
        &self,
        metadata_table: &str,
        table: &str,
        field: &str,
    ) -> MigrateResult<Option<LabelRecord>> {
        let mut state = self.state.lock();
        self.require_metadata(&state, metadata_table)?;
        self.execute(&mut state, self.generator.select_label(metadata_table))?;

        let probe = LabelRecord {
            table: table.to_string(),
            field: field.to_string(),
            ..Default::default()
        };
        Ok(state.labels.iter().find(|l| l.same_key(&probe)).cloned())
    }

    async fn insert_labels(&self, metadata_table: &str, records: &[LabelRecord]) -> MigrateResult<()> {
        let mut state = self.state.lock();
        self.require_metadata(&state, metadata_table)?;

        for record in records {
            if state.labels.iter().any(|l| l.same_key(record)) {
                return Err(MigrationError::driver(
                    format!("Duplicate entry '{}-{}'", record.table, record.field),
                    1062,
                ));
            }
            self.execute(&mut state, self.generator.insert_label(metadata_table))?;
            state.labels.push(record.clone());
        }
        Ok(())
    }

    async fn update_labels(&self, metadata_table: &str, records: &[LabelRecord]) -> MigrateResult<()> {
        let mut state = self.state.lock();
        self.require_metadata(&state, metadata_table)?;

        for record in records {
            self.execute(&mut state, self.generator.update_label(metadata_table))?;
            if let Some(row) = state.labels.iter_mut().find(|l| l.same_key(record)) {
                *row = record.clone();
            }
        }
        Ok(())
    }

    async fn delete_labels(
        &self,
        metadata_table: &str,
        table: &str,
        field: Option<&str>,
    ) -> MigrateResult<u64> {
        let mut state = self.state.lock();
        self.require_metadata(&state, metadata_table)?;
        self.execute(
            &mut state,
            self.generator.delete_labels(metadata_table, field.is_some()),
        )?;

        let before = state.labels.len();
        state.labels.retain(|l| {
            let table_match = l.table.eq_ignore_ascii_case(table);
            match field {
                Some(field) => !(table_match && l.field.eq_ignore_ascii_case(field)),
                None => !table_match,
            }
        });
        Ok((before - state.labels.len()) as u64)
    }

    async fn begin(&self) -> MigrateResult<bool> {
        if !self.transactions {
            return Ok(false);
        }
        let mut state = self.state.lock();
        let sql = match self.dialect() {
            Dialect::SqlServer => "BEGIN TRANSACTION;",
            Dialect::MySql => "START TRANSACTION;",
            Dialect::Postgres => "BEGIN;",
        };
        self.execute(&mut state, sql.to_string())?;
        state.snapshot = Some(state.labels.clone());
        Ok(true)
    }

    async fn commit(&self) -> MigrateResult<()> {
        let mut state = self.state.lock();
        self.execute(&mut state, "COMMIT;".to_string())?;
        state.snapshot = None;
        Ok(())
    }

    async fn rollback(&self) -> MigrateResult<()> {
        let mut state = self.state.lock();
        if let Some(snapshot) = state.snapshot.take() {
            state.labels = snapshot;
        }
        state.statements.push("ROLLBACK;".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(n, d)| (n.to_string(), d.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_and_describe() {
        let conn = MemoryConnection::new(Dialect::MySql);
        conn.create_table(
            "Users",
            &columns(&[
                ("id", "int NOT NULL AUTO_INCREMENT PRIMARY KEY"),
                ("email", "varchar(255) NOT NULL"),
            ]),
        )
        .await
        .unwrap();

        let schema = conn.describe_table("users").await.unwrap().unwrap();
        assert_eq!(schema.name, "Users");
        assert_eq!(schema.columns.len(), 2);
        assert!(schema.column("id").unwrap().auto_increment);
        assert_eq!(conn.statements().len(), 1);
        assert!(conn.statements()[0].starts_with("CREATE TABLE `Users`"));
    }

    #[tokio::test]
    async fn test_alter_stores_what_was_issued() {
        let conn = MemoryConnection::new(Dialect::SqlServer);
        conn.create_table("widgets", &columns(&[("qty", "int NULL")]))
            .await
            .unwrap();
        conn.alter_column("widgets", "qty", "int NOT NULL DEFAULT 3")
            .await
            .unwrap();

        assert_eq!(
            conn.statements()[1..].to_vec(),
            vec![
                "ALTER TABLE [widgets] ALTER COLUMN [qty] int NOT NULL;",
                "ALTER TABLE [widgets] ADD CONSTRAINT [DF_widgets_qty] DEFAULT 3 FOR [qty];",
            ]
        );
        let schema = conn.describe_table("widgets").await.unwrap().unwrap();
        let qty = schema.column("qty").unwrap();
        assert_eq!(qty.default.as_deref(), Some("3"));
        assert!(!qty.allow_null);
    }

    #[tokio::test]
    async fn test_alter_to_serial_is_stored_as_integer() {
        let conn = MemoryConnection::new(Dialect::Postgres);
        conn.create_table("widgets", &columns(&[("id", "integer NULL")]))
            .await
            .unwrap();
        conn.alter_column("widgets", "id", "serial NOT NULL PRIMARY KEY")
            .await
            .unwrap();

        let schema = conn.describe_table("widgets").await.unwrap().unwrap();
        let id = schema.column("id").unwrap();
        assert_eq!(id.db_type, "integer");
        assert!(id.auto_increment && id.is_primary_key);
        assert!(conn.statements().iter().all(|s| !s.contains("serial")));
    }

    #[tokio::test]
    async fn test_alter_into_second_primary_key_fails() {
        let conn = MemoryConnection::new(Dialect::MySql);
        conn.create_table(
            "widgets",
            &columns(&[
                ("id", "int NOT NULL AUTO_INCREMENT PRIMARY KEY"),
                ("code", "int NULL"),
            ]),
        )
        .await
        .unwrap();

        let err = conn
            .alter_column("widgets", "code", "int NOT NULL PRIMARY KEY")
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Internal { code: Some(1068), .. }));
        assert_eq!(conn.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_table_is_driver_error() {
        let conn = MemoryConnection::new(Dialect::MySql);
        let cols = columns(&[("id", "int NOT NULL AUTO_INCREMENT PRIMARY KEY")]);
        conn.create_table("t", &cols).await.unwrap();

        match conn.create_table("T", &cols).await.unwrap_err() {
            MigrationError::Internal { code, .. } => assert_eq!(code, Some(1050)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let conn = MemoryConnection::new(Dialect::Postgres);
        conn.fail_on("CREATE TABLE \"broken\"");
        let cols = columns(&[("id", "serial NOT NULL PRIMARY KEY")]);

        assert!(conn.create_table("broken", &cols).await.is_err());
        assert!(!conn.has_table("broken"));
        assert!(conn.create_table("fine", &cols).await.is_ok());
        assert_eq!(conn.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_key_requires_referenced_table() {
        let conn = MemoryConnection::new(Dialect::MySql);
        conn.create_table("widgets", &columns(&[("owner_id", "int NULL")]))
            .await
            .unwrap();

        let fk = ForeignKeyConstraint::new("widgets", "owner_id", "users", "id");
        assert!(conn.add_foreign_key(&fk).await.is_err());

        conn.create_table("users", &columns(&[("id", "int NOT NULL AUTO_INCREMENT PRIMARY KEY")]))
            .await
            .unwrap();
        conn.add_foreign_key(&fk).await.unwrap();

        let schema = conn.describe_table("widgets").await.unwrap().unwrap();
        assert!(schema.column("owner_id").unwrap().references("users", "id"));

        conn.drop_foreign_key("widgets", &fk.name).await.unwrap();
        assert!(conn.drop_foreign_key("widgets", &fk.name).await.is_err());
    }

    #[tokio::test]
    async fn test_label_transaction_rollback() {
        let conn = MemoryConnection::new(Dialect::MySql);
        let meta = DdlGenerator::new(Dialect::MySql).metadata_columns().unwrap();
        conn.create_table("_tabula_labels", &meta).await.unwrap();

        let record = LabelRecord {
            table: "widgets".into(),
            label: Some("Widget".into()),
            ..Default::default()
        };

        assert!(conn.begin().await.unwrap());
        conn.insert_labels("_tabula_labels", &[record.clone()]).await.unwrap();
        conn.rollback().await.unwrap();
        assert!(conn.labels().is_empty());

        assert!(conn.begin().await.unwrap());
        conn.insert_labels("_tabula_labels", &[record.clone()]).await.unwrap();
        conn.commit().await.unwrap();
        assert_eq!(conn.labels().len(), 1);
        assert!(conn.insert_labels("_tabula_labels", &[record]).await.is_err());
    }

    #[tokio::test]
    async fn test_labels_require_metadata_table() {
        let conn = MemoryConnection::new(Dialect::MySql).without_transactions();
        assert!(!conn.begin().await.unwrap());
        assert!(conn.find_label("_tabula_labels", "a", "").await.is_err());
    }
}
