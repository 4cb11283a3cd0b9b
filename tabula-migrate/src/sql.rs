//! SQL generation per dialect.

use indexmap::IndexMap;

use crate::definition::{ColumnDefinition, name_default};
use crate::descriptor::FieldDescriptor;
use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::introspect::ColumnSchema;
use crate::plan::{ForeignKeyConstraint, IndexConstraint};
use crate::translate::TypeTranslator;

/// Columns of the label metadata table, after `id`.
pub const METADATA_COLUMNS: [&str; 7] = [
    "table",
    "field",
    "label",
    "plural",
    "picklist",
    "validation",
    "name_field",
];

/// Name of the SQL Server default constraint of a column.
pub fn default_constraint_name(table: &str, column: &str) -> String {
    format!("DF_{}_{}", table, column)
}

/// Type a column is stored with. PostgreSQL serial types are integers
/// backed by a sequence.
pub fn storage_type(def: &ColumnDefinition) -> String {
    match def.base_type().as_str() {
        "serial" => "integer".to_string(),
        "bigserial" => "bigint".to_string(),
        "smallserial" => "smallint".to_string(),
        _ => def.db_type.clone(),
    }
}

/// Renders DDL and metadata statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct DdlGenerator {
    dialect: Dialect,
}

impl DdlGenerator {
    /// Create a generator.
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// The target dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn q(&self, ident: &str) -> String {
        self.dialect.quote_ident(ident)
    }

    /// Generate CREATE TABLE statement.
    pub fn create_table(&self, table: &str, columns: &IndexMap<String, String>) -> String {
        let columns: Vec<String> = columns
            .iter()
            .map(|(name, def)| format!("{} {}", self.q(name), self.column_sql(table, name, def)))
            .collect();
        format!(
            "CREATE TABLE {} (\n    {}\n);",
            self.q(table),
            columns.join(",\n    ")
        )
    }

    /// Generate DROP TABLE statement.
    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {};", self.q(table))
    }

    /// Generate ADD COLUMN statement.
    pub fn add_column(&self, table: &str, column: &str, definition: &str) -> String {
        let keyword = match self.dialect {
            Dialect::SqlServer => "ADD",
            Dialect::MySql | Dialect::Postgres => "ADD COLUMN",
        };
        format!(
            "ALTER TABLE {} {} {} {};",
            self.q(table),
            keyword,
            self.q(column),
            self.column_sql(table, column, definition)
        )
    }

    /// Generate the statements altering `existing` to a new definition.
    ///
    /// SQL Server and PostgreSQL change type, nullability, default and
    /// primary key in separate statements. SQL Server defaults are named
    /// `DF_<table>_<column>` so they can be replaced later.
    pub fn alter_column(
        &self,
        table: &str,
        existing: &ColumnSchema,
        definition: &str,
    ) -> MigrateResult<Vec<String>> {
        let table_q = self.q(table);
        let column_q = self.q(&existing.name);
        let def = ColumnDefinition::parse(definition);
        let add_primary_key = def.primary_key && !existing.is_primary_key;

        match self.dialect {
            Dialect::MySql => Ok(vec![format!(
                "ALTER TABLE {} MODIFY COLUMN {} {};",
                table_q, column_q, definition
            )]),
            Dialect::SqlServer => {
                if def.auto_increment && !existing.auto_increment {
                    return Err(MigrationError::bad_request(format!(
                        "Column '{}' of table '{}' cannot become an IDENTITY column",
                        existing.name, table
                    )));
                }
                let constraint = self.q(&default_constraint_name(table, &existing.name));
                let null = if def.nullable { "NULL" } else { "NOT NULL" };

                let mut stmts = Vec::new();
                if existing.default.is_some() {
                    stmts.push(format!(
                        "ALTER TABLE {} DROP CONSTRAINT {};",
                        table_q, constraint
                    ));
                }
                stmts.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} {} {};",
                    table_q, column_q, def.db_type, null
                ));
                if let Some(default) = &def.default {
                    stmts.push(format!(
                        "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {} FOR {};",
                        table_q, constraint, default, column_q
                    ));
                }
                if add_primary_key {
                    stmts.push(self.add_primary_key(table, &existing.name));
                }
                Ok(stmts)
            }
            Dialect::Postgres => {
                let column_type = storage_type(&def);
                let mut stmts = vec![format!(
                    "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
                    table_q, column_q, column_type, column_q, column_type
                )];
                stmts.push(if def.nullable {
                    format!("ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL;", table_q, column_q)
                } else {
                    format!("ALTER TABLE {} ALTER COLUMN {} SET NOT NULL;", table_q, column_q)
                });
                if def.auto_increment {
                    if !existing.auto_increment {
                        stmts.push(format!(
                            "ALTER TABLE {} ALTER COLUMN {} ADD GENERATED BY DEFAULT AS IDENTITY;",
                            table_q, column_q
                        ));
                    }
                } else {
                    if existing.auto_increment {
                        stmts.push(format!(
                            "ALTER TABLE {} ALTER COLUMN {} DROP IDENTITY IF EXISTS;",
                            table_q, column_q
                        ));
                    }
                    stmts.push(match &def.default {
                        Some(default) => format!(
                            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {};",
                            table_q, column_q, default
                        ),
                        None => format!(
                            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT;",
                            table_q, column_q
                        ),
                    });
                }
                if add_primary_key {
                    stmts.push(self.add_primary_key(table, &existing.name));
                }
                Ok(stmts)
            }
        }
    }

    /// Generate the statement making a column the primary key.
    pub fn add_primary_key(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({});",
            self.q(table),
            self.q(&format!("pk_{}", table)),
            self.q(column)
        )
    }

    fn column_sql(&self, table: &str, column: &str, definition: &str) -> String {
        match self.dialect {
            Dialect::SqlServer => {
                name_default(definition, &self.q(&default_constraint_name(table, column)))
            }
            Dialect::MySql | Dialect::Postgres => definition.to_string(),
        }
    }

    /// Generate DROP COLUMN statement.
    pub fn drop_column(&self, table: &str, column: &str) -> String {
        format!("ALTER TABLE {} DROP COLUMN {};", self.q(table), self.q(column))
    }

    /// Generate ADD CONSTRAINT ... FOREIGN KEY statement.
    pub fn add_foreign_key(&self, fk: &ForeignKeyConstraint) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.q(&fk.table),
            self.q(&fk.name),
            self.q(&fk.column),
            self.q(&fk.ref_table),
            self.q(&fk.ref_fields)
        );
        if let Some(action) = fk.on_delete.as_deref().filter(|a| !a.is_empty()) {
            sql.push_str(&format!(" ON DELETE {}", action.to_ascii_uppercase()));
        }
        if let Some(action) = fk.on_update.as_deref().filter(|a| !a.is_empty()) {
            sql.push_str(&format!(" ON UPDATE {}", action.to_ascii_uppercase()));
        }
        sql.push(';');
        sql
    }

    /// Generate the statement dropping a foreign key.
    pub fn drop_foreign_key(&self, table: &str, name: &str) -> String {
        match self.dialect {
            Dialect::MySql => format!(
                "ALTER TABLE {} DROP FOREIGN KEY {};",
                self.q(table),
                self.q(name)
            ),
            Dialect::SqlServer | Dialect::Postgres => format!(
                "ALTER TABLE {} DROP CONSTRAINT {};",
                self.q(table),
                self.q(name)
            ),
        }
    }

    /// Generate CREATE INDEX statement.
    pub fn create_index(&self, index: &IndexConstraint) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            self.q(&index.name),
            self.q(&index.table),
            self.q(&index.column)
        )
    }

    /// Generate DROP INDEX statement.
    pub fn drop_index(&self, table: &str, name: &str) -> String {
        match self.dialect {
            Dialect::MySql | Dialect::SqlServer => {
                format!("DROP INDEX {} ON {};", self.q(name), self.q(table))
            }
            Dialect::Postgres => format!("DROP INDEX {};", self.q(name)),
        }
    }

    /// Column definitions of the label metadata table.
    pub fn metadata_columns(&self) -> MigrateResult<IndexMap<String, String>> {
        let translator = TypeTranslator::new(self.dialect);
        let fields = [
            FieldDescriptor::new("id", "id"),
            FieldDescriptor::new("table", "string").length(64).not_null(),
            FieldDescriptor::new("field", "string").length(64).not_null(),
            FieldDescriptor::new("label", "string"),
            FieldDescriptor::new("plural", "string"),
            FieldDescriptor::new("picklist", "text"),
            FieldDescriptor::new("validation", "text"),
            FieldDescriptor::new("name_field", "string").length(64),
        ];

        let mut columns = IndexMap::new();
        for field in &fields {
            columns.insert(field.name.clone(), translator.translate(field)?);
        }
        Ok(columns)
    }

    /// Point query for one label row by `(table, field)`.
    pub fn select_label(&self, metadata_table: &str) -> String {
        let columns: Vec<String> = std::iter::once("id")
            .chain(METADATA_COLUMNS)
            .map(|c| self.q(c))
            .collect();
        format!(
            "SELECT {} FROM {} WHERE {} = {} AND {} = {};",
            columns.join(", "),
            self.q(metadata_table),
            self.q("table"),
            self.dialect.placeholder(1),
            self.q("field"),
            self.dialect.placeholder(2)
        )
    }

    /// Insert of one label row; parameters follow `METADATA_COLUMNS`.
    pub fn insert_label(&self, metadata_table: &str) -> String {
        let columns: Vec<String> = METADATA_COLUMNS.iter().map(|c| self.q(c)).collect();
        let params: Vec<String> = (1..=METADATA_COLUMNS.len())
            .map(|i| self.dialect.placeholder(i))
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({});",
            self.q(metadata_table),
            columns.join(", "),
            params.join(", ")
        )
    }

    /// Update of one label row: payload columns, then the key.
    pub fn update_label(&self, metadata_table: &str) -> String {
        let sets: Vec<String> = METADATA_COLUMNS[2..]
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = {}", self.q(c), self.dialect.placeholder(i + 1)))
            .collect();
        let next = sets.len() + 1;
        format!(
            "UPDATE {} SET {} WHERE {} = {} AND {} = {};",
            self.q(metadata_table),
            sets.join(", "),
            self.q("table"),
            self.dialect.placeholder(next),
            self.q("field"),
            self.dialect.placeholder(next + 1)
        )
    }

    /// Delete of label rows for a table, or for one of its fields.
    pub fn delete_labels(&self, metadata_table: &str, by_field: bool) -> String {
        let mut sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.q(metadata_table),
            self.q("table"),
            self.dialect.placeholder(1)
        );
        if by_field {
            sql.push_str(&format!(
                " AND {} = {}",
                self.q("field"),
                self.dialect.placeholder(2)
            ));
        }
        sql.push(';');
        sql
    }
}
