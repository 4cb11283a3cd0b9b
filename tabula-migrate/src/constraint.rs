//! Application of planned foreign keys and indexes.
//!
//! Constraint failures never abort a migration. Every attempt is reported as
//! a [`ConstraintOutcome`] and the caller decides what to do with failures.

use serde::Serialize;

use crate::connection::SchemaConnection;
use crate::plan::{ForeignKeyConstraint, IndexConstraint};

/// What was attempted for a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintAction {
    /// Dropped a foreign key before re-adding it.
    DropForeignKey,
    /// Added a foreign key.
    AddForeignKey,
    /// Left out a foreign key the connection cannot enforce.
    SkipForeignKey,
    /// Dropped an index before re-creating it.
    DropIndex,
    /// Created an index.
    CreateIndex,
}

/// Result of one constraint operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintOutcome {
    /// Constraint name.
    pub name: String,
    /// Owning table.
    pub table: String,
    /// Attempted action.
    pub action: ConstraintAction,
    /// Driver message when the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConstraintOutcome {
    fn new(name: &str, table: &str, action: ConstraintAction) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            action,
            error: None,
        }
    }

    fn failed(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Whether the action succeeded (or was deliberately skipped).
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Whether a failure matters: failed drops are expected when the constraint is absent.
    pub fn is_significant_failure(&self) -> bool {
        !self.is_ok()
            && matches!(
                self.action,
                ConstraintAction::AddForeignKey | ConstraintAction::CreateIndex
            )
    }
}

/// Executes foreign key and index operations on a connection.
pub struct ConstraintApplier<'a, C: ?Sized> {
    conn: &'a C,
    user_table: &'a str,
    system: bool,
}

impl<'a, C> ConstraintApplier<'a, C>
where
    C: SchemaConnection + ?Sized,
{
    /// Create an applier; `user_table` is the system user table.
    pub fn new(conn: &'a C, user_table: &'a str) -> Self {
        Self {
            conn,
            user_table,
            system: conn.is_system_connection(),
        }
    }

    /// Treat the connection as secondary even if it reports otherwise.
    pub fn system_connection(mut self, system: bool) -> Self {
        self.system &= system;
        self
    }

    /// Apply foreign keys, then indexes. Never fails.
    pub async fn apply(
        &self,
        references: &[ForeignKeyConstraint],
        indexes: &[IndexConstraint],
    ) -> Vec<ConstraintOutcome> {
        let mut outcomes = Vec::new();

        for fk in references {
            if fk.drop {
                let outcome =
                    ConstraintOutcome::new(&fk.name, &fk.table, ConstraintAction::DropForeignKey);
                outcomes.push(match self.conn.drop_foreign_key(&fk.table, &fk.name).await {
                    Ok(()) => outcome,
                    Err(e) => {
                        tracing::debug!(constraint = %fk.name, error = %e, "foreign key drop failed");
                        outcome.failed(e)
                    }
                });
            }

            if fk.ref_table.trim().is_empty() {
                continue;
            }

            if fk.ref_table.eq_ignore_ascii_case(self.user_table) && !self.system {
                tracing::debug!(
                    constraint = %fk.name,
                    "skipping user table reference on a non-system connection"
                );
                outcomes.push(ConstraintOutcome::new(
                    &fk.name,
                    &fk.table,
                    ConstraintAction::SkipForeignKey,
                ));
                continue;
            }

            let outcome =
                ConstraintOutcome::new(&fk.name, &fk.table, ConstraintAction::AddForeignKey);
            outcomes.push(match self.conn.add_foreign_key(fk).await {
                Ok(()) => outcome,
                Err(e) => {
                    tracing::warn!(constraint = %fk.name, error = %e, "foreign key not created");
                    outcome.failed(e)
                }
            });
        }

        for index in indexes {
            if index.drop {
                let outcome =
                    ConstraintOutcome::new(&index.name, &index.table, ConstraintAction::DropIndex);
                outcomes.push(match self.conn.drop_index(&index.table, &index.name).await {
                    Ok(()) => outcome,
                    Err(e) => {
                        tracing::debug!(index = %index.name, error = %e, "index drop failed");
                        outcome.failed(e)
                    }
                });
            }

            let outcome =
                ConstraintOutcome::new(&index.name, &index.table, ConstraintAction::CreateIndex);
            outcomes.push(match self.conn.create_index(index).await {
                Ok(()) => outcome,
                Err(e) => {
                    tracing::warn!(index = %index.name, error = %e, "index not created");
                    outcome.failed(e)
                }
            });
        }

        outcomes
    }
}
