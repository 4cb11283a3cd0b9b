//! The schema engine: one connection, its configuration and its name cache.
//!
//! Table level operations live in [`crate::table`] and batch operations in
//! [`crate::batch`]; both are methods of [`SchemaEngine`].

use serde::Serialize;

use crate::cache::SchemaCache;
use crate::config::EngineConfig;
use crate::connection::SchemaConnection;
use crate::constraint::{ConstraintApplier, ConstraintOutcome};
use crate::error::{MigrateResult, MigrationError};
use crate::label::{LabelOutcome, LabelStore};
use crate::plan::{ColumnPlan, LabelRecord};
use crate::planner::FieldPlanner;
use crate::sql::DdlGenerator;

/// Results of applying the constraint and label parts of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeferredOutcome {
    /// One entry per attempted foreign key or index operation.
    pub constraints: Vec<ConstraintOutcome>,
    /// Label write summary.
    pub labels: LabelOutcome,
}

impl DeferredOutcome {
    /// Whether every constraint and label write succeeded.
    pub fn is_ok(&self) -> bool {
        self.labels.is_ok() && self.constraints.iter().all(|c| !c.is_significant_failure())
    }

    /// Constraint operations that failed and matter.
    pub fn failures(&self) -> impl Iterator<Item = &ConstraintOutcome> {
        self.constraints.iter().filter(|c| c.is_significant_failure())
    }
}

/// Creates, alters and drops tables through a [`SchemaConnection`].
pub struct SchemaEngine<C> {
    pub(crate) conn: C,
    pub(crate) config: EngineConfig,
    pub(crate) cache: SchemaCache,
    pub(crate) planner: FieldPlanner,
}

impl<C: SchemaConnection> SchemaEngine<C> {
    /// Create an engine with default settings for the connection's dialect.
    pub fn new(conn: C) -> Self {
        let config = EngineConfig::new(conn.dialect());
        let planner = FieldPlanner::new(&config);
        Self {
            conn,
            config,
            cache: SchemaCache::new(),
            planner,
        }
    }

    /// Create an engine with explicit settings.
    pub fn with_config(conn: C, config: EngineConfig) -> MigrateResult<Self> {
        config.validate()?;
        if config.dialect != conn.dialect() {
            return Err(MigrationError::config(format!(
                "configured dialect {} does not match the connection dialect {}",
                config.dialect,
                conn.dialect()
            )));
        }

        let planner = FieldPlanner::new(&config);
        Ok(Self {
            conn,
            config,
            cache: SchemaCache::new(),
            planner,
        })
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The table name cache.
    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// Release the connection.
    pub fn into_inner(self) -> C {
        self.conn
    }

    /// Create the metadata table unless it exists. Returns whether it was created.
    pub async fn install(&self) -> MigrateResult<bool> {
        let table = &self.config.metadata_table;
        if self.cache.exists(&self.conn, table).await? {
            return Ok(false);
        }

        let columns = DdlGenerator::new(self.config.dialect).metadata_columns()?;
        self.conn.create_table(table, &columns).await?;
        self.cache.invalidate();
        tracing::info!(table = %table, "metadata table created");
        Ok(true)
    }

    /// Whether a table exists, ignoring case.
    pub async fn table_exists(&self, table: &str) -> MigrateResult<bool> {
        self.cache.exists(&self.conn, table).await
    }

    /// Names of all tables.
    pub async fn table_names(&self) -> MigrateResult<Vec<String>> {
        self.cache.table_names(&self.conn).await
    }

    /// Apply the foreign keys, indexes and labels of a plan.
    ///
    /// Failures are logged and reported in the outcome; this never fails.
    pub async fn apply_deferred(&self, plan: &ColumnPlan) -> DeferredOutcome {
        let constraints = ConstraintApplier::new(&self.conn, &self.config.system_user_table)
            .system_connection(self.config.system_connection)
            .apply(&plan.references, &plan.indexes)
            .await;

        let labels = self.save_labels(&plan.labels).await;

        let outcome = DeferredOutcome {
            constraints,
            labels,
        };
        if !outcome.is_ok() {
            tracing::warn!(
                failed_constraints = outcome.failures().count(),
                label_error = outcome.labels.error.as_deref(),
                "deferred schema work incomplete"
            );
        }
        outcome
    }

    pub(crate) async fn save_labels(&self, records: &[LabelRecord]) -> LabelOutcome {
        if records.is_empty() {
            return LabelOutcome::default();
        }
        self.labels().upsert(records).await
    }

    pub(crate) fn labels(&self) -> LabelStore<'_, C> {
        LabelStore::new(&self.conn, &self.config.metadata_table)
    }
}
