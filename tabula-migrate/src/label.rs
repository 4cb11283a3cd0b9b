//! Persistence of label, picklist and validation metadata.
//!
//! Label writes are best effort: a failure is rolled back when the connection
//! supports transactions, logged, and reported in the [`LabelOutcome`]. It
//! never fails the schema operation that produced the labels.

use serde::Serialize;

use crate::connection::SchemaConnection;
use crate::error::MigrateResult;
use crate::plan::LabelRecord;

/// Summary of a label write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelOutcome {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows updated.
    pub updated: usize,
    /// Rows deleted.
    pub deleted: u64,
    /// Whether the write ran inside a transaction.
    pub transactional: bool,
    /// Failure message; all changes of the call were abandoned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LabelOutcome {
    /// Whether the write succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Reads and writes the metadata table.
pub struct LabelStore<'a, C: ?Sized> {
    conn: &'a C,
    metadata_table: &'a str,
}

impl<'a, C> LabelStore<'a, C>
where
    C: SchemaConnection + ?Sized,
{
    /// Create a store over `metadata_table`.
    pub fn new(conn: &'a C, metadata_table: &'a str) -> Self {
        Self {
            conn,
            metadata_table,
        }
    }

    /// Insert records whose `(table, field)` is new and update the rest.
    pub async fn upsert(&self, records: &[LabelRecord]) -> LabelOutcome {
        let records = collapse(records);
        if records.is_empty() {
            return LabelOutcome::default();
        }

        let mut outcome = LabelOutcome::default();
        let mut transactional = false;

        let result: MigrateResult<()> = async {
            let mut inserts = Vec::new();
            let mut updates = Vec::new();
            for record in records {
                match self
                    .conn
                    .find_label(self.metadata_table, &record.table, &record.field)
                    .await?
                {
                    Some(_) => updates.push(record),
                    None => inserts.push(record),
                }
            }

            transactional = self.conn.begin().await?;
            self.conn.insert_labels(self.metadata_table, &inserts).await?;
            self.conn.update_labels(self.metadata_table, &updates).await?;
            if transactional {
                self.conn.commit().await?;
            }

            outcome.inserted = inserts.len();
            outcome.updated = updates.len();
            Ok(())
        }
        .await;

        outcome.transactional = transactional;
        if let Err(e) = result {
            self.abandon(transactional, &e.to_string(), &mut outcome).await;
        } else {
            tracing::debug!(
                inserted = outcome.inserted,
                updated = outcome.updated,
                "labels saved"
            );
        }
        outcome
    }

    /// Delete the rows of a table, or of one of its fields.
    pub async fn remove(&self, table: &str, field: Option<&str>) -> LabelOutcome {
        let mut outcome = LabelOutcome::default();
        match self.conn.delete_labels(self.metadata_table, table, field).await {
            Ok(count) => outcome.deleted = count,
            Err(e) => {
                tracing::warn!(table, field, error = %e, "labels not removed");
                outcome.error = Some(e.to_string());
            }
        }
        outcome
    }

    /// Row for `(table, field)`; lookup failures read as absent.
    pub async fn find(&self, table: &str, field: &str) -> Option<LabelRecord> {
        match self.conn.find_label(self.metadata_table, table, field).await {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(table, field, error = %e, "label lookup failed");
                None
            }
        }
    }

    async fn abandon(&self, transactional: bool, error: &str, outcome: &mut LabelOutcome) {
        if transactional {
            if let Err(e) = self.conn.rollback().await {
                tracing::warn!(error = %e, "label rollback failed");
            }
        }
        tracing::warn!(error, "labels not saved");
        outcome.inserted = 0;
        outcome.updated = 0;
        outcome.error = Some(error.to_string());
    }
}

/// Keep the last record per key, in first-seen order.
fn collapse(records: &[LabelRecord]) -> Vec<LabelRecord> {
    let mut out: Vec<LabelRecord> = Vec::with_capacity(records.len());
    for record in records {
        match out.iter_mut().find(|r| r.same_key(record)) {
            Some(slot) => *slot = record.clone(),
            None => out.push(record.clone()),
        }
    }
    out
}
