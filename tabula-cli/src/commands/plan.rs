//! `tabula plan` command - Dry-run a migration against an in-memory database.

use serde::Serialize;
use tabula_migrate::{BatchEntry, BatchOptions, DeferredOutcome, MemoryConnection, SchemaEngine};

use crate::cli::PlanArgs;
use crate::config::{load_engine_config, read_tables};
use crate::error::{CliError, CliResult};
use crate::output::{self, success, warn};

/// Everything a plan run produced, for `--json`.
#[derive(Debug, Serialize)]
struct PlanReport<'a> {
    dialect: String,
    statements: &'a [String],
    results: &'a [BatchEntry],
    #[serde(flatten)]
    deferred: &'a DeferredOutcome,
}

/// Run the plan command
pub async fn run(args: PlanArgs) -> CliResult<()> {
    let config = load_engine_config(args.config.as_deref(), args.dialect)?;
    let dialect = config.dialect;
    let tables = read_tables(&args.file)?;

    let engine = SchemaEngine::with_config(MemoryConnection::new(dialect), config)?;
    engine.install().await?;

    if let Some(existing) = &args.existing {
        let baseline = read_tables(existing)?;
        engine
            .update_tables(baseline, BatchOptions::new().allow_merge(true))
            .await
            .map_err(|e| CliError::Migration(format!("existing tables could not be created: {}", e)))?;
    }
    engine.connection().clear_statements();

    let options = BatchOptions::new()
        .allow_merge(args.merge)
        .allow_delete(args.delete)
        .rollback(args.rollback);
    let result = engine.migrate_batch(tables, options).await;
    let statements = engine.connection().statements();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if !args.json && !statements.is_empty() {
                output::header("Statements issued before the failure");
                output::statements(&statements);
            }
            return Err(e.into());
        }
    };

    if args.json {
        let document = PlanReport {
            dialect: dialect.to_string(),
            statements: &statements,
            results: &report.results,
            deferred: &report.deferred,
        };
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    output::header(&format!("Migration plan ({})", dialect));
    output::statements(&statements);

    output::section("Results");
    output::table_results(&report.results);
    output::newline();
    output::deferred_failures(&report.deferred);

    let failed = report.results.iter().filter(|r| !r.is_applied()).count();
    if failed == 0 {
        success(&format!("{} table(s) planned", report.results.len()));
    } else {
        warn(&format!(
            "{} of {} table(s) failed",
            failed,
            report.results.len()
        ));
    }
    Ok(())
}
