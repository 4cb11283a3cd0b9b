//! `tabula validate` command - Check table descriptors.

use std::collections::HashSet;

use tabula_migrate::planner::check_identifier;
use tabula_migrate::{FieldPlanner, TableDescriptor};

use crate::cli::ValidateArgs;
use crate::config::{load_engine_config, read_tables};
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the validate command
pub async fn run(args: ValidateArgs) -> CliResult<()> {
    output::header("Validate Tables");

    let config = load_engine_config(args.config.as_deref(), args.dialect)?;
    let tables = read_tables(&args.file)?;

    output::kv("File", &args.file.display().to_string());
    output::kv("Dialect", config.dialect.name());
    output::newline();

    let planner = FieldPlanner::new(&config);
    let errors = validate_tables(&planner, &tables);

    if !errors.is_empty() {
        output::error("Validation failed!");
        output::newline();
        output::section("Errors");
        for error in &errors {
            output::list_item(error);
        }
        return Err(CliError::Validation(format!(
            "Found {} validation errors",
            errors.len()
        )));
    }

    success("All tables are valid!");
    output::newline();
    output::section("Summary");
    output::kv("Tables", &tables.len().to_string());
    let fields: usize = tables.iter().map(|t| t.fields.len()).sum();
    output::kv("Fields", &fields.to_string());
    Ok(())
}

fn validate_tables(planner: &FieldPlanner, tables: &[TableDescriptor]) -> Vec<String> {
    let dialect = planner.translator().dialect();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (position, table) in tables.iter().enumerate() {
        let label = if table.name.is_empty() {
            format!("#{}", position + 1)
        } else {
            table.name.clone()
        };

        if let Err(e) = check_identifier(&table.name, dialect, "table") {
            errors.push(format!("{}: {}", label, e));
            continue;
        }
        if !seen.insert(table.name.to_ascii_lowercase()) {
            errors.push(format!("{}: table appears more than once", label));
        }
        if table.fields.is_empty() {
            errors.push(format!("{}: table has no fields", label));
            continue;
        }
        if table.new_name.as_deref().is_some_and(|n| !n.trim().is_empty()) {
            errors.push(format!("{}: table rename is not supported", label));
        }
        if let Err(e) = planner.plan(&table.name, &table.fields, None, false, false) {
            errors.push(format!("{}: {}", label, e));
        }
    }

    errors
}
