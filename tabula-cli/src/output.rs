//! Terminal rendering of plans, results and validation reports.

use owo_colors::OwoColorize;
use tabula_migrate::{BatchEntry, DeferredOutcome};

/// Print a title underlined to its width.
pub fn header(text: &str) {
    println!();
    println!("{}", text.bold().cyan());
    println!("{}", "─".repeat(text.chars().count()).dimmed());
    println!();
}

/// Print a section title.
pub fn section(text: &str) {
    println!("{}", text.bold().white());
}

/// Print a labelled value.
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

pub fn success(text: &str) {
    println!("{} {}", "✔".green().bold(), text.green());
}

pub fn warn(text: &str) {
    println!("{} {}", "⚠".yellow().bold(), text.yellow());
}

/// Errors go to stderr.
pub fn error(text: &str) {
    eprintln!("{} {}", "✖".red().bold(), text.red());
}

pub fn list_item(text: &str) {
    println!("  {} {}", "•".dimmed(), text);
}

pub fn newline() {
    println!();
}

/// Print statements verbatim so the output can be piped into a client.
pub fn statements(statements: &[String]) {
    if statements.is_empty() {
        println!("{}", "-- no statements".dimmed());
        println!();
        return;
    }
    for statement in statements {
        println!("{}", statement);
        println!();
    }
}

/// One line per input table, in input order.
pub fn table_results(results: &[BatchEntry]) {
    for (position, entry) in results.iter().enumerate() {
        match entry {
            BatchEntry::Applied(table) => {
                println!("  {} {}", "✔".green(), table.name);
            }
            BatchEntry::Failed { error } => {
                println!(
                    "  {} #{} {} {}",
                    "✖".red(),
                    position + 1,
                    error.message.red(),
                    format!("({})", error.code).dimmed()
                );
            }
        }
    }
}

/// Warn about foreign keys, indexes and labels that could not be applied.
pub fn deferred_failures(deferred: &DeferredOutcome) {
    for failure in deferred.failures() {
        warn(&format!(
            "{} on {} failed: {}",
            failure.name,
            failure.table,
            failure.error.as_deref().unwrap_or("unknown error")
        ));
    }
    if let Some(error) = &deferred.labels.error {
        warn(&format!("labels not saved: {}", error));
    }
}
