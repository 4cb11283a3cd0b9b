//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tabula_migrate::Dialect;

use crate::config::parse_dialect;

/// Tabula CLI - Abstract schema migrations
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(version)]
#[command(about = "Tabula CLI - Abstract schema migrations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the statements a migration would issue
    Plan(PlanArgs),

    /// Validate table descriptors without touching a database
    Validate(ValidateArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Plan Command
// =============================================================================

/// Arguments for the `plan` command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// JSON file with one table, an array of tables or {"table": [...]}
    pub file: PathBuf,

    /// Target dialect (mysql, sqlserver, postgres or a driver alias)
    #[arg(short, long, value_parser = parse_dialect)]
    pub dialect: Option<Dialect>,

    /// Path to tabula.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tables that already exist before the migration
    #[arg(short, long)]
    pub existing: Option<PathBuf>,

    /// Update tables that already exist
    #[arg(long)]
    pub merge: bool,

    /// Drop columns missing from the descriptors
    #[arg(long)]
    pub delete: bool,

    /// Abort on the first failure and drop the tables created so far
    #[arg(long)]
    pub rollback: bool,

    /// Print a single JSON document instead of styled output
    #[arg(long)]
    pub json: bool,
}

// =============================================================================
// Validate Command
// =============================================================================

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// JSON file with table descriptors
    pub file: PathBuf,

    /// Target dialect (mysql, sqlserver, postgres or a driver alias)
    #[arg(short, long, value_parser = parse_dialect)]
    pub dialect: Option<Dialect>,

    /// Path to tabula.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
