//! Tabula CLI - plan and validate schema migrations from the command line.

use clap::Parser;

use tabula_cli::cli::{Cli, Command};
use tabula_cli::commands;
use tabula_cli::error::CliResult;
use tabula_cli::output;

#[tokio::main]
async fn main() {
    tabula_migrate::logging::init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Plan(args) => commands::plan::run(args).await,
        Command::Validate(args) => commands::validate::run(args).await,
        Command::Version => commands::version::run().await,
    }
}
