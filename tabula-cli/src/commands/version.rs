//! `tabula version` command - Display version information.

use tabula_migrate::Dialect;

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("Tabula");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    let dialects: Vec<&str> = Dialect::ALL.iter().map(|d| d.name()).collect();
    kv("Dialects", &dialects.join(", "));

    output::newline();
    output::section("Components");
    kv("tabula-migrate", env!("CARGO_PKG_VERSION"));

    Ok(())
}
