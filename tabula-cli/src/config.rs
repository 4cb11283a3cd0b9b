//! CLI configuration handling.

use std::path::{Path, PathBuf};

use tabula_migrate::{Dialect, EngineConfig, TableDescriptor, TableInput};

use crate::error::{CliError, CliResult};

/// Default config file name (looked up in the working directory)
pub const CONFIG_FILE_NAME: &str = "tabula.toml";

/// Load engine settings.
///
/// An explicit path must exist. Without one, `tabula.toml` in the working
/// directory is used when present, else the defaults. `dialect` overrides
/// whatever the file says.
pub fn load_engine_config(
    explicit: Option<&Path>,
    dialect: Option<Dialect>,
) -> CliResult<EngineConfig> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(CliError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let mut config = match path {
        Some(path) => EngineConfig::from_file(&path)?,
        None => EngineConfig::default(),
    };
    if let Some(dialect) = dialect {
        config = config.dialect(dialect);
    }
    config.validate()?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(CONFIG_FILE_NAME))
}

/// Read table descriptors from a JSON file.
pub fn read_tables(path: &Path) -> CliResult<Vec<TableDescriptor>> {
    if !path.exists() {
        return Err(CliError::Descriptor(format!(
            "File not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    let input: TableInput = serde_json::from_str(&content)?;
    Ok(input.into_tables())
}

/// Parse a dialect name or driver alias.
pub fn parse_dialect(value: &str) -> Result<Dialect, String> {
    value.parse::<Dialect>().map_err(|e| e.to_string())
}
