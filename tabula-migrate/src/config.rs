//! Engine configuration and `tabula.toml` parsing.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::translate::DEFAULT_STRING_LENGTH;

/// Top-level structure of `tabula.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TabulaConfig {
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl TabulaConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> MigrateResult<Self> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }
}

/// Settings of the schema migration engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Target dialect.
    #[serde(default)]
    pub dialect: Dialect,

    /// Table holding system users, referenced by `user_id` fields.
    #[serde(default = "default_user_table")]
    pub system_user_table: String,

    /// Key column of the system user table.
    #[serde(default = "default_user_key")]
    pub system_user_key: String,

    /// Table storing labels, picklists and validation rules.
    #[serde(default = "default_metadata_table")]
    pub metadata_table: String,

    /// Length of character columns declared without one.
    #[serde(default = "default_string_length")]
    pub default_string_length: u32,

    /// Whether the connection is the system connection owning the user table.
    #[serde(default = "default_true")]
    pub system_connection: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            system_user_table: default_user_table(),
            system_user_key: default_user_key(),
            metadata_table: default_metadata_table(),
            default_string_length: default_string_length(),
            system_connection: true,
        }
    }
}

fn default_user_table() -> String {
    "user".to_string()
}
fn default_user_key() -> String {
    "id".to_string()
}
fn default_metadata_table() -> String {
    "_tabula_labels".to_string()
}
fn default_string_length() -> u32 {
    DEFAULT_STRING_LENGTH
}
fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Create a configuration for a dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    /// Load the `[engine]` section of a `tabula.toml` file.
    pub fn from_file(path: impl AsRef<Path>) -> MigrateResult<Self> {
        Ok(TabulaConfig::from_file(path)?.engine)
    }

    /// Set the dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the system user table and its key.
    pub fn system_user_table(mut self, table: impl Into<String>, key: impl Into<String>) -> Self {
        self.system_user_table = table.into();
        self.system_user_key = key.into();
        self
    }

    /// Set the metadata table.
    pub fn metadata_table(mut self, table: impl Into<String>) -> Self {
        self.metadata_table = table.into();
        self
    }

    /// Set the default string length.
    pub fn default_string_length(mut self, length: u32) -> Self {
        self.default_string_length = length;
        self
    }

    /// Set whether the connection owns the user table.
    pub fn system_connection(mut self, system: bool) -> Self {
        self.system_connection = system;
        self
    }

    /// Check the settings for values no database accepts.
    pub fn validate(&self) -> MigrateResult<()> {
        if self.system_user_table.trim().is_empty() || self.system_user_key.trim().is_empty() {
            return Err(MigrationError::config("system user table and key must be set"));
        }
        if self.metadata_table.trim().is_empty() {
            return Err(MigrationError::config("metadata table must be set"));
        }
        if self.default_string_length == 0 {
            return Err(MigrationError::config(
                "default_string_length must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Replace `${VAR}` references with environment values; unknown variables stay as written.
fn expand_env_vars(content: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
