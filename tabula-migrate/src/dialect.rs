//! SQL dialects and their per-family limits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MigrationError;

/// Target database family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL and MariaDB.
    #[default]
    #[serde(alias = "mariadb")]
    MySql,
    /// Microsoft SQL Server through sqlsrv or dblib.
    #[serde(alias = "mssql", alias = "sqlsrv", alias = "dblib")]
    SqlServer,
    /// PostgreSQL.
    #[serde(alias = "pgsql", alias = "postgresql")]
    Postgres,
}

/// Numeric and length limits enforced when translating types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectLimits {
    /// Maximum decimal precision.
    pub decimal_precision: u32,
    /// Maximum decimal scale.
    pub decimal_scale: u32,
    /// Maximum float precision.
    pub float_precision: u32,
    /// Maximum float scale.
    pub float_scale: u32,
    /// `varchar`/`varbinary` length above which SQL Server switches to `max`.
    pub varchar_promote: Option<u32>,
    /// `nvarchar` length above which SQL Server switches to `max`.
    pub nvarchar_promote: Option<u32>,
    /// Hard cap for variable length character and binary types.
    pub varchar_max: u32,
    /// Hard cap for fixed length character and binary types.
    pub char_max: u32,
    /// Maximum identifier length.
    pub identifier_max: usize,
}

const MYSQL_LIMITS: DialectLimits = DialectLimits {
    decimal_precision: 65,
    decimal_scale: 30,
    float_precision: 53,
    float_scale: 30,
    varchar_promote: None,
    nvarchar_promote: None,
    varchar_max: 65535,
    char_max: 255,
    identifier_max: 64,
};

const SQLSERVER_LIMITS: DialectLimits = DialectLimits {
    decimal_precision: 38,
    decimal_scale: 18,
    float_precision: 38,
    float_scale: 18,
    varchar_promote: Some(8000),
    nvarchar_promote: Some(4000),
    varchar_max: u32::MAX,
    char_max: 8000,
    identifier_max: 128,
};

const POSTGRES_LIMITS: DialectLimits = DialectLimits {
    decimal_precision: 1000,
    decimal_scale: 1000,
    float_precision: 53,
    float_scale: 53,
    varchar_promote: None,
    nvarchar_promote: None,
    varchar_max: 10_485_760,
    char_max: 10_485_760,
    identifier_max: 63,
};

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 3] = [Dialect::MySql, Dialect::SqlServer, Dialect::Postgres];

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::SqlServer => "sqlserver",
            Self::Postgres => "postgres",
        }
    }

    /// Type and length limits for this dialect.
    pub fn limits(&self) -> &'static DialectLimits {
        match self {
            Self::MySql => &MYSQL_LIMITS,
            Self::SqlServer => &SQLSERVER_LIMITS,
            Self::Postgres => &POSTGRES_LIMITS,
        }
    }

    /// Whether this is the SQL Server family.
    pub fn is_sql_server(&self) -> bool {
        matches!(self, Self::SqlServer)
    }

    /// Quote an identifier.
    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", name.replace('`', "``")),
            Self::SqlServer => format!("[{}]", name.replace(']', "]]")),
            Self::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Column definition for an auto-incrementing integer primary key.
    pub fn auto_increment_pk(&self) -> &'static str {
        match self {
            Self::MySql => "int NOT NULL AUTO_INCREMENT PRIMARY KEY",
            Self::SqlServer => "int IDENTITY(1,1) NOT NULL PRIMARY KEY",
            Self::Postgres => "serial NOT NULL PRIMARY KEY",
        }
    }

    /// Default expression producing the current timestamp.
    pub fn current_timestamp(&self) -> &'static str {
        match self {
            Self::MySql | Self::Postgres => "CURRENT_TIMESTAMP",
            Self::SqlServer => "(SYSDATETIME())",
        }
    }

    /// Literal for a boolean default value.
    pub fn bool_literal(&self, value: bool) -> &'static str {
        match (self, value) {
            (Self::Postgres, true) => "TRUE",
            (Self::Postgres, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Positional parameter placeholder (1-based).
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::MySql => "?".to_string(),
            Self::SqlServer => format!("@P{}", index),
            Self::Postgres => format!("${}", index),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlserver" | "mssql" | "sqlsrv" | "dblib" => Ok(Self::SqlServer),
            "postgres" | "postgresql" | "pgsql" => Ok(Self::Postgres),
            other => Err(MigrationError::config(format!(
                "Unsupported dialect '{}'",
                other
            ))),
        }
    }
}
