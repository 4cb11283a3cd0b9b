//! Translation of abstract field descriptors into dialect column definitions.
//!
//! The translator is pure: the same descriptor and dialect always produce the
//! same fragment, and out-of-range lengths or numeric limits are rejected
//! before any statement reaches the database.
//!
//! ```rust
//! use tabula_migrate::{Dialect, FieldDescriptor, TypeTranslator};
//!
//! let translator = TypeTranslator::new(Dialect::SqlServer);
//! let field = FieldDescriptor::new("notes", "string").length(9000);
//! assert_eq!(translator.translate(&field).unwrap(), "varchar(max) NULL");
//! ```

use serde_json::Value;

use crate::descriptor::FieldDescriptor;
use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::types::{AbstractType, IntKind};

/// Length used for character types when the descriptor has none.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Translate a field for a dialect with default settings.
pub fn translate(field: &FieldDescriptor, dialect: Dialect) -> MigrateResult<String> {
    TypeTranslator::new(dialect).translate(field)
}

/// Maps abstract field descriptors to column definition fragments.
#[derive(Debug, Clone, Copy)]
pub struct TypeTranslator {
    dialect: Dialect,
    default_string_length: u32,
}

impl TypeTranslator {
    /// Create a translator for a dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            default_string_length: DEFAULT_STRING_LENGTH,
        }
    }

    /// Override the length used for unsized character types.
    pub fn with_default_string_length(mut self, length: u32) -> Self {
        self.default_string_length = length;
        self
    }

    /// The target dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Produce the column definition for a field.
    pub fn translate(&self, field: &FieldDescriptor) -> MigrateResult<String> {
        if let Some(sql) = field.sql.as_deref().filter(|s| !s.trim().is_empty()) {
            return Ok(sql.to_string());
        }

        let ty = AbstractType::parse(&field.field_type).ok_or_else(|| {
            MigrationError::bad_request(format!(
                "Invalid schema detected - no type or sql for field '{}'",
                field.name
            ))
        })?;
        self.translate_type(field, &ty)
    }

    /// Produce the column definition for a field whose type is already parsed.
    pub fn translate_type(&self, field: &FieldDescriptor, ty: &AbstractType) -> MigrateResult<String> {
        if *ty == AbstractType::Id {
            return Ok(self.dialect.auto_increment_pk().to_string());
        }

        let mut definition = self.base_type(field, ty)?;

        let allow_null = field
            .allow_null
            .unwrap_or(!(ty.forces_not_null() || field.is_primary_key));
        definition.push_str(if allow_null { " NULL" } else { " NOT NULL" });

        match field.default.as_ref().and_then(|v| self.render_default(v, ty)) {
            Some(default) => {
                definition.push_str(" DEFAULT ");
                definition.push_str(&default);
            }
            None => {
                if matches!(
                    ty,
                    AbstractType::TimestampOnCreate | AbstractType::TimestampOnUpdate
                ) {
                    definition.push_str(" DEFAULT ");
                    definition.push_str(self.dialect.current_timestamp());
                }
            }
        }

        if *ty == AbstractType::TimestampOnUpdate && self.dialect == Dialect::MySql {
            definition.push_str(" ON UPDATE CURRENT_TIMESTAMP");
        }

        if field.is_primary_key {
            definition.push_str(" PRIMARY KEY");
        }

        Ok(definition)
    }

    fn base_type(&self, field: &FieldDescriptor, ty: &AbstractType) -> MigrateResult<String> {
        let d = self.dialect;
        let native = |mysql: &str, sqlsrv: &str, pg: &str| -> String {
            match d {
                Dialect::MySql => mysql,
                Dialect::SqlServer => sqlsrv,
                Dialect::Postgres => pg,
            }
            .to_string()
        };

        let sql = match ty {
            AbstractType::Id => d.auto_increment_pk().to_string(),
            AbstractType::Integer(kind) => self.integer(*kind, field.length),
            AbstractType::Boolean => native("tinyint(1)", "bit", "boolean"),
            AbstractType::Decimal => self.decimal(field)?,
            AbstractType::Float | AbstractType::Double => self.float(field, ty)?,
            AbstractType::Money => match d {
                Dialect::SqlServer => "money".to_string(),
                _ => "decimal(19,4)".to_string(),
            },
            AbstractType::SmallMoney => match d {
                Dialect::SqlServer => "smallmoney".to_string(),
                _ => "decimal(10,4)".to_string(),
            },
            AbstractType::String => {
                self.character(field, field.fixed_length, field.supports_multibyte)?
            }
            AbstractType::Char => self.character(field, true, field.supports_multibyte)?,
            AbstractType::Varchar => self.character(field, false, field.supports_multibyte)?,
            AbstractType::NChar => self.character(field, true, true)?,
            AbstractType::NVarchar => self.character(field, false, true)?,
            AbstractType::Text => match d {
                Dialect::MySql => "text".to_string(),
                Dialect::SqlServer if field.supports_multibyte => "nvarchar(max)".to_string(),
                Dialect::SqlServer => "varchar(max)".to_string(),
                Dialect::Postgres => "text".to_string(),
            },
            AbstractType::Binary => {
                if field.fixed_length {
                    self.binary(field, true)?
                } else if field.length.is_some() {
                    self.binary(field, false)?
                } else {
                    native("blob", "varbinary(max)", "bytea")
                }
            }
            AbstractType::VarBinary => self.binary(field, false)?,
            AbstractType::DateTime => native("datetime", "datetime2", "timestamp"),
            AbstractType::Date => "date".to_string(),
            AbstractType::Time => "time".to_string(),
            AbstractType::Timestamp
            | AbstractType::TimestampOnCreate
            | AbstractType::TimestampOnUpdate => native("timestamp", "datetime2", "timestamp"),
            AbstractType::Reference
            | AbstractType::UserId
            | AbstractType::UserIdOnCreate
            | AbstractType::UserIdOnUpdate => native("int", "int", "integer"),
            AbstractType::Native(name) => match field.length {
                Some(len) if len > 0 && !name.contains('(') => format!("{}({})", name, len),
                _ => name.clone(),
            },
        };
        Ok(sql)
    }

    fn integer(&self, kind: IntKind, length: Option<u32>) -> String {
        match self.dialect {
            Dialect::MySql => kind.name().to_string(),
            Dialect::SqlServer => {
                let name = match kind {
                    IntKind::MediumInt => "int",
                    other => other.name(),
                };
                match length {
                    Some(len) if len > 0 && len <= 255 => format!("{}({})", name, len),
                    _ => name.to_string(),
                }
            }
            Dialect::Postgres => match kind {
                IntKind::TinyInt | IntKind::SmallInt => "smallint",
                IntKind::MediumInt | IntKind::Int => "integer",
                IntKind::BigInt => "bigint",
            }
            .to_string(),
        }
    }

    fn decimal(&self, field: &FieldDescriptor) -> MigrateResult<String> {
        let limits = self.dialect.limits();
        let default_precision = if self.dialect.is_sql_server() { 18 } else { 10 };

        let precision = field.precision.or(field.length).filter(|p| *p > 0);
        let scale = field.scale;
        let precision = match (precision, scale) {
            (None, Some(_)) => Some(default_precision),
            (p, _) => p,
        };

        self.check_numeric(
            &field.name,
            precision,
            scale,
            limits.decimal_precision,
            limits.decimal_scale,
        )?;

        Ok(match (precision, scale) {
            (Some(p), Some(s)) => format!("decimal({},{})", p, s),
            (Some(p), None) => format!("decimal({})", p),
            _ => "decimal".to_string(),
        })
    }

    fn float(&self, field: &FieldDescriptor, ty: &AbstractType) -> MigrateResult<String> {
        let limits = self.dialect.limits();
        let precision = field.precision.or(field.length).filter(|p| *p > 0);
        let scale = field.scale;

        self.check_numeric(
            &field.name,
            precision,
            scale,
            limits.float_precision,
            limits.float_scale,
        )?;

        let double = *ty == AbstractType::Double;
        Ok(match self.dialect {
            Dialect::MySql => {
                let name = if double { "double" } else { "float" };
                match (precision, scale) {
                    (Some(p), Some(s)) => format!("{}({},{})", name, p, s),
                    (Some(p), None) if !double => format!("{}({})", name, p),
                    _ => name.to_string(),
                }
            }
            // float(n) takes no scale; it is still range checked above.
            Dialect::SqlServer => match precision {
                Some(p) => format!("float({})", p),
                None if double => "float(53)".to_string(),
                None => "float".to_string(),
            },
            Dialect::Postgres => match precision {
                Some(p) => format!("float({})", p),
                None if double => "double precision".to_string(),
                None => "real".to_string(),
            },
        })
    }

    fn check_numeric(
        &self,
        field: &str,
        precision: Option<u32>,
        scale: Option<u32>,
        max_precision: u32,
        max_scale: u32,
    ) -> MigrateResult<()> {
        if let Some(p) = precision.filter(|p| *p > max_precision) {
            return Err(MigrationError::bad_request(format!(
                "Decimal precision '{}' is out of range for field '{}' ({} allows at most {})",
                p, field, self.dialect, max_precision
            )));
        }

        if let Some(s) = scale {
            if s > max_scale {
                return Err(MigrationError::bad_request(format!(
                    "Decimal scale '{}' is out of range for field '{}' ({} allows at most {})",
                    s, field, self.dialect, max_scale
                )));
            }
            if let Some(p) = precision.filter(|p| s > *p) {
                return Err(MigrationError::bad_request(format!(
                    "Decimal scale '{}' is greater than precision '{}' for field '{}'",
                    s, p, field
                )));
            }
        }

        Ok(())
    }

    fn character(&self, field: &FieldDescriptor, fixed: bool, national: bool) -> MigrateResult<String> {
        let limits = self.dialect.limits();
        let length = field
            .length
            .filter(|l| *l > 0)
            .unwrap_or(self.default_string_length);
        // PostgreSQL stores every character type as UTF-8.
        let national = national && self.dialect != Dialect::Postgres;

        if fixed {
            let name = if national { "nchar" } else { "char" };
            if length > limits.char_max {
                return Err(self.length_error(&field.name, name, length, limits.char_max));
            }
            return Ok(format!("{}({})", name, length));
        }

        let name = if national { "nvarchar" } else { "varchar" };
        let promote = if national {
            limits.nvarchar_promote
        } else {
            limits.varchar_promote
        };

        match promote {
            Some(threshold) if length > threshold => Ok(format!("{}(max)", name)),
            _ if length > limits.varchar_max => {
                Err(self.length_error(&field.name, name, length, limits.varchar_max))
            }
            _ => Ok(format!("{}({})", name, length)),
        }
    }

    fn binary(&self, field: &FieldDescriptor, fixed: bool) -> MigrateResult<String> {
        if self.dialect == Dialect::Postgres {
            return Ok("bytea".to_string());
        }

        let limits = self.dialect.limits();
        let length = field
            .length
            .filter(|l| *l > 0)
            .unwrap_or(self.default_string_length);

        if fixed {
            if length > limits.char_max {
                return Err(self.length_error(&field.name, "binary", length, limits.char_max));
            }
            return Ok(format!("binary({})", length));
        }

        match limits.varchar_promote {
            Some(threshold) if length > threshold => Ok("varbinary(max)".to_string()),
            _ if length > limits.varchar_max => {
                Err(self.length_error(&field.name, "varbinary", length, limits.varchar_max))
            }
            _ => Ok(format!("varbinary({})", length)),
        }
    }

    fn length_error(&self, field: &str, ty: &str, length: u32, max: u32) -> MigrationError {
        MigrationError::bad_request(format!(
            "Length '{}' for {} field '{}' exceeds the {} maximum of {}",
            length, ty, field, self.dialect, max
        ))
    }

    fn render_default(&self, value: &Value, ty: &AbstractType) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) if s.eq_ignore_ascii_case("null") => None,
            Value::String(s) if ty.is_text_like() => Some(self.quote_literal(s, ty)),
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(self.dialect.bool_literal(*b).to_string()),
            other => Some(self.quote_literal(&other.to_string(), ty)),
        }
    }

    fn quote_literal(&self, s: &str, ty: &AbstractType) -> String {
        let escaped = s.replace('\'', "''");
        let national = self.dialect.is_sql_server()
            && matches!(ty, AbstractType::NChar | AbstractType::NVarchar);
        if national {
            format!("N'{}'", escaped)
        } else {
            format!("'{}'", escaped)
        }
    }
}
