//! Abstract field types and the categories re-inferred from native types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    /// 8-bit.
    TinyInt,
    /// 16-bit.
    SmallInt,
    /// 24-bit (MySQL only).
    MediumInt,
    /// 32-bit.
    Int,
    /// 64-bit.
    BigInt,
}

impl IntKind {
    /// MySQL spelling of the type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::MediumInt => "mediumint",
            Self::Int => "int",
            Self::BigInt => "bigint",
        }
    }
}

/// Abstract type named by a field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbstractType {
    /// Auto-incrementing primary key (`id` or `pk`).
    Id,
    /// Character data; storage chosen from `fixed_length`/`supports_multibyte`.
    String,
    /// Fixed length characters.
    Char,
    /// Variable length characters.
    Varchar,
    /// Fixed length national characters.
    NChar,
    /// Variable length national characters.
    NVarchar,
    /// Unbounded text.
    Text,
    /// Binary data; a blob unless sized.
    Binary,
    /// Variable length binary.
    VarBinary,
    /// Boolean flag.
    Boolean,
    /// Integer family.
    Integer(IntKind),
    /// Exact numeric (`decimal`, `numeric`, `number`, `percent`).
    Decimal,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Currency amount.
    Money,
    /// Small currency amount.
    SmallMoney,
    /// Date and time.
    DateTime,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Timestamp.
    Timestamp,
    /// Timestamp set when the row is created.
    TimestampOnCreate,
    /// Timestamp refreshed whenever the row changes.
    TimestampOnUpdate,
    /// Reference to the system user table.
    UserId,
    /// Creating user.
    UserIdOnCreate,
    /// Last modifying user.
    UserIdOnUpdate,
    /// Foreign key to another table.
    Reference,
    /// Unrecognised name, passed to the database as is.
    Native(String),
}

impl AbstractType {
    /// Parse a descriptor type name. Returns `None` for an empty name.
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }

        let ty = match trimmed.to_ascii_lowercase().as_str() {
            "id" | "pk" => Self::Id,
            "string" => Self::String,
            "char" => Self::Char,
            "varchar" => Self::Varchar,
            "nchar" => Self::NChar,
            "nvarchar" => Self::NVarchar,
            "text" => Self::Text,
            "binary" | "blob" => Self::Binary,
            "varbinary" => Self::VarBinary,
            "boolean" | "bool" => Self::Boolean,
            "tinyint" => Self::Integer(IntKind::TinyInt),
            "smallint" => Self::Integer(IntKind::SmallInt),
            "mediumint" => Self::Integer(IntKind::MediumInt),
            "int" | "integer" => Self::Integer(IntKind::Int),
            "bigint" => Self::Integer(IntKind::BigInt),
            "decimal" | "numeric" | "number" | "percent" => Self::Decimal,
            "float" | "real" => Self::Float,
            "double" => Self::Double,
            "money" => Self::Money,
            "smallmoney" => Self::SmallMoney,
            "datetime" => Self::DateTime,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" => Self::Timestamp,
            "timestamp_on_create" => Self::TimestampOnCreate,
            "timestamp_on_update" => Self::TimestampOnUpdate,
            "user_id" => Self::UserId,
            "user_id_on_create" => Self::UserIdOnCreate,
            "user_id_on_update" => Self::UserIdOnUpdate,
            "reference" => Self::Reference,
            _ => Self::Native(trimmed.to_string()),
        };
        Some(ty)
    }

    /// Whether the type is quoted when used as a default value.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Char | Self::Varchar | Self::NChar | Self::NVarchar | Self::Text
        )
    }

    /// Whether the type references the system user table.
    pub fn is_user_id(&self) -> bool {
        matches!(
            self,
            Self::UserId | Self::UserIdOnCreate | Self::UserIdOnUpdate
        )
    }

    /// Whether the type is NOT NULL unless the descriptor says otherwise.
    pub fn forces_not_null(&self) -> bool {
        matches!(
            self,
            Self::Id | Self::TimestampOnCreate | Self::TimestampOnUpdate
        ) || self.is_user_id()
    }

    /// Category a describe call reports for columns of this type.
    pub fn category(&self) -> FieldCategory {
        match self {
            Self::Id
            | Self::Integer(_)
            | Self::Reference
            | Self::UserId
            | Self::UserIdOnCreate
            | Self::UserIdOnUpdate => FieldCategory::Integer,
            Self::String | Self::Char | Self::Varchar | Self::NChar | Self::NVarchar => {
                FieldCategory::String
            }
            Self::Text => FieldCategory::Text,
            Self::Binary | Self::VarBinary => FieldCategory::Binary,
            Self::Boolean => FieldCategory::Boolean,
            Self::Decimal => FieldCategory::Decimal,
            Self::Float | Self::Double => FieldCategory::Float,
            Self::Money | Self::SmallMoney => FieldCategory::Money,
            Self::DateTime
            | Self::Timestamp
            | Self::TimestampOnCreate
            | Self::TimestampOnUpdate => FieldCategory::DateTime,
            Self::Date => FieldCategory::Date,
            Self::Time => FieldCategory::Time,
            Self::Native(name) => FieldCategory::from_db_type(name),
        }
    }
}

/// Coarse category of a column, as re-inferred from its native type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldCategory {
    /// Integer numbers.
    Integer,
    /// Exact decimals.
    Decimal,
    /// Floating point numbers.
    Float,
    /// Currency.
    Money,
    /// Bounded character data.
    String,
    /// Unbounded character data.
    Text,
    /// Binary data.
    Binary,
    /// Booleans.
    Boolean,
    /// Date and time.
    DateTime,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Anything else.
    Other,
}

impl FieldCategory {
    /// Infer the category from a native type such as `varchar(128)`.
    pub fn from_db_type(db_type: &str) -> Self {
        let lower = db_type.trim().to_ascii_lowercase();
        let (base, args) = match lower.find('(') {
            Some(pos) => (lower[..pos].trim(), lower[pos..].trim()),
            None => (lower.as_str(), ""),
        };

        match base {
            "tinyint" if args == "(1)" => Self::Boolean,
            "bit" | "boolean" | "bool" => Self::Boolean,
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "serial"
            | "bigserial" | "smallserial" | "int2" | "int4" | "int8" => Self::Integer,
            "decimal" | "numeric" => Self::Decimal,
            "float" | "double" | "real" | "double precision" | "float4" | "float8" => Self::Float,
            "money" | "smallmoney" => Self::Money,
            "char" | "varchar" | "nchar" | "nvarchar" | "character" | "character varying" => {
                if args == "(max)" {
                    Self::Text
                } else {
                    Self::String
                }
            }
            "text" | "ntext" | "tinytext" | "mediumtext" | "longtext" => Self::Text,
            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "bytea"
            | "image" => Self::Binary,
            "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" | "timestamp"
            | "timestamptz" | "timestamp without time zone" | "timestamp with time zone" => {
                Self::DateTime
            }
            "date" => Self::Date,
            "time" => Self::Time,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Money => "money",
            Self::String => "string",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(AbstractType::parse("PK"), Some(AbstractType::Id));
        assert_eq!(AbstractType::parse("percent"), Some(AbstractType::Decimal));
        assert_eq!(
            AbstractType::parse("integer"),
            Some(AbstractType::Integer(IntKind::Int))
        );
        assert_eq!(AbstractType::parse("  "), None);
        assert_eq!(
            AbstractType::parse("geometry"),
            Some(AbstractType::Native("geometry".into()))
        );
    }

    #[test]
    fn test_forces_not_null() {
        assert!(AbstractType::TimestampOnCreate.forces_not_null());
        assert!(AbstractType::UserIdOnUpdate.forces_not_null());
        assert!(!AbstractType::Reference.forces_not_null());
    }

    #[test]
    fn test_category_from_db_type() {
        assert_eq!(FieldCategory::from_db_type("tinyint(1)"), FieldCategory::Boolean);
        assert_eq!(FieldCategory::from_db_type("tinyint"), FieldCategory::Integer);
        assert_eq!(FieldCategory::from_db_type("bit"), FieldCategory::Boolean);
        assert_eq!(FieldCategory::from_db_type("varchar(128)"), FieldCategory::String);
        assert_eq!(FieldCategory::from_db_type("varchar(max)"), FieldCategory::Text);
        assert_eq!(FieldCategory::from_db_type("datetime2"), FieldCategory::DateTime);
        assert_eq!(FieldCategory::from_db_type("serial"), FieldCategory::Integer);
        assert_eq!(FieldCategory::from_db_type("double precision"), FieldCategory::Float);
        assert_eq!(FieldCategory::from_db_type("geometry"), FieldCategory::Other);
    }
}
