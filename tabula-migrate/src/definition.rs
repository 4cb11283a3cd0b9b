//! Parsing of rendered column definition fragments.
//!
//! Fragments produced by the translator (or supplied raw) are split into their
//! native type and modifiers. The result drives dialects whose `ALTER COLUMN`
//! takes the type, nullability and default separately.

use crate::types::FieldCategory;

/// Structured form of a column definition such as `varchar(128) NOT NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Native type including its arguments, e.g. `decimal(10,2)`.
    pub db_type: String,
    /// Declared length of character, binary or integer types.
    pub size: Option<u32>,
    /// Declared numeric precision.
    pub precision: Option<u32>,
    /// Declared numeric scale.
    pub scale: Option<u32>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Default expression as written.
    pub default: Option<String>,
    /// Declared `PRIMARY KEY`.
    pub primary_key: bool,
    /// Auto-incrementing column.
    pub auto_increment: bool,
}

impl ColumnDefinition {
    /// Parse a fragment.
    pub fn parse(fragment: &str) -> Self {
        let tokens = tokenize(fragment);
        let mut def = ColumnDefinition {
            nullable: true,
            ..Default::default()
        };

        let mut i = 0;
        let mut explicit_null = None;

        if let Some(first) = tokens.first() {
            def.db_type = first.clone();
            i = 1;
            // Multi-word native types.
            while let Some(next) = tokens.get(i) {
                let combined = format!("{} {}", base_of(&def.db_type), next.to_ascii_lowercase());
                if MULTI_WORD_TYPES.iter().any(|t| t.starts_with(&combined)) {
                    def.db_type = format!("{} {}", def.db_type, next);
                    i += 1;
                } else {
                    break;
                }
            }
        }

        while i < tokens.len() {
            let upper = tokens[i].to_ascii_uppercase();
            match upper.as_str() {
                "NOT" if upper_at(&tokens, i + 1) == "NULL" => {
                    explicit_null = Some(false);
                    i += 2;
                }
                "NULL" => {
                    explicit_null = Some(true);
                    i += 1;
                }
                "DEFAULT" => {
                    def.default = tokens.get(i + 1).cloned();
                    i += 2;
                }
                // MySQL `ON UPDATE <expr>` is not part of the stored shape.
                "ON" if upper_at(&tokens, i + 1) == "UPDATE" => i += 3,
                "PRIMARY" if upper_at(&tokens, i + 1) == "KEY" => {
                    def.primary_key = true;
                    i += 2;
                }
                "AUTO_INCREMENT" | "AUTOINCREMENT" => {
                    def.auto_increment = true;
                    i += 1;
                }
                _ if upper.starts_with("IDENTITY") => {
                    def.auto_increment = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }

        let base = base_of(&def.db_type);
        if matches!(base.as_str(), "serial" | "bigserial" | "smallserial") {
            def.auto_increment = true;
        }

        def.nullable = explicit_null.unwrap_or(!def.primary_key);

        let args = type_args(&def.db_type);
        match FieldCategory::from_db_type(&def.db_type) {
            FieldCategory::Decimal | FieldCategory::Float => {
                def.precision = args.first().copied();
                def.scale = args.get(1).copied();
            }
            _ => def.size = args.first().copied(),
        }

        def
    }

    /// Type name without arguments, lowercased.
    pub fn base_type(&self) -> String {
        base_of(&self.db_type)
    }

    /// Default with surrounding quotes removed.
    pub fn default_unquoted(&self) -> Option<String> {
        self.default.as_deref().map(unquote)
    }
}

const MULTI_WORD_TYPES: &[&str] = &[
    "double precision",
    "character varying",
    "timestamp without time zone",
    "timestamp with time zone",
    "time without time zone",
    "time with time zone",
];

fn upper_at(tokens: &[String], i: usize) -> String {
    tokens
        .get(i)
        .map(|t| t.to_ascii_uppercase())
        .unwrap_or_default()
}

fn base_of(db_type: &str) -> String {
    let lower = db_type.to_ascii_lowercase();
    match lower.find('(') {
        Some(pos) => lower[..pos].trim().to_string(),
        None => lower.trim().to_string(),
    }
}

fn type_args(db_type: &str) -> Vec<u32> {
    let (Some(open), Some(close)) = (db_type.find('('), db_type.rfind(')')) else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }
    db_type[open + 1..close]
        .split(',')
        .filter_map(|a| a.trim().parse().ok())
        .collect()
}

/// Strip one level of SQL string quoting (`'x'` or `N'x'`).
pub(crate) fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix("N'")
        .or_else(|| value.strip_prefix('\''))
        .and_then(|v| v.strip_suffix('\''));
    match inner {
        Some(inner) => inner.replace("''", "'"),
        None => value.to_string(),
    }
}

/// Insert `CONSTRAINT <name>` ahead of the `DEFAULT` clause of a fragment.
pub(crate) fn name_default(fragment: &str, constraint: &str) -> String {
    let mut tokens = tokenize(fragment);
    let Some(pos) = tokens.iter().position(|t| t.eq_ignore_ascii_case("DEFAULT")) else {
        return fragment.to_string();
    };
    tokens.insert(pos, format!("CONSTRAINT {}", constraint));
    tokens.join(" ")
}

/// Split on whitespace outside quotes and parentheses.
fn tokenize(fragment: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;

    let mut chars = fragment.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                current.push(c);
                if in_quote && chars.peek() == Some(&'\'') {
                    current.push('\'');
                    chars.next();
                } else {
                    in_quote = !in_quote;
                }
            }
            '(' if !in_quote => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && !in_quote && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let def = ColumnDefinition::parse("varchar(128) NOT NULL");
        assert_eq!(def.db_type, "varchar(128)");
        assert_eq!(def.size, Some(128));
        assert!(!def.nullable);
        assert_eq!(def.default, None);
    }

    #[test]
    fn test_parse_decimal() {
        let def = ColumnDefinition::parse("decimal(10,2) NULL DEFAULT 0");
        assert_eq!(def.precision, Some(10));
        assert_eq!(def.scale, Some(2));
        assert_eq!(def.size, None);
        assert!(def.nullable);
        assert_eq!(def.default.as_deref(), Some("0"));
    }

    #[test]
    fn test_parse_quoted_default() {
        let def = ColumnDefinition::parse("varchar(20) NULL DEFAULT 'a b''c'");
        assert_eq!(def.default.as_deref(), Some("'a b''c'"));
        assert_eq!(def.default_unquoted().as_deref(), Some("a b'c"));

        let def = ColumnDefinition::parse("nvarchar(5) NULL DEFAULT N'x'");
        assert_eq!(def.default_unquoted().as_deref(), Some("x"));
    }

    #[test]
    fn test_parse_primary_keys() {
        let def = ColumnDefinition::parse("int NOT NULL AUTO_INCREMENT PRIMARY KEY");
        assert!(def.primary_key && def.auto_increment && !def.nullable);

        let def = ColumnDefinition::parse("int IDENTITY(1,1) NOT NULL PRIMARY KEY");
        assert!(def.primary_key && def.auto_increment);
        assert_eq!(def.db_type, "int");

        let def = ColumnDefinition::parse("serial NOT NULL PRIMARY KEY");
        assert!(def.auto_increment);

        let def = ColumnDefinition::parse("varchar(8) PRIMARY KEY");
        assert!(!def.nullable);
    }

    #[test]
    fn test_parse_on_update() {
        let def = ColumnDefinition::parse(
            "timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP",
        );
        assert_eq!(def.default.as_deref(), Some("CURRENT_TIMESTAMP"));
        assert!(!def.nullable);
        assert_eq!(def.db_type, "timestamp");
    }

    #[test]
    fn test_parse_multi_word_type() {
        let def = ColumnDefinition::parse("double precision NULL");
        assert_eq!(def.db_type, "double precision");
        assert_eq!(FieldCategory::from_db_type(&def.db_type), FieldCategory::Float);

        let def = ColumnDefinition::parse("datetime2 NOT NULL DEFAULT (SYSDATETIME())");
        assert_eq!(def.default.as_deref(), Some("(SYSDATETIME())"));
    }

    #[test]
    fn test_name_default() {
        assert_eq!(
            name_default("int NOT NULL DEFAULT 3", "[DF_w_c]"),
            "int NOT NULL CONSTRAINT [DF_w_c] DEFAULT 3"
        );
        assert_eq!(
            name_default("varchar(20) NULL DEFAULT 'a  b'", "[DF_w_c]"),
            "varchar(20) NULL CONSTRAINT [DF_w_c] DEFAULT 'a  b'"
        );
        assert_eq!(name_default("int NULL", "[DF_w_c]"), "int NULL");
    }

    #[test]
    fn test_parse_enum_with_spaces() {
        let def = ColumnDefinition::parse("enum('a b','c') NOT NULL");
        assert_eq!(def.db_type, "enum('a b','c')");
        assert_eq!(def.base_type(), "enum");
    }
}
