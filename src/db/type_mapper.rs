use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Marker reported for user-defined column types such as PostgreSQL enums
pub const USER_DEFINED: &str = "USER-DEFINED";

/// Engine-neutral column type assigned for model rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SemanticType {
    Boolean,
    Integer {
        length: Option<String>,
        unsigned: bool,
        zerofill: bool,
    },
    BigInt,
    Text { length: Option<String> },
    Char { length: Option<String> },
    Real,
    Float,
    Double,
    Decimal,
    Date,
    Uuid,
    Json,
    Jsonb,
    Geometry,
    Enum(Vec<String>),
    /// No rule matched; the native type is carried through verbatim
    Literal(String),
}

impl SemanticType {
    pub fn is_enum(&self) -> bool {
        matches!(self, SemanticType::Enum(_))
    }
}

/// Double-quoted string literal with `"` and `\\` escaped
pub(crate) fn double_quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn length_suffix(length: &Option<String>) -> String {
    length
        .as_ref()
        .map(|n| format!("({})", n))
        .unwrap_or_default()
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Boolean => write!(f, "BOOLEAN"),
            SemanticType::Integer {
                length,
                unsigned,
                zerofill,
            } => {
                write!(f, "INTEGER{}", length_suffix(length))?;
                if *unsigned {
                    write!(f, ".UNSIGNED")?;
                }
                if *zerofill {
                    write!(f, ".ZEROFILL")?;
                }
                Ok(())
            }
            SemanticType::BigInt => write!(f, "BIGINT"),
            SemanticType::Text { length } => write!(f, "TEXT{}", length_suffix(length)),
            SemanticType::Char { length } => write!(f, "CHAR{}", length_suffix(length)),
            SemanticType::Real => write!(f, "REAL"),
            SemanticType::Float => write!(f, "FLOAT"),
            SemanticType::Double => write!(f, "DOUBLE"),
            SemanticType::Decimal => write!(f, "DECIMAL"),
            SemanticType::Date => write!(f, "DATE"),
            SemanticType::Uuid => write!(f, "UUID"),
            SemanticType::Json => write!(f, "JSON"),
            SemanticType::Jsonb => write!(f, "JSONB"),
            SemanticType::Geometry => write!(f, "GEOMETRY"),
            SemanticType::Enum(values) => {
                let quoted: Vec<String> = values.iter().map(|v| double_quoted(v)).collect();
                write!(f, "ENUM({})", quoted.join(","))
            }
            SemanticType::Literal(native) => write!(f, "{}", native),
        }
    }
}

/// One mapping rule: a pattern tested against the lower-cased native type,
/// and a constructor given the native type and its lower-cased form.
struct TypeRule {
    pattern: Regex,
    map: fn(native: &str, lower: &str) -> SemanticType,
}

impl TypeRule {
    fn new(pattern: &str, map: fn(&str, &str) -> SemanticType) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            map,
        })
    }
}

static LENGTH: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"\((\d+)\)"));

/// Parenthesized length or precision, e.g. `11` in `int(11)`
fn extract_length(native: &str) -> Option<String> {
    LENGTH
        .as_ref()
        .ok()?
        .captures(native)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Rules in priority order; the first match wins. Several patterns overlap
/// (`character varying` would also match `^char`), so order is significant.
static RULES: LazyLock<Result<Vec<TypeRule>, regex::Error>> = LazyLock::new(|| {
    [
        TypeRule::new(r"^(boolean|bit\(1\)|bit)$", |_, _| SemanticType::Boolean),
        TypeRule::new(r"^(smallint|mediumint|tinyint|int)", |native, lower| {
            SemanticType::Integer {
                length: extract_length(native),
                unsigned: lower.contains("unsigned"),
                zerofill: lower.contains("zerofill"),
            }
        }),
        TypeRule::new(r"^bigint", |_, _| SemanticType::BigInt),
        TypeRule::new(r"^varchar", |native, _| SemanticType::Text {
            length: extract_length(native),
        }),
        TypeRule::new(r"^string|varying|nvarchar", |_, _| SemanticType::Text { length: None }),
        TypeRule::new(r"^char", |native, _| SemanticType::Char {
            length: extract_length(native),
        }),
        TypeRule::new(r"^real", |_, _| SemanticType::Real),
        TypeRule::new(r"text|ntext$", |_, _| SemanticType::Text { length: None }),
        TypeRule::new(r"^(date|time)", |_, _| SemanticType::Date),
        TypeRule::new(r"^(float|float4)", |_, _| SemanticType::Float),
        TypeRule::new(r"^decimal", |_, _| SemanticType::Decimal),
        TypeRule::new(r"^(float8|double precision|numeric)", |_, _| SemanticType::Double),
        TypeRule::new(r"^uuid|uniqueidentifier", |_, _| SemanticType::Uuid),
        // jsonb first: `^json` would otherwise claim it
        TypeRule::new(r"^jsonb", |_, _| SemanticType::Jsonb),
        TypeRule::new(r"^json", |_, _| SemanticType::Json),
        TypeRule::new(r"^geometry", |_, _| SemanticType::Geometry),
    ]
    .into_iter()
    .collect()
});

/// Map a native column type to its semantic type.
///
/// A user-defined type with enum labels becomes an `Enum` ahead of every
/// other rule. A type no rule recognises is returned as a `Literal`.
pub fn map_type(native_type: &str, enum_values: Option<&[String]>) -> SemanticType {
    if native_type == USER_DEFINED {
        if let Some(values) = enum_values.filter(|v| !v.is_empty()) {
            return SemanticType::Enum(values.to_vec());
        }
    }

    let rules: &[TypeRule] = match RULES.as_ref() {
        Ok(rules) => rules.as_slice(),
        Err(e) => {
            log::error!("type rules failed to compile: {}", e);
            &[]
        }
    };

    let lower = native_type.to_lowercase();
    for rule in rules {
        if rule.pattern.is_match(&lower) {
            return (rule.map)(native_type, &lower);
        }
    }

    log::debug!("no type rule for `{}`, passing it through", native_type);
    SemanticType::Literal(native_type.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(length: Option<&str>, unsigned: bool, zerofill: bool) -> SemanticType {
        SemanticType::Integer {
            length: length.map(str::to_string),
            unsigned,
            zerofill,
        }
    }

    #[test]
    fn test_boolean_family() {
        assert_eq!(map_type("boolean", None), SemanticType::Boolean);
        assert_eq!(map_type("BIT(1)", None), SemanticType::Boolean);
        assert_eq!(map_type("bit", None), SemanticType::Boolean);
        // bit(8) is no boolean and no other rule claims it
        assert_eq!(map_type("bit(8)", None), SemanticType::Literal("bit(8)".into()));
    }

    #[test]
    fn test_integer_modifiers() {
        assert_eq!(map_type("int(11)", None), int(Some("11"), false, false));
        assert_eq!(map_type("int(10) unsigned", None), int(Some("10"), true, false));
        assert_eq!(
            map_type("INT(5) UNSIGNED ZEROFILL", None),
            int(Some("5"), true, true)
        );
        assert_eq!(map_type("smallint", None), int(None, false, false));
        assert_eq!(map_type("integer", None), int(None, false, false));
        assert_eq!(map_type("tinyint(1)", None), int(Some("1"), false, false));
    }

    #[test]
    fn test_bigint_is_not_an_integer() {
        assert_eq!(map_type("bigint(20)", None), SemanticType::BigInt);
        assert_eq!(map_type("bigint unsigned", None), SemanticType::BigInt);
    }

    #[test]
    fn test_string_family_priority() {
        assert_eq!(
            map_type("varchar(255)", None),
            SemanticType::Text { length: Some("255".into()) }
        );
        // matched by `varying` before `^char` could see it
        assert_eq!(
            map_type("character varying(64)", None),
            SemanticType::Text { length: None }
        );
        assert_eq!(map_type("nvarchar(max)", None), SemanticType::Text { length: None });
        assert_eq!(
            map_type("char(2)", None),
            SemanticType::Char { length: Some("2".into()) }
        );
        assert_eq!(map_type("character", None), SemanticType::Char { length: None });
        assert_eq!(map_type("mediumtext", None), SemanticType::Text { length: None });
        assert_eq!(map_type("ntext", None), SemanticType::Text { length: None });
    }

    #[test]
    fn test_numeric_and_temporal() {
        assert_eq!(map_type("real", None), SemanticType::Real);
        assert_eq!(map_type("date", None), SemanticType::Date);
        assert_eq!(map_type("datetime", None), SemanticType::Date);
        assert_eq!(map_type("timestamp with time zone", None), SemanticType::Date);
        assert_eq!(map_type("time", None), SemanticType::Date);
        assert_eq!(map_type("float", None), SemanticType::Float);
        // `^float` wins before the double rule gets a chance
        assert_eq!(map_type("float8", None), SemanticType::Float);
        assert_eq!(map_type("decimal(10,2)", None), SemanticType::Decimal);
        assert_eq!(map_type("double precision", None), SemanticType::Double);
        assert_eq!(map_type("numeric", None), SemanticType::Double);
    }

    #[test]
    fn test_identifiers_documents_and_shapes() {
        assert_eq!(map_type("uuid", None), SemanticType::Uuid);
        assert_eq!(map_type("uniqueidentifier", None), SemanticType::Uuid);
        assert_eq!(map_type("json", None), SemanticType::Json);
        assert_eq!(map_type("jsonb", None), SemanticType::Jsonb);
        assert_eq!(map_type("geometry", None), SemanticType::Geometry);
    }

    #[test]
    fn test_unknown_type_passes_through() {
        assert_eq!(map_type("xmltype", None), SemanticType::Literal("xmltype".into()));
        assert_eq!(map_type("XMLTYPE", None).to_string(), "XMLTYPE");
    }

    #[test]
    fn test_user_defined_enum_wins() {
        let labels = vec!["draft".to_string(), "sent".to_string()];
        let mapped = map_type(USER_DEFINED, Some(labels.as_slice()));
        assert!(mapped.is_enum());
        assert_eq!(mapped.to_string(), "ENUM(\"draft\",\"sent\")");
    }

    #[test]
    fn test_enum_labels_are_escaped() {
        let labels = vec!["say \"hi\"".to_string(), "back\\slash".to_string()];
        assert_eq!(
            SemanticType::Enum(labels).to_string(),
            r#"ENUM("say \"hi\"","back\\slash")"#
        );
    }

    #[test]
    fn test_rules_compile() {
        assert!(RULES.as_ref().is_ok());
        assert!(LENGTH.as_ref().is_ok());
    }

    #[test]
    fn test_user_defined_without_labels_is_literal() {
        assert_eq!(
            map_type(USER_DEFINED, None),
            SemanticType::Literal(USER_DEFINED.into())
        );
        assert_eq!(
            map_type(USER_DEFINED, Some(&[][..])),
            SemanticType::Literal(USER_DEFINED.into())
        );
    }

    #[test]
    fn test_display_tokens() {
        assert_eq!(map_type("int(10) unsigned zerofill", None).to_string(), "INTEGER(10).UNSIGNED.ZEROFILL");
        assert_eq!(map_type("varchar(32)", None).to_string(), "TEXT(32)");
        assert_eq!(map_type("char(3)", None).to_string(), "CHAR(3)");
        assert_eq!(map_type("bigint", None).to_string(), "BIGINT");
    }
}
