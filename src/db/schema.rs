use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Represents a database row as a map of column names to JSON values
pub type Row = std::collections::HashMap<String, serde_json::Value>;

/// Columns of one table keyed by column name, in introspection order
pub type ColumnMap = IndexMap<String, RawColumnMetadata>;

/// Column metadata as reported by the introspection layer, before synthesis
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawColumnMetadata {
    /// Native type string, e.g. `int(11) unsigned` or `character varying(255)`
    #[serde(rename = "type")]
    pub type_name: String,
    pub allow_null: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
    /// Enumeration labels when `type_name` is a user-defined enum
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special: Vec<String>,
}

impl RawColumnMetadata {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            allow_null: true,
            ..Default::default()
        }
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_special(mut self, labels: Vec<String>) -> Self {
        self.special = labels;
        self
    }
}

/// Render a raw JSON cell as text. `null` becomes the empty string.
pub fn value_as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Look up a field in a raw row and render it as text.
pub fn row_text(row: &Row, key: &str) -> Option<String> {
    row.get(key).map(value_as_text)
}
