use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::connectors::ConnectionConfig;

/// Column names treated as managed timestamps. `None` disables a name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimestampFields {
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl Default for TimestampFields {
    fn default() -> Self {
        Self {
            created_at: Some("createdAt".to_string()),
            updated_at: Some("updatedAt".to_string()),
            deleted_at: Some("deletedAt".to_string()),
        }
    }
}

impl TimestampFields {
    /// True when `name` is any of the configured timestamp columns.
    pub fn contains(&self, name: &str) -> bool {
        [&self.created_at, &self.updated_at, &self.deleted_at]
            .into_iter()
            .any(|field| field.as_deref() == Some(name))
    }

    /// True when `name` is the creation or update column, whose default
    /// is forced to the current timestamp.
    pub fn is_touch_column(&self, name: &str) -> bool {
        [&self.created_at, &self.updated_at]
            .into_iter()
            .any(|field| field.as_deref() == Some(name))
    }
}

/// Options that shape the synthesized models. Fixed for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationOptions {
    pub schema: Option<String>,
    pub camel_case: bool,
    /// Drop timestamp columns from the attribute list
    pub timestamps: bool,
    pub timestamp_fields: TimestampFields,
    /// Only these tables, when given
    pub tables: Option<Vec<String>>,
    pub skip_tables: Vec<String>,
    /// Upper bound on tables introspected at once
    pub max_concurrency: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            schema: None,
            camel_case: false,
            timestamps: false,
            timestamp_fields: TimestampFields::default(),
            tables: None,
            skip_tables: Vec::new(),
            max_concurrency: 8,
        }
    }
}

impl GenerationOptions {
    /// Apply the include list, or failing that the exclude list, keeping
    /// discovery order.
    pub fn select_tables(&self, discovered: Vec<String>) -> Vec<String> {
        match &self.tables {
            Some(include) => discovered
                .into_iter()
                .filter(|t| include.contains(t))
                .collect(),
            None => discovered
                .into_iter()
                .filter(|t| !self.skip_tables.contains(t))
                .collect(),
        }
    }
}

/// Options for the text renderer and file writer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputOptions {
    pub directory: PathBuf,
    pub indentation: usize,
    /// Indent with spaces instead of tabs
    pub spaces: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./models"),
            indentation: 1,
            spaces: false,
        }
    }
}

impl OutputOptions {
    /// One level of indentation
    pub fn indent_unit(&self) -> String {
        let unit = if self.spaces { " " } else { "\t" };
        unit.repeat(self.indentation)
    }
}

/// Everything a generation run needs, as loaded from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub connection: ConnectionConfig,
    pub generation: GenerationOptions,
    pub output: OutputOptions,
}

impl GeneratorConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}
