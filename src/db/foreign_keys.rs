use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::dialect::Dialect;
use super::schema::{row_text, value_as_text, Row};

/// Resolved key descriptors of one table, keyed by source column
pub type TableForeignKeys = HashMap<String, ForeignKeyDescriptor>;

/// Resolved key descriptors of every table, keyed by table name
pub type ForeignKeyMap = HashMap<String, TableForeignKeys>;

pub const SOURCE_TABLE: &str = "source_table";
pub const SOURCE_SCHEMA: &str = "source_schema";
pub const SOURCE_COLUMN: &str = "source_column";
pub const TARGET_TABLE: &str = "target_table";
pub const TARGET_SCHEMA: &str = "target_schema";
pub const TARGET_COLUMN: &str = "target_column";

/// Identity of a foreign key, captured from the row that declared it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignSources {
    pub source_table: String,
    pub source_schema: String,
    pub source_column: String,
    pub target_table: String,
    pub target_schema: String,
    pub target_column: String,
}

/// Normalized key facts for one `(table, column)`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ForeignKeyDescriptor {
    /// Every field seen in the raw rows, canonical names, last write wins
    pub fields: Row,
    pub is_foreign_key: bool,
    pub is_unique: bool,
    pub is_primary_key: bool,
    pub is_serial_key: bool,
    pub foreign_sources: Option<ForeignSources>,
}

impl ForeignKeyDescriptor {
    /// Build a descriptor from one raw key row.
    pub fn from_row(dialect: &Dialect, table: &str, database: &str, raw: &Row) -> Self {
        let fields = normalize_row(table, database, raw);

        let source_column = field_text(&fields, SOURCE_COLUMN);
        let target_column = field_text(&fields, TARGET_COLUMN);
        let is_foreign_key = !source_column.trim().is_empty() && !target_column.trim().is_empty();

        let foreign_sources = is_foreign_key.then(|| ForeignSources {
            source_table: field_text(&fields, SOURCE_TABLE),
            source_schema: field_text(&fields, SOURCE_SCHEMA),
            source_column: source_column.trim().to_string(),
            target_table: field_text(&fields, TARGET_TABLE),
            target_schema: field_text(&fields, TARGET_SCHEMA),
            target_column: target_column.trim().to_string(),
        });

        Self {
            is_foreign_key,
            is_unique: dialect.is_unique(&fields),
            is_primary_key: dialect.is_primary_key(&fields),
            is_serial_key: dialect.is_serial_key(&fields),
            foreign_sources,
            fields,
        }
    }

    /// Fold a later descriptor for the same column into this one.
    ///
    /// Fields present in `later` overwrite, fields it lacks are kept. Flags
    /// are only ever set, never cleared, so a flag seen on any row survives.
    pub fn merge(&mut self, later: ForeignKeyDescriptor) {
        for (key, value) in later.fields {
            if let Some(previous) = self.fields.get(&key) {
                if *previous != value {
                    log::debug!(
                        "key row field `{}` changed from {} to {} while merging",
                        key,
                        previous,
                        value
                    );
                }
            }
            self.fields.insert(key, value);
        }
        self.is_foreign_key |= later.is_foreign_key;
        self.is_unique |= later.is_unique;
        self.is_primary_key |= later.is_primary_key;
        self.is_serial_key |= later.is_serial_key;
        if later.foreign_sources.is_some() {
            self.foreign_sources = later.foreign_sources;
        }
    }

    pub fn source_column(&self) -> Option<String> {
        row_text(&self.fields, SOURCE_COLUMN).map(|c| c.trim().to_string())
    }

    pub fn target_table(&self) -> Option<&str> {
        self.foreign_sources.as_ref().map(|s| s.target_table.as_str())
    }

    pub fn target_column(&self) -> Option<&str> {
        self.foreign_sources.as_ref().map(|s| s.target_column.as_str())
    }
}

/// Rename PRAGMA-style keys to canonical names and inject table defaults.
///
/// Defaults go in first so any value carried by the row takes precedence.
pub fn normalize_row(table: &str, database: &str, raw: &Row) -> Row {
    let mut fields = Row::new();
    fields.insert(SOURCE_TABLE.to_string(), table.into());
    fields.insert(SOURCE_SCHEMA.to_string(), database.into());
    fields.insert(TARGET_SCHEMA.to_string(), database.into());

    for (key, value) in raw {
        let canonical = match key.as_str() {
            "from" => SOURCE_COLUMN,
            "to" => TARGET_COLUMN,
            "table" => TARGET_TABLE,
            other => other,
        };
        fields.insert(canonical.to_string(), value.clone());
    }
    fields
}

fn field_text(fields: &Row, key: &str) -> String {
    fields.get(key).map(value_as_text).unwrap_or_default()
}

/// Resolve the raw key rows of one table into per-column descriptors.
pub fn resolve_table(dialect: &Dialect, table: &str, database: &str, rows: &[Row]) -> TableForeignKeys {
    let mut resolved = TableForeignKeys::new();
    for raw in rows {
        let descriptor = ForeignKeyDescriptor::from_row(dialect, table, database, raw);
        let Some(column) = descriptor.source_column().filter(|c| !c.is_empty()) else {
            log::debug!("skipping key row of `{}` without a source column", table);
            continue;
        };
        match resolved.get_mut(&column) {
            Some(existing) => existing.merge(descriptor),
            None => {
                resolved.insert(column, descriptor);
            }
        }
    }
    resolved
}
