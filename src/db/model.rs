use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::foreign_keys::{ForeignKeyDescriptor, ForeignKeyMap, TableForeignKeys};
use super::naming::camel_case;
use super::schema::{ColumnMap, RawColumnMetadata};
use super::type_mapper::{map_type, SemanticType};
use crate::config::GenerationOptions;

/// Default expression forced onto creation/update timestamp columns
pub const CURRENT_TIMESTAMP: &str = "NOW()";

/// Column that is never emitted as an attribute
pub const IMPLICIT_ID: &str = "id";

/// Target of a foreign key as the model refers to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub model: String,
    pub key: String,
}

/// Synthesized attributes of one column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnModel {
    pub name: String,
    pub rendered_name: String,
    pub semantic_type: SemanticType,
    /// `None` for creation/update timestamps, which never carry the flag
    pub allow_null: Option<bool>,
    pub primary_key: bool,
    pub unique: bool,
    pub auto_increment: bool,
    pub reference: Option<Reference>,
    pub default_value: Option<String>,
    /// Original column name, present when renaming changed it
    pub field: Option<String>,
}

/// A single emitted attribute, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute<'a> {
    AutoIncrement,
    References(&'a Reference),
    PrimaryKey,
    AllowNull(bool),
    DefaultValue(&'a str),
    Type(&'a SemanticType),
    Unique,
    Field(&'a str),
}

impl ColumnModel {
    /// Attributes this column emits, in the order a renderer writes them.
    pub fn attributes(&self) -> Vec<Attribute<'_>> {
        let mut attrs = Vec::new();
        if self.auto_increment {
            attrs.push(Attribute::AutoIncrement);
        }
        if let Some(reference) = &self.reference {
            attrs.push(Attribute::References(reference));
        }
        if self.primary_key {
            attrs.push(Attribute::PrimaryKey);
        }
        if let Some(allow_null) = self.allow_null {
            attrs.push(Attribute::AllowNull(allow_null));
        }
        if let Some(default) = &self.default_value {
            attrs.push(Attribute::DefaultValue(default));
        }
        attrs.push(Attribute::Type(&self.semantic_type));
        if self.unique {
            attrs.push(Attribute::Unique);
        }
        if let Some(field) = &self.field {
            attrs.push(Attribute::Field(field));
        }
        attrs
    }
}

/// Table-level options carried alongside the attributes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    pub schema: Option<String>,
    pub table_name: String,
    pub timestamps: bool,
}

/// Ordered, render-ready model of one table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableModel {
    /// Rendered identifier of the model
    pub name: String,
    pub columns: Vec<ColumnModel>,
    pub options: TableOptions,
}

fn render_name(name: &str, options: &GenerationOptions) -> String {
    if options.camel_case {
        camel_case(name)
    } else {
        name.to_string()
    }
}

/// True when the column is left out of the attribute list entirely.
pub fn is_excluded(column: &str, options: &GenerationOptions) -> bool {
    column == IMPLICIT_ID || (options.timestamps && options.timestamp_fields.contains(column))
}

/// Synthesize one column from its raw metadata and key descriptor.
pub fn synthesize_column(
    name: &str,
    raw: &RawColumnMetadata,
    foreign_key: Option<&ForeignKeyDescriptor>,
    options: &GenerationOptions,
) -> ColumnModel {
    let rendered_name = render_name(name, options);
    let is_touch_column = options.timestamp_fields.is_touch_column(&rendered_name);

    let auto_increment = foreign_key.is_some_and(|fk| fk.is_serial_key);

    let reference = foreign_key
        .filter(|fk| fk.is_foreign_key && !fk.is_serial_key)
        .and_then(|fk| fk.foreign_sources.as_ref())
        .map(|sources| Reference {
            model: sources.target_table.clone(),
            key: sources.target_column.clone(),
        });

    let primary_key = raw.primary_key && foreign_key.map_or(true, |fk| fk.is_primary_key);

    let special = (!raw.special.is_empty()).then_some(raw.special.as_slice());

    ColumnModel {
        name: name.to_string(),
        semantic_type: map_type(&raw.type_name, special),
        allow_null: (!is_touch_column).then_some(raw.allow_null),
        primary_key,
        unique: foreign_key.is_some_and(|fk| fk.is_unique),
        auto_increment,
        reference,
        default_value: is_touch_column.then(|| CURRENT_TIMESTAMP.to_string()),
        field: (rendered_name != name).then(|| name.to_string()),
        rendered_name,
    }
}

/// Synthesize the model of one table. Columns keep introspection order.
pub fn synthesize_table(
    table: &str,
    columns: &ColumnMap,
    foreign_keys: Option<&TableForeignKeys>,
    options: &GenerationOptions,
) -> TableModel {
    let columns = columns
        .iter()
        .filter(|(name, _)| !is_excluded(name, options))
        .map(|(name, raw)| {
            let foreign_key = foreign_keys.and_then(|fks| fks.get(name));
            synthesize_column(name, raw, foreign_key, options)
        })
        .collect();

    TableModel {
        name: render_name(table, options),
        columns,
        options: TableOptions {
            schema: options.schema.clone(),
            table_name: table.to_string(),
            timestamps: false,
        },
    }
}

/// Synthesize every described table, keyed by original table name.
pub fn synthesize(
    tables: &IndexMap<String, ColumnMap>,
    foreign_keys: &ForeignKeyMap,
    options: &GenerationOptions,
) -> BTreeMap<String, TableModel> {
    tables
        .iter()
        .map(|(table, columns)| {
            let model = synthesize_table(table, columns, foreign_keys.get(table), options);
            (table.clone(), model)
        })
        .collect()
}
