//! Renders a synthesized table as a Sequelize model definition module.

use crate::config::OutputOptions;
use crate::db::model::{Attribute, ColumnModel, TableModel};
use crate::db::type_mapper::{double_quoted, SemanticType};

/// Single-quoted JavaScript string literal
fn js_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Object key, quoted only when it is not a plain identifier
fn js_key(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if plain {
        name.to_string()
    } else {
        js_string(name)
    }
}

fn render_type(semantic_type: &SemanticType) -> String {
    match semantic_type {
        SemanticType::Enum(_) => format!("DataTypes.{}", semantic_type),
        SemanticType::Literal(native) => double_quoted(native),
        other => format!("Sequelize.{}", other),
    }
}

fn render_attribute(attribute: &Attribute<'_>, unit: &str) -> String {
    let pad = unit.repeat(3);
    match attribute {
        Attribute::AutoIncrement => format!("{}autoIncrement: true", pad),
        Attribute::References(reference) => format!(
            "{pad}references: {{\n{inner}model: {model},\n{inner}key: {key}\n{pad}}}",
            pad = pad,
            inner = unit.repeat(4),
            model = js_string(&reference.model),
            key = js_string(&reference.key),
        ),
        Attribute::PrimaryKey => format!("{}primaryKey: true", pad),
        Attribute::AllowNull(allow) => format!("{}allowNull: {}", pad, allow),
        Attribute::DefaultValue(expr) => {
            format!("{}defaultValue: Sequelize.literal({})", pad, js_string(expr))
        }
        Attribute::Type(semantic_type) => format!("{}type: {}", pad, render_type(semantic_type)),
        Attribute::Unique => format!("{}unique: true", pad),
        Attribute::Field(field) => format!("{}field: {}", pad, js_string(field)),
    }
}

fn render_column(column: &ColumnModel, unit: &str) -> String {
    let attributes: Vec<String> = column
        .attributes()
        .iter()
        .map(|attr| render_attribute(attr, unit))
        .collect();
    format!(
        "{pad}{name}: {{\n{body}\n{pad}}}",
        pad = unit.repeat(2),
        name = js_key(&column.rendered_name),
        body = attributes.join(",\n"),
    )
}

/// Render one table model as a `module.exports` definition.
pub fn render_table(model: &TableModel, options: &OutputOptions) -> String {
    let unit = options.indent_unit();
    let mut out = format!("/* jshint indent: {} */\n\n", options.indentation);
    out.push_str("module.exports = {\n");

    out.push_str(&format!("{}attributes: {{\n", unit));
    let columns: Vec<String> = model.columns.iter().map(|c| render_column(c, &unit)).collect();
    if !columns.is_empty() {
        out.push_str(&columns.join(",\n"));
        out.push('\n');
    }
    out.push_str(&format!("{}}},\n", unit));

    let pad = unit.repeat(2);
    let mut table_options = Vec::new();
    if let Some(schema) = &model.options.schema {
        table_options.push(format!("{}schema: {}", pad, js_string(schema)));
    }
    table_options.push(format!("{}tableName: {}", pad, js_string(&model.options.table_name)));
    table_options.push(format!("{}timestamps: {}", pad, model.options.timestamps));

    out.push_str(&format!("{}options: {{\n", unit));
    out.push_str(&table_options.join(",\n"));
    out.push_str(&format!("\n{}}}\n", unit));
    out.push_str("};\n");
    out
}
