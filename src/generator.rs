//! The generation run: discover tables, resolve keys, describe, synthesize.
//!
//! Per-table work fans out with a bounded number of in-flight requests to the
//! introspector. All foreign key lookups finish before any table is described.
//! A table whose lookup or description fails is recorded in the report and
//! left out of the models. The run ends with an error when the table listing
//! fails, or when a phase fails for every table or leaves the introspector
//! disconnected.

use futures_util::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::GenerationOptions;
use crate::db::connectors::SchemaIntrospector;
use crate::db::dialect::Dialect;
use crate::db::foreign_keys::{resolve_table, ForeignKeyMap, TableForeignKeys};
use crate::db::model::{synthesize, TableModel};
use crate::db::schema::{value_as_text, ColumnMap, Row};
use crate::error::{GenerateError, Operation, TableFailure};

/// Outcome of one run
#[derive(Debug, Default, Serialize)]
pub struct GenerationReport {
    /// Synthesized models keyed by original table name
    pub models: BTreeMap<String, TableModel>,
    /// Tables skipped, in discovery order
    pub failures: Vec<TableFailure>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ModelGenerator<'a> {
    introspector: &'a dyn SchemaIntrospector,
    dialect: &'static Dialect,
    options: &'a GenerationOptions,
}

/// Table name column of a show-tables row, or its only value.
fn table_name_of(row: &Row) -> Option<String> {
    let value = ["table_name", "TABLE_NAME", "tableName"]
        .iter()
        .find_map(|key| row.get(*key))
        .or_else(|| match row.len() {
            1 => row.values().next(),
            _ => None,
        })?;
    let name = value_as_text(value);
    (!name.is_empty()).then_some(name)
}

impl<'a> ModelGenerator<'a> {
    pub fn new(introspector: &'a dyn SchemaIntrospector, options: &'a GenerationOptions) -> Self {
        Self {
            introspector,
            dialect: Dialect::for_engine(introspector.engine()),
            options,
        }
    }

    /// List tables, using the dialect's own query when a schema is requested.
    pub async fn discover_tables(&self) -> Result<Vec<String>, GenerateError> {
        let schema = self.options.schema.as_deref();
        let listed = match schema.and_then(|s| self.dialect.show_tables_sql(s)) {
            Some(sql) => self
                .introspector
                .query_raw(&sql)
                .await
                .map(|rows| rows.iter().filter_map(table_name_of).collect()),
            None => self.introspector.list_tables(schema).await,
        };
        listed.map_err(GenerateError::ListTables)
    }

    /// Resolve the key descriptors of one table. Dialects without a key
    /// query resolve to an empty map.
    pub async fn foreign_keys(&self, table: &str, database: &str) -> Result<TableForeignKeys, GenerateError> {
        let Some(sql) = self.dialect.foreign_keys_sql(table, database) else {
            return Ok(TableForeignKeys::new());
        };
        let rows = self
            .introspector
            .query_raw(&sql)
            .await
            .map_err(|source| GenerateError::Introspection {
                table: table.to_string(),
                operation: Operation::ForeignKeys,
                source,
            })?;
        Ok(resolve_table(self.dialect, table, database, &rows))
    }

    pub async fn describe(&self, table: &str) -> Result<ColumnMap, GenerateError> {
        self.introspector
            .describe_table(table, self.options.schema.as_deref())
            .await
            .map_err(|source| GenerateError::Introspection {
                table: table.to_string(),
                operation: Operation::DescribeTable,
                source,
            })
    }

    pub async fn run(&self) -> Result<GenerationReport, GenerateError> {
        let discovered = self.discover_tables().await?;
        log::info!("Discovered {} table(s)", discovered.len());
        let tables = self.options.select_tables(discovered);

        let database_name = self.introspector.database_name().unwrap_or_default();
        let database = database_name.as_str();
        let limit = self.options.max_concurrency.max(1);
        let mut failures = Vec::new();

        let mut key_results: Vec<_> = stream::iter(tables.iter().enumerate())
            .map(|(index, table)| async move { (index, table, self.foreign_keys(table, database).await) })
            .buffer_unordered(limit)
            .collect()
            .await;
        key_results.sort_by_key(|(index, ..)| *index);

        let attempted = key_results.len();
        let mut foreign_keys = ForeignKeyMap::new();
        let mut resolved = Vec::new();
        for (_, table, result) in key_results {
            match result {
                Ok(keys) => {
                    foreign_keys.insert(table.clone(), keys);
                    resolved.push(table);
                }
                Err(err) => record_failure(&err, &mut failures),
            }
        }
        self.ensure_connected(Operation::ForeignKeys, attempted, &failures).await?;

        let mut described: Vec<_> = stream::iter(resolved.into_iter().enumerate())
            .map(|(index, table)| async move { (index, table, self.describe(table).await) })
            .buffer_unordered(limit)
            .collect()
            .await;
        described.sort_by_key(|(index, ..)| *index);

        let attempted = described.len();
        let failed_before = failures.len();
        let mut columns = IndexMap::new();
        for (_, table, result) in described {
            match result {
                Ok(cols) => {
                    columns.insert(table.clone(), cols);
                }
                Err(err) => record_failure(&err, &mut failures),
            }
        }
        self.ensure_connected(Operation::DescribeTable, attempted, &failures[failed_before..])
            .await?;

        let models = synthesize(&columns, &foreign_keys, self.options);
        log::info!("Synthesized {} model(s), {} table(s) skipped", models.len(), failures.len());
        Ok(GenerationReport { models, failures })
    }

    /// Fail the run when a phase lost every table or the connection dropped.
    /// `failed` holds the failures recorded in that phase only.
    async fn ensure_connected(
        &self,
        operation: Operation,
        attempted: usize,
        failed: &[TableFailure],
    ) -> Result<(), GenerateError> {
        let Some(last) = failed.last() else {
            return Ok(());
        };
        if failed.len() < attempted && self.introspector.is_connected().await {
            return Ok(());
        }
        Err(GenerateError::ConnectionLost {
            operation,
            attempted,
            failed: failed.len(),
            last_error: last.message.clone(),
        })
    }
}

fn record_failure(err: &GenerateError, failures: &mut Vec<TableFailure>) {
    log::warn!("{}", err);
    if let Some(failure) = TableFailure::from_error(err) {
        failures.push(failure);
    }
}
