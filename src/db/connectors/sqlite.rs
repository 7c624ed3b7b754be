use super::{ConnectionConfig, DatabaseEngine, SchemaIntrospector};
use crate::db::schema::{ColumnMap, RawColumnMetadata, Row};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// SQLite connector using rusqlite
pub struct SqliteConnector {
    config: ConnectionConfig,
    conn: Option<Arc<Mutex<Connection>>>,
}

impl SqliteConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config, conn: None }
    }

    fn path(&self) -> anyhow::Result<String> {
        self.config
            .file_path
            .clone()
            .or_else(|| self.config.database.clone())
            .ok_or_else(|| anyhow!("SQLite connection requires a file path"))
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let conn = self
            .conn
            .clone()
            .ok_or_else(|| anyhow!("Not connected to SQLite"))?;
        tokio::task::spawn_blocking(move || {
            let c = conn.lock().map_err(|e| anyhow!("Lock error: {}", e))?;
            f(&c)
        })
        .await
        .context("spawn_blocking join error")?
    }

    fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(i) => serde_json::json!(i),
            ValueRef::Real(f) => serde_json::json!(f),
            ValueRef::Text(t) | ValueRef::Blob(t) => {
                serde_json::Value::String(String::from_utf8_lossy(t).into_owned())
            }
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[async_trait]
impl SchemaIntrospector for SqliteConnector {
    async fn connect(&mut self) -> anyhow::Result<()> {
        let path = self.path()?;
        let conn = tokio::task::spawn_blocking(move || {
            Connection::open(&path).with_context(|| format!("Failed to open SQLite database {}", path))
        })
        .await
        .context("spawn_blocking join error")??;
        self.conn = Some(Arc::new(Mutex::new(conn)));
        Ok(())
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        self.conn = None;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn list_tables(&self, _schema: Option<&str>) -> anyhow::Result<Vec<String>> {
        self.with_conn(|c| {
            let mut stmt = c.prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to list SQLite tables")?;
            Ok(names)
        })
        .await
    }

    async fn describe_table(&self, table: &str, _schema: Option<&str>) -> anyhow::Result<ColumnMap> {
        let table = table.to_string();
        self.with_conn(move |c| {
            let mut stmt = c.prepare(&format!("PRAGMA table_info({})", quote_ident(&table)))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Failed to describe table {}", table))?;

            if rows.is_empty() {
                bail!("No description found for table {}", table);
            }

            let mut columns = ColumnMap::new();
            for (name, type_name, not_null, default_value, pk) in rows {
                columns.insert(
                    name,
                    RawColumnMetadata {
                        type_name: type_name.unwrap_or_default(),
                        allow_null: not_null == 0,
                        default_value,
                        primary_key: pk > 0,
                        special: Vec::new(),
                    },
                );
            }
            Ok(columns)
        })
        .await
    }

    async fn query_raw(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        let sql = sql.to_string();
        self.with_conn(move |c| {
            let mut stmt = c.prepare(&sql).context("Failed to prepare query")?;
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut rows = stmt.query([]).context("Failed to execute query")?;

            let mut result = Vec::new();
            while let Some(row) = rows.next()? {
                let mut map = Row::new();
                for (i, name) in names.iter().enumerate() {
                    map.insert(name.clone(), Self::value_to_json(row.get_ref(i)?));
                }
                result.push(map);
            }
            Ok(result)
        })
        .await
    }

    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Sqlite
    }

    fn database_name(&self) -> Option<String> {
        self.config
            .database
            .clone()
            .or_else(|| self.config.file_path.clone())
    }
}
