use super::{sql_literal, ConnectionConfig, DatabaseEngine, SchemaIntrospector};
use crate::db::schema::{ColumnMap, RawColumnMetadata, Row};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use std::collections::HashSet;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

const DEFAULT_SCHEMA: &str = "dbo";

type TdsClient = Client<Compat<TcpStream>>;

/// SQL Server connector using tiberius
pub struct SqlServerConnector {
    config: ConnectionConfig,
    client: Mutex<Option<TdsClient>>,
}

impl SqlServerConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    /// Build a tiberius Config from our ConnectionConfig and return (Config, host, port)
    fn build_tiberius_config(&self) -> anyhow::Result<(Config, String, u16)> {
        let host = self.config.host.clone().unwrap_or_else(|| "localhost".to_string());
        let port = self.config.port.unwrap_or(1433);

        if let Some(ref conn_str) = self.config.connection_string {
            let config = Config::from_ado_string(conn_str)
                .context("Failed to parse SQL Server connection string")?;
            return Ok((config, host, port));
        }

        let mut tib_config = Config::new();
        tib_config.host(&host);
        tib_config.port(port);

        if let Some(ref db) = self.config.database {
            tib_config.database(db);
        }

        match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => {
                tib_config.authentication(AuthMethod::sql_server(user, pass));
            }
            _ => {
                tib_config.authentication(AuthMethod::None);
            }
        }

        tib_config.trust_cert();
        tib_config.encryption(EncryptionLevel::Required);

        Ok((tib_config, host, port))
    }

    /// Run a query and return the first result set
    async fn fetch(&self, query: &str) -> anyhow::Result<Vec<tiberius::Row>> {
        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or_else(|| anyhow!("Not connected to SQL Server"))?;

        let stream = client
            .simple_query(query)
            .await
            .context("Failed to execute query")?;
        stream
            .into_first_result()
            .await
            .context("Failed to read query results")
    }

    fn row_to_map(row: &tiberius::Row) -> Row {
        row.columns()
            .iter()
            .map(|col| (col.name().to_string(), Self::column_to_json(row, col)))
            .collect()
    }

    /// Convert a single tiberius column value to serde_json::Value
    fn column_to_json(row: &tiberius::Row, col: &tiberius::Column) -> serde_json::Value {
        use tiberius::ColumnType;

        match col.column_type() {
            ColumnType::Null => serde_json::Value::Null,
            ColumnType::Bit | ColumnType::Bitn => match row.try_get::<bool, _>(col.name()) {
                Ok(Some(v)) => serde_json::Value::Bool(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Int1 => match row.try_get::<u8, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Int2 => match row.try_get::<i16, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Int4 => match row.try_get::<i32, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Int8 => match row.try_get::<i64, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Intn => {
                if let Ok(Some(v)) = row.try_get::<i64, _>(col.name()) {
                    serde_json::json!(v)
                } else if let Ok(Some(v)) = row.try_get::<i32, _>(col.name()) {
                    serde_json::json!(v)
                } else if let Ok(Some(v)) = row.try_get::<i16, _>(col.name()) {
                    serde_json::json!(v)
                } else {
                    serde_json::Value::Null
                }
            }
            ColumnType::Float4 | ColumnType::Float8 | ColumnType::Floatn => {
                if let Ok(Some(v)) = row.try_get::<f64, _>(col.name()) {
                    serde_json::json!(v)
                } else if let Ok(Some(v)) = row.try_get::<f32, _>(col.name()) {
                    serde_json::json!(v)
                } else {
                    serde_json::Value::Null
                }
            }
            _ => match row.try_get::<&str, _>(col.name()) {
                Ok(Some(v)) => serde_json::Value::String(v.to_string()),
                _ => serde_json::Value::Null,
            },
        }
    }

    /// `nvarchar` + 64 → `nvarchar(64)`; `max` lengths (-1) keep the bare name.
    fn native_type(data_type: &str, max_length: Option<i32>) -> String {
        match max_length {
            Some(len) if len > 0 => format!("{}({})", data_type, len),
            _ => data_type.to_string(),
        }
    }
}

#[async_trait]
impl SchemaIntrospector for SqlServerConnector {
    async fn connect(&mut self) -> anyhow::Result<()> {
        let (tib_config, host, port) = self.build_tiberius_config()?;
        let addr = format!("{}:{}", host, port);

        let tcp = TcpStream::connect(&addr)
            .await
            .context(format!("Failed to connect to SQL Server at {}", addr))?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(tib_config, tcp.compat_write())
            .await
            .context("TDS connection/authentication failed")?;

        *self.client.lock().await = Some(client);
        Ok(())
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        if let Some(client) = self.client.lock().await.take() {
            client.close().await.context("Failed to close SQL Server connection")?;
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    async fn list_tables(&self, schema: Option<&str>) -> anyhow::Result<Vec<String>> {
        let query = format!(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA = {} \
             ORDER BY TABLE_NAME",
            sql_literal(schema.unwrap_or(DEFAULT_SCHEMA))
        );

        let rows = self.fetch(&query).await.context("Failed to query tables")?;
        let mut tables = Vec::new();
        for row in &rows {
            if let Some(name) = row.try_get::<&str, _>(0)? {
                tables.push(name.to_string());
            }
        }
        Ok(tables)
    }

    async fn describe_table(&self, table: &str, schema: Option<&str>) -> anyhow::Result<ColumnMap> {
        let schema = sql_literal(schema.unwrap_or(DEFAULT_SCHEMA));
        let table_lit = sql_literal(table);

        let pk_query = format!(
            "SELECT kcu.COLUMN_NAME \
             FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
             JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
               ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
               AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA \
             WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
               AND tc.TABLE_SCHEMA = {} \
               AND tc.TABLE_NAME = {}",
            schema, table_lit
        );
        let pk_columns: HashSet<String> = self
            .fetch(&pk_query)
            .await?
            .iter()
            .filter_map(|r| r.try_get::<&str, _>(0).ok().flatten().map(|s| s.to_string()))
            .collect();

        let col_query = format!(
            "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, CHARACTER_MAXIMUM_LENGTH, COLUMN_DEFAULT \
             FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} \
             ORDER BY ORDINAL_POSITION",
            schema, table_lit
        );
        let rows = self
            .fetch(&col_query)
            .await
            .with_context(|| format!("Failed to describe table {}", table))?;

        if rows.is_empty() {
            bail!("No description found for table {}", table);
        }

        let mut columns = ColumnMap::new();
        for row in &rows {
            let name: &str = row.try_get(0)?.unwrap_or("");
            let data_type: &str = row.try_get(1)?.unwrap_or("");
            let nullable: &str = row.try_get(2)?.unwrap_or("YES");
            let max_length: Option<i32> = row.try_get(3)?;
            let default_value: Option<&str> = row.try_get(4)?;

            columns.insert(
                name.to_string(),
                RawColumnMetadata {
                    type_name: Self::native_type(data_type, max_length),
                    allow_null: nullable == "YES",
                    default_value: default_value.map(|s| s.to_string()),
                    primary_key: pk_columns.contains(name),
                    special: Vec::new(),
                },
            );
        }
        Ok(columns)
    }

    async fn query_raw(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        let rows = self.fetch(sql).await?;
        Ok(rows.iter().map(Self::row_to_map).collect())
    }

    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::SqlServer
    }

    fn database_name(&self) -> Option<String> {
        self.config.database.clone()
    }
}
