use super::{ConnectionConfig, DatabaseEngine, SchemaIntrospector};
use crate::db::schema::{ColumnMap, RawColumnMetadata, Row};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use std::time::Duration;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

const DEFAULT_SCHEMA: &str = "public";

/// PostgreSQL connector using tokio-postgres
pub struct PostgresConnector {
    config: ConnectionConfig,
    client: Option<Client>,
}

impl PostgresConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// Build a tokio-postgres Config from our ConnectionConfig
    fn build_pg_config(&self) -> anyhow::Result<tokio_postgres::Config> {
        if let Some(ref conn_str) = self.config.connection_string {
            return conn_str
                .parse::<tokio_postgres::Config>()
                .context("Failed to parse PostgreSQL connection string");
        }

        let mut pg = tokio_postgres::Config::new();
        pg.host(self.config.host.as_deref().unwrap_or("localhost"));
        pg.port(self.config.port.unwrap_or(5432));
        pg.connect_timeout(Duration::from_secs(self.config.connection_timeout_secs));
        if let Some(ref db) = self.config.database {
            pg.dbname(db);
        }
        if let Some(ref user) = self.config.username {
            pg.user(user);
        }
        if let Some(ref pass) = self.config.password {
            pg.password(pass);
        }
        Ok(pg)
    }

    fn client(&self) -> anyhow::Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow!("Not connected to PostgreSQL"))
    }
}

#[async_trait]
impl SchemaIntrospector for PostgresConnector {
    async fn connect(&mut self) -> anyhow::Result<()> {
        let pg_config = self.build_pg_config()?;
        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .context("PostgreSQL connection/authentication failed")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::warn!("PostgreSQL connection closed with error: {}", e);
            }
        });

        self.client = Some(client);
        Ok(())
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        self.client = None;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }

    async fn list_tables(&self, schema: Option<&str>) -> anyhow::Result<Vec<String>> {
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);
        let rows = self
            .client()?
            .query(
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema::text = $1 AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
                &[&schema],
            )
            .await
            .context("Failed to query tables")?;

        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(Into::into))
            .collect()
    }

    async fn describe_table(&self, table: &str, schema: Option<&str>) -> anyhow::Result<ColumnMap> {
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);
        let rows = self
            .client()?
            .query(
                "SELECT c.column_name::text, \
                        (CASE WHEN c.udt_name::text = 'hstore' THEN c.udt_name::text ELSE c.data_type::text END \
                         || CASE WHEN c.character_maximum_length IS NOT NULL \
                                 THEN '(' || c.character_maximum_length || ')' ELSE '' END) AS type, \
                        (c.is_nullable::text = 'YES') AS allow_null, \
                        c.column_default::text, \
                        EXISTS (SELECT 1 FROM information_schema.table_constraints tc \
                                  JOIN information_schema.key_column_usage kcu \
                                    ON tc.constraint_name = kcu.constraint_name \
                                   AND tc.table_schema = kcu.table_schema \
                                   AND tc.table_name = kcu.table_name \
                                 WHERE tc.constraint_type = 'PRIMARY KEY' \
                                   AND tc.table_schema = c.table_schema \
                                   AND tc.table_name = c.table_name \
                                   AND kcu.column_name = c.column_name) AS primary_key, \
                        (SELECT array_agg(e.enumlabel::text ORDER BY e.enumsortorder) \
                           FROM pg_catalog.pg_type t \
                           JOIN pg_catalog.pg_enum e ON t.oid = e.enumtypid \
                          WHERE t.typname = c.udt_name::name) AS special \
                   FROM information_schema.columns c \
                  WHERE c.table_name::text = $1 AND c.table_schema::text = $2 \
                  ORDER BY c.ordinal_position",
                &[&table, &schema],
            )
            .await
            .with_context(|| format!("Failed to describe table {}", table))?;

        if rows.is_empty() {
            bail!("No description found for table {}.{}", schema, table);
        }

        let mut columns = ColumnMap::new();
        for row in &rows {
            let name: String = row.try_get(0)?;
            let special: Option<Vec<String>> = row.try_get(5)?;
            columns.insert(
                name,
                RawColumnMetadata {
                    type_name: row.try_get(1)?,
                    allow_null: row.try_get(2)?,
                    default_value: row.try_get(3)?,
                    primary_key: row.try_get(4)?,
                    special: special.unwrap_or_default(),
                },
            );
        }
        Ok(columns)
    }

    async fn query_raw(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        let messages = self
            .client()?
            .simple_query(sql)
            .await
            .context("Failed to execute query")?;

        let mut result = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let mut map = Row::new();
                for (i, column) in row.columns().iter().enumerate() {
                    let value = match row.try_get(i)? {
                        Some(text) => serde_json::Value::String(text.to_string()),
                        None => serde_json::Value::Null,
                    };
                    map.insert(column.name().to_string(), value);
                }
                result.push(map);
            }
        }
        Ok(result)
    }

    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Postgres
    }

    fn database_name(&self) -> Option<String> {
        self.config.database.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_from_params() {
        let connector = PostgresConnector::new(ConnectionConfig {
            engine: DatabaseEngine::Postgres,
            host: Some("db.internal".to_string()),
            port: Some(6432),
            database: Some("app".to_string()),
            username: Some("reader".to_string()),
            ..Default::default()
        });
        let pg = connector.build_pg_config().unwrap();
        assert_eq!(pg.get_ports(), &[6432]);
        assert_eq!(pg.get_dbname(), Some("app"));
        assert_eq!(pg.get_user(), Some("reader"));
    }

    #[test]
    fn test_build_config_from_connection_string() {
        let connector = PostgresConnector::new(ConnectionConfig {
            engine: DatabaseEngine::Postgres,
            connection_string: Some("host=localhost port=5433 dbname=shop user=postgres".to_string()),
            ..Default::default()
        });
        let pg = connector.build_pg_config().unwrap();
        assert_eq!(pg.get_ports(), &[5433]);
        assert_eq!(pg.get_dbname(), Some("shop"));
    }

    #[tokio::test]
    async fn test_not_connected_by_default() {
        let connector = PostgresConnector::new(ConnectionConfig {
            engine: DatabaseEngine::Postgres,
            ..Default::default()
        });
        assert!(!connector.is_connected().await);
        assert!(connector.query_raw("SELECT 1").await.is_err());
        assert_eq!(connector.engine(), DatabaseEngine::Postgres);
    }
}
