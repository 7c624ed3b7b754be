pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod sqlserver;

use crate::db::schema::{ColumnMap, Row};
use crate::error::GenerateError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Supported database engines
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DatabaseEngine {
    Postgres,
    MySql,
    MariaDb,
    Sqlite,
    SqlServer,
}

impl std::fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseEngine::Postgres => write!(f, "PostgreSQL"),
            DatabaseEngine::MySql => write!(f, "MySQL"),
            DatabaseEngine::MariaDb => write!(f, "MariaDB"),
            DatabaseEngine::Sqlite => write!(f, "SQLite"),
            DatabaseEngine::SqlServer => write!(f, "SQL Server"),
        }
    }
}

impl std::str::FromStr for DatabaseEngine {
    type Err = GenerateError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DatabaseEngine::Postgres),
            "mysql" => Ok(DatabaseEngine::MySql),
            "mariadb" => Ok(DatabaseEngine::MariaDb),
            "sqlite" => Ok(DatabaseEngine::Sqlite),
            "mssql" | "sqlserver" => Ok(DatabaseEngine::SqlServer),
            _ => Err(GenerateError::UnknownDialect(name.to_string())),
        }
    }
}

/// Connection configuration for a database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub engine: DatabaseEngine,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connection_string: Option<String>,
    pub file_path: Option<String>,
    pub connection_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            engine: DatabaseEngine::Sqlite,
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
            connection_string: None,
            file_path: None,
            connection_timeout_secs: 30,
        }
    }
}

/// Read-only schema access that every database adapter must provide.
///
/// Methods take `&self` so a single adapter can serve several tables
/// concurrently; adapters guard their own connection state.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Connect to the database
    async fn connect(&mut self) -> anyhow::Result<()>;

    /// Disconnect from the database
    async fn disconnect(&mut self) -> anyhow::Result<()>;

    /// Check if the connection is active
    async fn is_connected(&self) -> bool;

    /// List table names, optionally restricted to a schema
    async fn list_tables(&self, schema: Option<&str>) -> anyhow::Result<Vec<String>>;

    /// Describe the columns of a table in their natural order
    async fn describe_table(&self, table: &str, schema: Option<&str>) -> anyhow::Result<ColumnMap>;

    /// Execute a raw query and return results
    async fn query_raw(&self, sql: &str) -> anyhow::Result<Vec<Row>>;

    /// Get the database engine type
    fn engine(&self) -> DatabaseEngine;

    /// Name of the database the adapter is connected to, if known
    fn database_name(&self) -> Option<String>;
}

/// Create an adapter for the configured engine and connect it.
pub async fn open_introspector(
    config: ConnectionConfig,
) -> anyhow::Result<Box<dyn SchemaIntrospector>> {
    let mut introspector: Box<dyn SchemaIntrospector> = match config.engine {
        DatabaseEngine::Postgres => Box::new(postgres::PostgresConnector::new(config)),
        DatabaseEngine::MySql | DatabaseEngine::MariaDb => {
            Box::new(mysql::MySqlConnector::new(config))
        }
        DatabaseEngine::Sqlite => Box::new(sqlite::SqliteConnector::new(config)),
        DatabaseEngine::SqlServer => Box::new(sqlserver::SqlServerConnector::new(config)),
    };
    introspector.connect().await?;
    Ok(introspector)
}

/// Quote a string literal for inclusion in generated SQL.
pub(crate) fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
