//! Per-engine introspection queries and foreign-key row predicates.
//!
//! Dialects are plain records of function pointers selected by engine. The
//! predicates run against rows already normalized by the foreign key
//! resolver, so they only ever see canonical field names.

use super::connectors::{sql_literal, DatabaseEngine};
use super::schema::{row_text, Row};

pub type ShowTablesQuery = fn(schema: &str) -> String;
pub type ForeignKeysQuery = fn(table: &str, database: &str) -> String;
pub type RowPredicate = fn(row: &Row) -> bool;

/// Engine specific query templates and key predicates
#[derive(Clone, Copy)]
pub struct Dialect {
    pub name: &'static str,
    pub show_tables_query: Option<ShowTablesQuery>,
    pub foreign_keys_query: Option<ForeignKeysQuery>,
    pub is_unique: Option<RowPredicate>,
    pub is_primary_key: Option<RowPredicate>,
    pub is_serial_key: Option<RowPredicate>,
}

impl std::fmt::Debug for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialect").field("name", &self.name).finish()
    }
}

impl Dialect {
    /// Select the dialect for an engine.
    pub fn for_engine(engine: DatabaseEngine) -> &'static Dialect {
        match engine {
            DatabaseEngine::Postgres => &POSTGRES,
            DatabaseEngine::MySql | DatabaseEngine::MariaDb => &MYSQL,
            DatabaseEngine::Sqlite => &SQLITE,
            DatabaseEngine::SqlServer => &MSSQL,
        }
    }

    pub fn show_tables_sql(&self, schema: &str) -> Option<String> {
        self.show_tables_query.map(|query| query(schema))
    }

    pub fn foreign_keys_sql(&self, table: &str, database: &str) -> Option<String> {
        self.foreign_keys_query.map(|query| query(table, database))
    }

    pub fn is_unique(&self, row: &Row) -> bool {
        self.is_unique.is_some_and(|pred| pred(row))
    }

    pub fn is_primary_key(&self, row: &Row) -> bool {
        self.is_primary_key.is_some_and(|pred| pred(row))
    }

    pub fn is_serial_key(&self, row: &Row) -> bool {
        self.is_serial_key.is_some_and(|pred| pred(row))
    }
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub static POSTGRES: Dialect = Dialect {
    name: "postgres",
    show_tables_query: Some(postgres_show_tables),
    foreign_keys_query: Some(postgres_foreign_keys),
    is_unique: Some(postgres_is_unique),
    is_primary_key: Some(postgres_is_primary_key),
    is_serial_key: Some(postgres_is_serial_key),
};

fn postgres_show_tables(schema: &str) -> String {
    format!(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = {} \
           AND table_type LIKE '%TABLE' \
           AND table_name != 'spatial_ref_sys'",
        sql_literal(schema)
    )
}

fn postgres_foreign_keys(table: &str, _database: &str) -> String {
    format!(
        "SELECT o.conname AS constraint_name, \
                (SELECT nspname FROM pg_catalog.pg_namespace WHERE oid = m.relnamespace) AS source_schema, \
                m.relname AS source_table, \
                (SELECT a.attname FROM pg_catalog.pg_attribute a \
                  WHERE a.attrelid = m.oid AND a.attnum = o.conkey[1] AND a.attisdropped = false) AS source_column, \
                (SELECT nspname FROM pg_catalog.pg_namespace WHERE oid = f.relnamespace) AS target_schema, \
                f.relname AS target_table, \
                (SELECT a.attname FROM pg_catalog.pg_attribute a \
                  WHERE a.attrelid = f.oid AND a.attnum = o.confkey[1] AND a.attisdropped = false) AS target_column, \
                o.contype, \
                (SELECT pg_catalog.pg_get_expr(d.adbin, d.adrelid) \
                   FROM pg_catalog.pg_attribute a \
                   LEFT JOIN pg_catalog.pg_attrdef d ON (a.attrelid, a.attnum) = (d.adrelid, d.adnum) \
                  WHERE NOT a.attisdropped AND a.attnum > 0 \
                    AND a.attrelid = o.conrelid AND a.attnum = o.conkey[1] \
                  LIMIT 1) AS extra \
           FROM pg_catalog.pg_constraint o \
           LEFT JOIN pg_catalog.pg_class f ON f.oid = o.confrelid \
           LEFT JOIN pg_catalog.pg_class m ON m.oid = o.conrelid \
          WHERE o.conrelid = (SELECT oid FROM pg_catalog.pg_class WHERE relname = {} LIMIT 1)",
        sql_literal(table)
    )
}

fn postgres_is_unique(row: &Row) -> bool {
    row_text(row, "contype").as_deref() == Some("u")
}

fn postgres_is_primary_key(row: &Row) -> bool {
    row_text(row, "contype").as_deref() == Some("p")
}

fn postgres_is_serial_key(row: &Row) -> bool {
    match row_text(row, "extra") {
        Some(extra) => {
            extra.starts_with("nextval") && extra.contains("_seq") && extra.contains("::regclass")
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// MySQL / MariaDB
// ---------------------------------------------------------------------------

pub static MYSQL: Dialect = Dialect {
    name: "mysql",
    show_tables_query: Some(mysql_show_tables),
    foreign_keys_query: Some(mysql_foreign_keys),
    is_unique: Some(mysql_is_unique),
    is_primary_key: Some(mysql_is_primary_key),
    is_serial_key: Some(mysql_is_serial_key),
};

fn mysql_show_tables(schema: &str) -> String {
    format!(
        "SELECT TABLE_NAME AS table_name FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_SCHEMA = {} AND TABLE_TYPE = 'BASE TABLE'",
        sql_literal(schema)
    )
}

fn mysql_foreign_keys(table: &str, database: &str) -> String {
    format!(
        "SELECT K.CONSTRAINT_NAME AS constraint_name, \
                K.CONSTRAINT_SCHEMA AS source_schema, \
                K.TABLE_NAME AS source_table, \
                K.COLUMN_NAME AS source_column, \
                K.REFERENCED_TABLE_SCHEMA AS target_schema, \
                K.REFERENCED_TABLE_NAME AS target_table, \
                K.REFERENCED_COLUMN_NAME AS target_column, \
                C.EXTRA AS extra, \
                C.COLUMN_KEY AS column_key \
           FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE AS K \
           LEFT JOIN INFORMATION_SCHEMA.COLUMNS AS C \
             ON C.TABLE_NAME = K.TABLE_NAME \
            AND C.COLUMN_NAME = K.COLUMN_NAME \
            AND C.TABLE_SCHEMA = K.CONSTRAINT_SCHEMA \
          WHERE K.TABLE_NAME = {} \
            AND K.CONSTRAINT_SCHEMA = {}",
        sql_literal(table),
        sql_literal(database)
    )
}

fn mysql_is_unique(row: &Row) -> bool {
    row_text(row, "column_key")
        .map(|key| key.eq_ignore_ascii_case("UNI"))
        .unwrap_or(false)
}

fn mysql_is_primary_key(row: &Row) -> bool {
    row_text(row, "constraint_name").as_deref() == Some("PRIMARY")
}

fn mysql_is_serial_key(row: &Row) -> bool {
    row_text(row, "extra").as_deref() == Some("auto_increment")
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// SQLite reports keys through `PRAGMA foreign_key_list`, which carries no
/// uniqueness or primary-key information.
pub static SQLITE: Dialect = Dialect {
    name: "sqlite",
    show_tables_query: None,
    foreign_keys_query: Some(sqlite_foreign_keys),
    is_unique: None,
    is_primary_key: None,
    is_serial_key: None,
};

fn sqlite_foreign_keys(table: &str, _database: &str) -> String {
    format!("PRAGMA foreign_key_list(\"{}\")", table.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// SQL Server
// ---------------------------------------------------------------------------

pub static MSSQL: Dialect = Dialect {
    name: "mssql",
    show_tables_query: Some(mssql_show_tables),
    foreign_keys_query: Some(mssql_foreign_keys),
    is_unique: Some(mssql_is_unique),
    is_primary_key: Some(mssql_is_primary_key),
    is_serial_key: Some(mssql_is_serial_key),
};

fn mssql_show_tables(schema: &str) -> String {
    format!(
        "SELECT TABLE_NAME AS table_name FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_SCHEMA = {} AND TABLE_TYPE = 'BASE TABLE' \
         ORDER BY TABLE_NAME",
        sql_literal(schema)
    )
}

fn mssql_foreign_keys(table: &str, _database: &str) -> String {
    format!(
        "SELECT K.CONSTRAINT_NAME AS constraint_name, \
                K.TABLE_SCHEMA AS source_schema, \
                K.TABLE_NAME AS source_table, \
                K.COLUMN_NAME AS source_column, \
                T.CONSTRAINT_TYPE AS constraint_type, \
                RK.TABLE_SCHEMA AS target_schema, \
                RK.TABLE_NAME AS target_table, \
                RK.COLUMN_NAME AS target_column, \
                COLUMNPROPERTY(OBJECT_ID(QUOTENAME(K.TABLE_SCHEMA) + '.' + QUOTENAME(K.TABLE_NAME)), \
                               K.COLUMN_NAME, 'IsIdentity') AS is_identity \
           FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE K \
           JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS T \
             ON T.CONSTRAINT_NAME = K.CONSTRAINT_NAME \
            AND T.TABLE_SCHEMA = K.TABLE_SCHEMA \
           LEFT JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS R \
             ON R.CONSTRAINT_NAME = K.CONSTRAINT_NAME \
            AND R.CONSTRAINT_SCHEMA = K.CONSTRAINT_SCHEMA \
           LEFT JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE RK \
             ON RK.CONSTRAINT_NAME = R.UNIQUE_CONSTRAINT_NAME \
            AND RK.CONSTRAINT_SCHEMA = R.UNIQUE_CONSTRAINT_SCHEMA \
            AND RK.ORDINAL_POSITION = K.ORDINAL_POSITION \
          WHERE K.TABLE_NAME = {}",
        sql_literal(table)
    )
}

fn mssql_is_unique(row: &Row) -> bool {
    row_text(row, "constraint_type").as_deref() == Some("UNIQUE")
}

fn mssql_is_primary_key(row: &Row) -> bool {
    row_text(row, "constraint_type").as_deref() == Some("PRIMARY KEY")
}

fn mssql_is_serial_key(row: &Row) -> bool {
    matches!(row_text(row, "is_identity").as_deref(), Some("1") | Some("true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_engine_lookup() {
        assert_eq!(Dialect::for_engine(DatabaseEngine::Postgres).name, "postgres");
        assert_eq!(Dialect::for_engine(DatabaseEngine::MariaDb).name, "mysql");
        assert_eq!(Dialect::for_engine(DatabaseEngine::SqlServer).name, "mssql");
        assert_eq!(Dialect::for_engine(DatabaseEngine::Sqlite).name, "sqlite");
    }

    #[test]
    fn test_postgres_predicates() {
        let unique = row(&[("contype", json!("u"))]);
        let primary = row(&[
            ("contype", json!("p")),
            ("extra", json!("nextval('users_id_seq'::regclass)")),
        ]);
        assert!(POSTGRES.is_unique(&unique));
        assert!(!POSTGRES.is_primary_key(&unique));
        assert!(POSTGRES.is_primary_key(&primary));
        assert!(POSTGRES.is_serial_key(&primary));
        assert!(!POSTGRES.is_serial_key(&unique));
    }

    #[test]
    fn test_mysql_predicates() {
        let pk = row(&[
            ("constraint_name", json!("PRIMARY")),
            ("extra", json!("auto_increment")),
            ("column_key", json!("PRI")),
        ]);
        assert!(MYSQL.is_primary_key(&pk));
        assert!(MYSQL.is_serial_key(&pk));
        assert!(!MYSQL.is_unique(&pk));

        let uni = row(&[("constraint_name", json!("email")), ("column_key", json!("uni"))]);
        assert!(MYSQL.is_unique(&uni));
    }

    #[test]
    fn test_mssql_predicates() {
        let pk = row(&[("constraint_type", json!("PRIMARY KEY")), ("is_identity", json!(1))]);
        assert!(MSSQL.is_primary_key(&pk));
        assert!(MSSQL.is_serial_key(&pk));
        let fk = row(&[("constraint_type", json!("FOREIGN KEY")), ("is_identity", json!(0))]);
        assert!(!MSSQL.is_serial_key(&fk));
        assert!(!MSSQL.is_unique(&fk));
    }

    #[test]
    fn test_missing_predicates_leave_flags_unset() {
        let any = row(&[("contype", json!("p"))]);
        assert!(!SQLITE.is_unique(&any));
        assert!(!SQLITE.is_primary_key(&any));
        assert!(!SQLITE.is_serial_key(&any));
        assert!(SQLITE.show_tables_sql("main").is_none());
    }

    #[test]
    fn test_queries_escape_identifiers() {
        let sql = MYSQL.foreign_keys_sql("o'rders", "shop").unwrap();
        assert!(sql.contains("K.TABLE_NAME = 'o''rders'"));
        assert!(sql.contains("K.CONSTRAINT_SCHEMA = 'shop'"));
        let pragma = SQLITE.foreign_keys_sql("orders", "").unwrap();
        assert_eq!(pragma, "PRAGMA foreign_key_list(\"orders\")");
        let tables = POSTGRES.show_tables_sql("public").unwrap();
        assert!(tables.contains("table_schema = 'public'"));
    }
}
