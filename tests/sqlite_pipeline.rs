//! End-to-end generation against a real SQLite database file.
//!
//! Each test seeds a fresh database in a temporary directory:
//!   - customers (plain columns, managed timestamps)
//!   - orders (foreign key to customers, passthrough type)
//!   - order_items (composite primary key, one half of it a foreign key)

use std::path::Path;

use modelgen::db::model::{Attribute, Reference};
use modelgen::db::type_mapper::SemanticType;
use modelgen::{
    open_introspector, ConnectionConfig, DatabaseEngine, GenerationOptions, ModelGenerator,
    ModelWriter, OutputOptions, SchemaIntrospector,
};

// ─── helpers ───────────────────────────────────────────────────────────────

fn seed(path: &Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE customers (
             id INTEGER PRIMARY KEY,
             full_name VARCHAR(120) NOT NULL,
             email TEXT UNIQUE,
             createdAt DATETIME NOT NULL,
             updatedAt DATETIME
         );
         CREATE TABLE orders (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             customer_id INTEGER NOT NULL REFERENCES customers(id),
             total DECIMAL(10,2),
             status VARCHAR(16) DEFAULT 'new',
             note xmltype
         );
         CREATE TABLE order_items (
             order_id INTEGER NOT NULL REFERENCES orders(id),
             line_no INTEGER NOT NULL,
             qty SMALLINT UNSIGNED,
             PRIMARY KEY (order_id, line_no)
         );",
    )
    .unwrap();
}

async fn open(dir: &Path) -> Box<dyn SchemaIntrospector> {
    let path = dir.join("shop.db");
    seed(&path);
    open_introspector(ConnectionConfig {
        engine: DatabaseEngine::Sqlite,
        file_path: Some(path.to_string_lossy().into_owned()),
        ..Default::default()
    })
    .await
    .unwrap()
}

fn column<'a>(
    report: &'a modelgen::GenerationReport,
    table: &str,
    name: &str,
) -> &'a modelgen::db::model::ColumnModel {
    report.models[table]
        .columns
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("{}.{} missing", table, name))
}

// ─── synthesis ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn sqlite_generates_every_table() {
    let dir = tempfile::tempdir().unwrap();
    let introspector = open(dir.path()).await;
    let options = GenerationOptions::default();

    let report = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();

    assert!(report.is_complete(), "failures: {:?}", report.failures);
    assert_eq!(
        report.models.keys().collect::<Vec<_>>(),
        vec!["customers", "order_items", "orders"]
    );
}

#[tokio::test]
async fn sqlite_id_is_never_an_attribute() {
    let dir = tempfile::tempdir().unwrap();
    let introspector = open(dir.path()).await;
    let options = GenerationOptions::default();
    let report = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();

    let names: Vec<&str> = report.models["customers"]
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["full_name", "email", "createdAt", "updatedAt"]);
    assert!(report
        .models
        .values()
        .all(|m| m.columns.iter().all(|c| c.name != "id")));
}

#[tokio::test]
async fn sqlite_foreign_key_becomes_reference() {
    let dir = tempfile::tempdir().unwrap();
    let introspector = open(dir.path()).await;
    let options = GenerationOptions::default();
    let report = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();

    let customer_id = column(&report, "orders", "customer_id");
    assert_eq!(
        customer_id.reference,
        Some(Reference {
            model: "customers".to_string(),
            key: "id".to_string(),
        })
    );
    assert!(!customer_id.primary_key);
    assert_eq!(customer_id.allow_null, Some(false));
    assert!(!customer_id.auto_increment);
}

#[tokio::test]
async fn sqlite_types_and_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let introspector = open(dir.path()).await;
    let options = GenerationOptions::default();
    let report = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();

    assert_eq!(column(&report, "orders", "total").semantic_type, SemanticType::Decimal);
    assert_eq!(
        column(&report, "orders", "note").semantic_type,
        SemanticType::Literal("xmltype".to_string())
    );
    assert_eq!(
        column(&report, "order_items", "qty").semantic_type,
        SemanticType::Integer {
            length: None,
            unsigned: true,
            zerofill: false,
        }
    );

    // Ordinary defaults are not carried into the model
    let status = column(&report, "orders", "status");
    assert_eq!(status.default_value, None);
    assert_eq!(status.allow_null, Some(true));

    let created = column(&report, "customers", "createdAt");
    assert_eq!(created.default_value.as_deref(), Some("NOW()"));
    assert_eq!(created.allow_null, None);
    assert_eq!(created.semantic_type, SemanticType::Date);
}

#[tokio::test]
async fn sqlite_composite_primary_key_with_foreign_half() {
    let dir = tempfile::tempdir().unwrap();
    let introspector = open(dir.path()).await;
    let options = GenerationOptions::default();
    let report = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();

    let order_id = column(&report, "order_items", "order_id");
    assert!(!order_id.attributes().contains(&Attribute::PrimaryKey));
    assert_eq!(order_id.reference.as_ref().map(|r| r.model.as_str()), Some("orders"));

    let line_no = column(&report, "order_items", "line_no");
    assert!(line_no.attributes().contains(&Attribute::PrimaryKey));
}

#[tokio::test]
async fn sqlite_camel_case_and_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let introspector = open(dir.path()).await;
    let options = GenerationOptions {
        camel_case: true,
        timestamps: true,
        ..Default::default()
    };
    let report = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();

    let customers = &report.models["customers"];
    let rendered: Vec<&str> = customers
        .columns
        .iter()
        .map(|c| c.rendered_name.as_str())
        .collect();
    assert_eq!(rendered, vec!["fullName", "email"]);
    assert_eq!(customers.columns[0].field.as_deref(), Some("full_name"));
    assert_eq!(customers.columns[1].field, None);
    assert_eq!(report.models["order_items"].name, "orderItems");
    assert_eq!(report.models["order_items"].options.table_name, "order_items");
}

#[tokio::test]
async fn sqlite_table_selection() {
    let dir = tempfile::tempdir().unwrap();
    let introspector = open(dir.path()).await;
    let options = GenerationOptions {
        skip_tables: vec!["order_items".to_string()],
        ..Default::default()
    };
    let report = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();
    assert_eq!(
        report.models.keys().collect::<Vec<_>>(),
        vec!["customers", "orders"]
    );
}

#[tokio::test]
async fn sqlite_generation_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let introspector = open(dir.path()).await;
    let options = GenerationOptions {
        max_concurrency: 1,
        ..Default::default()
    };
    let first = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();

    let options = GenerationOptions::default();
    let second = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

// ─── output ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sqlite_writes_model_files() {
    let dir = tempfile::tempdir().unwrap();
    let introspector = open(dir.path()).await;
    let options = GenerationOptions::default();
    let report = ModelGenerator::new(introspector.as_ref(), &options)
        .run()
        .await
        .unwrap();

    let out = dir.path().join("models");
    let writer = ModelWriter::new(OutputOptions {
        directory: out.clone(),
        ..Default::default()
    });
    let written = writer.write_all(&report.models).await.unwrap();
    assert_eq!(written.len(), 3);

    for file in ["Customers.js", "Orderitems.js", "Orders.js"] {
        assert!(out.join(file).exists(), "{} not written", file);
    }

    let orders = std::fs::read_to_string(out.join("Orders.js")).unwrap();
    assert!(orders.starts_with("/* jshint indent: 1 */\n\nmodule.exports = {\n"));
    assert!(orders.contains("\t\tcustomer_id: {\n\t\t\treferences: {\n\t\t\t\tmodel: 'customers',\n\t\t\t\tkey: 'id'\n\t\t\t},\n"));
    assert!(orders.contains("\t\t\ttype: \"xmltype\"\n"));
    assert!(orders.contains("\t\ttableName: 'orders',\n\t\ttimestamps: false\n"));
    assert!(orders.ends_with("\t}\n};\n"));
}

// ─── failures ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn sqlite_open_in_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("shop.db");
    let result = open_introspector(ConnectionConfig {
        engine: DatabaseEngine::Sqlite,
        file_path: Some(path.to_string_lossy().into_owned()),
        ..Default::default()
    })
    .await;
    assert!(result.is_err());
}
