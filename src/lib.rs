pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod render;
pub mod writer;

pub use config::{GenerationOptions, GeneratorConfig, OutputOptions};
pub use db::connectors::{open_introspector, ConnectionConfig, DatabaseEngine, SchemaIntrospector};
pub use db::model::{synthesize, TableModel};
pub use error::{GenerateError, TableFailure};
pub use generator::{GenerationReport, ModelGenerator};
pub use render::render_table;
pub use writer::ModelWriter;
